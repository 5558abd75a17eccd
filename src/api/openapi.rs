//! OpenAPI documentation

use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, health, loans, payments, reservations, stats, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Biblios API",
        version = "1.0.0",
        description = "Library Lending Management REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        // Loans
        loans::create_loan,
        loans::return_loan,
        loans::get_fine,
        loans::list_loans,
        loans::get_user_loans,
        // Reservations
        reservations::create_reservation,
        reservations::cancel_reservation,
        reservations::approve_reservation,
        reservations::reject_reservation,
        reservations::complete_reservation,
        reservations::list_reservations,
        reservations::get_user_reservations,
        // Payments
        payments::create_payment,
        payments::list_payments,
        payments::payment_summary,
        payments::get_user_payments,
        // Stats
        stats::get_stats,
        stats::get_popular_books,
        stats::get_overdue_report,
        stats::get_category_distribution,
        stats::get_user_activity,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::BookShort,
            crate::models::book::BookStatus,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            books::BookListResponse,
            // Users
            crate::models::user::User,
            crate::models::user::UserShort,
            crate::models::user::Role,
            crate::models::user::UserStatus,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            users::UserListResponse,
            // Loans
            crate::models::loan::Loan,
            crate::models::loan::LoanDetails,
            crate::models::loan::LoanStatus,
            crate::models::loan::Fine,
            crate::models::loan::CreateLoan,
            loans::BorrowResponse,
            loans::ReturnResponse,
            loans::FineResponse,
            loans::LoanListResponse,
            // Reservations
            crate::models::reservation::Reservation,
            crate::models::reservation::ReservationDetails,
            crate::models::reservation::ReservationStatus,
            crate::models::reservation::CreateReservation,
            crate::models::reservation::RejectReservation,
            reservations::ReservationListResponse,
            // Payments
            crate::models::payment::Payment,
            crate::models::payment::PaymentMethod,
            crate::models::payment::PaymentStatus,
            crate::models::payment::CreatePayment,
            crate::models::payment::MethodTotal,
            crate::models::payment::PaymentSummary,
            payments::PaymentListResponse,
            // Stats
            stats::StatsResponse,
            stats::BookCounts,
            stats::UserCounts,
            stats::LoanCounts,
            stats::ReservationCounts,
            stats::PopularBook,
            stats::OverdueLoan,
            stats::CategoryDistribution,
            stats::UserActivity,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Book catalog management"),
        (name = "users", description = "User directory"),
        (name = "loans", description = "Borrowing and returns"),
        (name = "reservations", description = "Reservation management"),
        (name = "payments", description = "Fine payments"),
        (name = "stats", description = "Reports")
    )
)]
pub struct ApiDoc;

/// Registers the bearer-token scheme the `security` clauses refer to
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
