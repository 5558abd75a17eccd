//! Loan management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::loan::{CreateLoan, Loan, LoanDetails, LoanQuery},
};

use super::AuthenticatedUser;

/// Borrow response
#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    pub message: String,
    pub loan: Loan,
}

/// Return response with the fine owed
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    pub message: String,
    pub loan: Loan,
    pub fine: Decimal,
}

/// Fine currently owed on a loan
#[derive(Serialize, ToSchema)]
pub struct FineResponse {
    pub loan_id: i32,
    pub amount: Decimal,
    pub days_overdue: i32,
    pub paid: bool,
}

/// Paginated loan list response
#[derive(Serialize, ToSchema)]
pub struct LoanListResponse {
    pub loans: Vec<LoanDetails>,
    pub total: i64,
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Book borrowed", body = BorrowResponse),
        (status = 404, description = "Book or user not found"),
        (status = 409, description = "No copies available, or user already holds this book")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<BorrowResponse>)> {
    let user_id = request.user_id.unwrap_or_else(|| claims.user_id());
    claims.require_self_or_staff(user_id)?;

    let loan = state.services.loans.borrow(user_id, request.book_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse {
            message: "Book borrowed successfully".to_string(),
            loan,
        }),
    ))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    let loan = state.services.loans.get_loan(loan_id).await?;
    claims.require_self_or_staff(loan.user_id)?;

    let (loan, fine) = state.services.loans.return_loan(loan_id).await?;

    Ok(Json(ReturnResponse {
        message: "Book returned successfully".to_string(),
        loan,
        fine,
    }))
}

/// Fine currently owed on a loan, computed without mutation
#[utoipa::path(
    get,
    path = "/loans/{id}/fine",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Computed fine", body = FineResponse),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_fine(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<FineResponse>> {
    let loan = state.services.loans.get_loan(loan_id).await?;
    claims.require_self_or_staff(loan.user_id)?;

    let fine = state.services.loans.calculate_fine(loan_id).await?;

    Ok(Json(FineResponse {
        loan_id,
        amount: fine.amount,
        days_overdue: fine.days_overdue,
        paid: fine.paid,
    }))
}

/// List loans with filters (staff)
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanQuery),
    responses(
        (status = 200, description = "Loans matching the filters", body = LoanListResponse)
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<LoanListResponse>> {
    claims.require_staff()?;

    let (loans, total) = state.services.loans.list(&query).await?;
    Ok(Json(LoanListResponse { loans, total }))
}

/// Get loans for a specific user
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User's loans", body = Vec<LoanDetails>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    claims.require_self_or_staff(user_id)?;

    let loans = state.services.loans.get_user_loans(user_id).await?;
    Ok(Json(loans))
}
