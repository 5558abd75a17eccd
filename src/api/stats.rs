//! Reporting endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::{book::BookShort, user::UserShort},
};

use super::AuthenticatedUser;

#[derive(Debug, Serialize, ToSchema)]
pub struct BookCounts {
    pub total: i64,
    pub available: i64,
    pub unavailable: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserCounts {
    pub total: i64,
    pub active: i64,
    pub suspended: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoanCounts {
    pub active: i64,
    pub overdue: i64,
    pub completed: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationCounts {
    pub pending: i64,
}

/// Library overview
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub books: BookCounts,
    pub users: UserCounts,
    pub loans: LoanCounts,
    pub reservations: ReservationCounts,
}

/// Popular-books report entry
#[derive(Debug, Serialize, ToSchema)]
pub struct PopularBook {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub category: String,
    pub borrow_count: i64,
}

/// Popular-books report parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct PopularBooksQuery {
    /// Trailing window in days (default 30)
    pub days: Option<i64>,
    /// Maximum number of entries (default 10)
    pub limit: Option<i64>,
}

/// Overdue report entry: an unreturned loan past its due date and the fine
/// it would owe if returned now
#[derive(Debug, Serialize, ToSchema)]
pub struct OverdueLoan {
    pub loan_id: i32,
    pub book: BookShort,
    pub user: UserShort,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub days_overdue: i64,
    pub fine: Decimal,
}

/// Category distribution entry
#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryDistribution {
    pub category: String,
    /// Distinct titles in the category
    pub titles: i64,
    pub total_copies: i64,
    pub available_copies: i64,
}

/// User-activity report entry
#[derive(Debug, Serialize, ToSchema)]
pub struct UserActivity {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
    /// Borrows within the requested window
    pub total_borrows: i64,
    /// Loans currently overdue, regardless of window
    pub overdue_count: i64,
}

/// User-activity report parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct UserActivityQuery {
    /// Trailing window in days (default 30)
    pub days: Option<i64>,
    /// Maximum number of entries (default 50)
    pub limit: Option<i64>,
}

/// Library overview statistics (staff)
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Library overview", body = StatsResponse)
    )
)]
pub async fn get_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<StatsResponse>> {
    claims.require_staff()?;

    let stats = state.services.stats.get_stats().await?;
    Ok(Json(stats))
}

/// Most-borrowed books over a trailing window (staff)
#[utoipa::path(
    get,
    path = "/stats/popular-books",
    tag = "stats",
    security(("bearer_auth" = [])),
    params(PopularBooksQuery),
    responses(
        (status = 200, description = "Most-borrowed books", body = Vec<PopularBook>)
    )
)]
pub async fn get_popular_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PopularBooksQuery>,
) -> AppResult<Json<Vec<PopularBook>>> {
    claims.require_staff()?;

    let days = query.days.unwrap_or(30).clamp(1, 365);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);

    let books = state.services.stats.popular_books(days, limit).await?;
    Ok(Json(books))
}

/// Overdue loans with their currently accruing fines (staff)
#[utoipa::path(
    get,
    path = "/stats/overdue",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue loans, oldest due first", body = Vec<OverdueLoan>)
    )
)]
pub async fn get_overdue_report(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<OverdueLoan>>> {
    claims.require_staff()?;

    let report = state.services.stats.overdue_report().await?;
    Ok(Json(report))
}

/// Title and copy counts per category (staff)
#[utoipa::path(
    get,
    path = "/stats/categories",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Holdings per category", body = Vec<CategoryDistribution>)
    )
)]
pub async fn get_category_distribution(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<CategoryDistribution>>> {
    claims.require_staff()?;

    let distribution = state.services.stats.category_distribution().await?;
    Ok(Json(distribution))
}

/// Per-user borrowing activity over a trailing window (staff)
#[utoipa::path(
    get,
    path = "/stats/user-activity",
    tag = "stats",
    security(("bearer_auth" = [])),
    params(UserActivityQuery),
    responses(
        (status = 200, description = "Most active borrowers", body = Vec<UserActivity>)
    )
)]
pub async fn get_user_activity(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<UserActivityQuery>,
) -> AppResult<Json<Vec<UserActivity>>> {
    claims.require_staff()?;

    let days = query.days.unwrap_or(30).clamp(1, 365);
    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    let activity = state.services.stats.user_activity(days, limit).await?;
    Ok(Json(activity))
}
