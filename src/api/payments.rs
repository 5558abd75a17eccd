//! Fine payment endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::payment::{CreatePayment, Payment, PaymentQuery, PaymentSummary},
};

use super::AuthenticatedUser;

/// Paginated payment list response
#[derive(Serialize, ToSchema)]
pub struct PaymentListResponse {
    pub payments: Vec<Payment>,
    pub total: i64,
}

/// Pay the fine on one of the caller's loans
#[utoipa::path(
    post,
    path = "/payments",
    tag = "payments",
    security(("bearer_auth" = [])),
    request_body = CreatePayment,
    responses(
        (status = 201, description = "Payment recorded", body = Payment),
        (status = 400, description = "Amount does not match the outstanding fine"),
        (status = 403, description = "Loan does not belong to the caller"),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Fine already settled")
    )
)]
pub async fn create_payment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreatePayment>,
) -> AppResult<(StatusCode, Json<Payment>)> {
    let payment = state
        .services
        .payments
        .create(claims.user_id(), &request)
        .await?;

    Ok((StatusCode::CREATED, Json(payment)))
}

/// List payments with filters (staff)
#[utoipa::path(
    get,
    path = "/payments",
    tag = "payments",
    security(("bearer_auth" = [])),
    params(PaymentQuery),
    responses(
        (status = 200, description = "Payments matching the filters", body = PaymentListResponse)
    )
)]
pub async fn list_payments(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PaymentQuery>,
) -> AppResult<Json<PaymentListResponse>> {
    claims.require_staff()?;

    let (payments, total) = state.services.payments.list(&query).await?;
    Ok(Json(PaymentListResponse { payments, total }))
}

/// Collected-fines summary (staff)
#[utoipa::path(
    get,
    path = "/payments/summary",
    tag = "payments",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Totals over completed payments", body = PaymentSummary)
    )
)]
pub async fn payment_summary(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<PaymentSummary>> {
    claims.require_staff()?;

    let summary = state.services.payments.summary().await?;
    Ok(Json(summary))
}

/// Get payment history for a specific user
#[utoipa::path(
    get,
    path = "/users/{id}/payments",
    tag = "payments",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User's payment history", body = Vec<Payment>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_payments(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<Payment>>> {
    claims.require_self_or_staff(user_id)?;

    let payments = state.services.payments.get_user_payments(user_id).await?;
    Ok(Json(payments))
}
