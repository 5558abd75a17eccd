//! Reservation management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::reservation::{
        CreateReservation, RejectReservation, Reservation, ReservationDetails, ReservationQuery,
    },
};

use super::AuthenticatedUser;

/// Paginated reservation list response
#[derive(Serialize, ToSchema)]
pub struct ReservationListResponse {
    pub reservations: Vec<ReservationDetails>,
    pub total: i64,
}

/// Reserve a book
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservation,
    responses(
        (status = 201, description = "Reservation created", body = Reservation),
        (status = 404, description = "Book or user not found"),
        (status = 409, description = "Not reservable, or a pending reservation already exists")
    )
)]
pub async fn create_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateReservation>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    let user_id = request.user_id.unwrap_or_else(|| claims.user_id());
    claims.require_self_or_staff(user_id)?;

    let reservation = state
        .services
        .reservations
        .create(user_id, request.book_id)
        .await?;

    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Cancel a reservation (owner or admin)
#[utoipa::path(
    post,
    path = "/reservations/{id}/cancel",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation cancelled", body = Reservation),
        (status = 403, description = "Not the owner or an admin"),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Not cancellable from its current state")
    )
)]
pub async fn cancel_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    let reservation = state.services.reservations.cancel(&claims, id).await?;
    Ok(Json(reservation))
}

/// Approve a pending reservation (staff)
#[utoipa::path(
    post,
    path = "/reservations/{id}/approve",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation approved", body = Reservation),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Not pending")
    )
)]
pub async fn approve_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    claims.require_staff()?;

    let reservation = state.services.reservations.approve(id).await?;
    Ok(Json(reservation))
}

/// Reject a pending reservation (staff)
#[utoipa::path(
    post,
    path = "/reservations/{id}/reject",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    request_body = RejectReservation,
    responses(
        (status = 200, description = "Reservation rejected", body = Reservation),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Not pending")
    )
)]
pub async fn reject_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<RejectReservation>,
) -> AppResult<Json<Reservation>> {
    claims.require_staff()?;

    let reservation = state
        .services
        .reservations
        .reject(id, request.notes)
        .await?;
    Ok(Json(reservation))
}

/// Complete an approved reservation, the book having been handed over (staff)
#[utoipa::path(
    post,
    path = "/reservations/{id}/complete",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation completed", body = Reservation),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Not approved")
    )
)]
pub async fn complete_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    claims.require_staff()?;

    let reservation = state.services.reservations.complete(id).await?;
    Ok(Json(reservation))
}

/// List reservations with filters (staff)
#[utoipa::path(
    get,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(ReservationQuery),
    responses(
        (status = 200, description = "Reservations matching the filters", body = ReservationListResponse)
    )
)]
pub async fn list_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReservationQuery>,
) -> AppResult<Json<ReservationListResponse>> {
    claims.require_staff()?;

    let (reservations, total) = state.services.reservations.list(&query).await?;
    Ok(Json(ReservationListResponse { reservations, total }))
}

/// Get active reservations for a specific user
#[utoipa::path(
    get,
    path = "/users/{id}/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User's active reservations", body = Vec<ReservationDetails>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<ReservationDetails>>> {
    claims.require_self_or_staff(user_id)?;

    let reservations = state
        .services
        .reservations
        .get_user_reservations(user_id)
        .await?;
    Ok(Json(reservations))
}
