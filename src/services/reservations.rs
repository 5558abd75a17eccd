//! Reservation management service

use chrono::{Duration, Utc};

use crate::{
    config::LendingConfig,
    error::{AppError, AppResult},
    models::{
        reservation::{Reservation, ReservationDetails, ReservationQuery, ReservationStatus},
        user::{Role, UserClaims},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
    lending: LendingConfig,
}

impl ReservationsService {
    pub fn new(repository: Repository, lending: LendingConfig) -> Self {
        Self { repository, lending }
    }

    /// Create a reservation for a user
    pub async fn create(&self, user_id: i32, book_id: i32) -> AppResult<Reservation> {
        // Verify user exists
        self.repository.users.get_by_id(user_id).await?;

        let reservation = self
            .repository
            .reservations
            .create(
                user_id,
                book_id,
                Duration::days(self.lending.reservation_window_days),
            )
            .await?;

        tracing::info!(
            reservation_id = reservation.id,
            user_id,
            book_id,
            "reservation created"
        );
        Ok(reservation)
    }

    /// Approve a pending reservation
    pub async fn approve(&self, id: i32) -> AppResult<Reservation> {
        self.transition(id, ReservationStatus::Approved, None).await
    }

    /// Reject a pending reservation, optionally recording a reason
    pub async fn reject(&self, id: i32, notes: Option<String>) -> AppResult<Reservation> {
        self.transition(id, ReservationStatus::Rejected, notes).await
    }

    /// Hand the book over on an approved reservation
    pub async fn complete(&self, id: i32) -> AppResult<Reservation> {
        self.transition(id, ReservationStatus::Completed, None).await
    }

    /// Cancel a pending or approved reservation. Only the owning user or an
    /// admin may cancel.
    pub async fn cancel(&self, actor: &UserClaims, id: i32) -> AppResult<Reservation> {
        let reservation = self.repository.reservations.get_by_id(id).await?;

        if reservation.user_id != actor.user_id() && actor.role() != Role::Admin {
            return Err(AppError::Forbidden(
                "Not authorized to cancel this reservation".to_string(),
            ));
        }

        self.transition(id, ReservationStatus::Cancelled, None).await
    }

    /// Validate and apply a state-machine transition
    async fn transition(
        &self,
        id: i32,
        next: ReservationStatus,
        notes: Option<String>,
    ) -> AppResult<Reservation> {
        let reservation = self.repository.reservations.get_by_id(id).await?;
        let current = reservation.status();

        if reservation.is_expired(Utc::now()) {
            return Err(AppError::Conflict("Reservation has expired".to_string()));
        }

        if !current.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "Cannot move a {} reservation to {}",
                current, next
            )));
        }

        let updated = self
            .repository
            .reservations
            .set_status(id, current, next, notes.as_deref())
            .await?;

        tracing::info!(reservation_id = id, from = %current, to = %next, "reservation transition");
        Ok(updated)
    }

    /// A user's active reservations
    pub async fn get_user_reservations(&self, user_id: i32) -> AppResult<Vec<ReservationDetails>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.reservations.get_user_reservations(user_id).await
    }

    /// List reservations with filters (staff view)
    pub async fn list(&self, query: &ReservationQuery) -> AppResult<(Vec<ReservationDetails>, i64)> {
        self.repository.reservations.list(query).await
    }
}
