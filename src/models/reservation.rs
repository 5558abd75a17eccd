//! Reservation model and state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::book::BookShort;
use super::user::UserShort;
use super::SoftDelete;

/// Reservation lifecycle state.
///
/// ```text
/// pending --> approved --> completed
///    |           |
///    +--> rejected / cancelled <--+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Approved => "approved",
            ReservationStatus::Rejected => "rejected",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Completed => "completed",
        }
    }

    /// Whether the state machine admits `self -> next`
    pub fn can_transition_to(self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Approved, Cancelled)
                | (Approved, Completed)
        )
    }
}

impl From<&str> for ReservationStatus {
    fn from(s: &str) -> Self {
        match s {
            "approved" => ReservationStatus::Approved,
            "rejected" => ReservationStatus::Rejected,
            "cancelled" => ReservationStatus::Cancelled,
            "completed" => ReservationStatus::Completed,
            _ => ReservationStatus::Pending,
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reservation model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub status: String,
    pub reservation_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Reservation {
    pub fn status(&self) -> ReservationStatus {
        ReservationStatus::from(self.status.as_str())
    }

    /// A pending reservation past its expiry date no longer counts as active.
    /// Expiry is evaluated lazily at read time; no sweep rewrites the row.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status() == ReservationStatus::Pending && now > self.expiry_date
    }
}

impl SoftDelete for Reservation {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// Reservation with book/user details for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationDetails {
    pub id: i32,
    pub book: BookShort,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserShort>,
    pub status: ReservationStatus,
    pub reservation_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Reservation request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReservation {
    pub book_id: i32,
    /// Reserving user; staff may reserve on behalf of another user
    pub user_id: Option<i32>,
}

/// Reject request, with an optional reason recorded on the reservation
#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectReservation {
    pub notes: Option<String>,
}

/// Reservation query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ReservationQuery {
    pub status: Option<String>,
    pub user_id: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReservationStatus::*;

    #[test]
    fn pending_transitions() {
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn approved_transitions() {
        assert!(Approved.can_transition_to(Completed));
        assert!(Approved.can_transition_to(Cancelled));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Approved.can_transition_to(Pending));
    }

    #[test]
    fn terminal_states_admit_nothing() {
        for terminal in [Rejected, Cancelled, Completed] {
            for next in [Pending, Approved, Rejected, Cancelled, Completed] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn expiry_only_applies_to_pending() {
        let now = Utc::now();
        let mut r = Reservation {
            id: 1,
            user_id: 1,
            book_id: 1,
            status: "pending".into(),
            reservation_date: now - chrono::Duration::days(5),
            expiry_date: now - chrono::Duration::days(2),
            notes: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        assert!(r.is_expired(now));

        r.status = "approved".into();
        assert!(!r.is_expired(now));
    }

    #[test]
    fn pending_within_window_is_not_expired() {
        let now = Utc::now();
        let r = Reservation {
            id: 1,
            user_id: 1,
            book_id: 1,
            status: "pending".into(),
            reservation_date: now,
            expiry_date: now + chrono::Duration::days(3),
            notes: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        assert!(!r.is_expired(now));
    }
}
