//! Data models for Biblios

pub mod book;
pub mod loan;
pub mod payment;
pub mod reservation;
pub mod user;

use chrono::{DateTime, Utc};

// Re-export commonly used types
pub use book::{Book, BookShort, BookStatus};
pub use loan::{Fine, Loan, LoanDetails, LoanStatus};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use reservation::{Reservation, ReservationDetails, ReservationStatus};
pub use user::{User, UserClaims, UserShort};

/// Logical deletion, shared by every soft-deletable entity.
/// Repository queries exclude deleted rows unless explicitly asked otherwise;
/// loans are a financial record and do not implement this.
pub trait SoftDelete {
    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
}
