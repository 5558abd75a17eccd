//! Loan (borrow) model, status derivation and fine calculation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::book::BookShort;
use super::user::UserShort;

const SECS_PER_DAY: i64 = 86_400;

/// Whole days late between a due date and a point in time, rounding any
/// started day up; zero when `at` is on or before the due date.
pub fn days_late(due_date: DateTime<Utc>, at: DateTime<Utc>) -> i64 {
    if at <= due_date {
        return 0;
    }
    let late_secs = (at - due_date).num_seconds();
    (late_secs + SECS_PER_DAY - 1) / SECS_PER_DAY
}

/// Loan lifecycle state. `Overdue` is a view derived from the due date at
/// read time; only `active` and `completed` are ever stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Completed,
    Overdue,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Completed => "completed",
            LoanStatus::Overdue => "overdue",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fine accrued on a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Fine {
    pub amount: Decimal,
    pub paid: bool,
    pub days_overdue: i32,
}

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    /// Stored state, 'active' or 'completed'; see [`Loan::derived_status`]
    pub status: String,
    pub fine_amount: Decimal,
    pub fine_paid: bool,
    pub fine_days_overdue: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// Current lifecycle state as of `now`. The stored status column is never
    /// trusted for the time-dependent `overdue` transition.
    pub fn derived_status(&self, now: DateTime<Utc>) -> LoanStatus {
        if self.return_date.is_some() {
            LoanStatus::Completed
        } else if now > self.due_date {
            LoanStatus::Overdue
        } else {
            LoanStatus::Active
        }
    }

    /// Fine owed on this loan: zero until returned or when returned on time,
    /// otherwise one `unit_rate` per started day late. Pure and idempotent;
    /// the return flow persists the result, reporting calls it as-is.
    pub fn calculate_fine(&self, unit_rate: Decimal) -> Fine {
        let days_overdue = match self.return_date {
            Some(returned) => days_late(self.due_date, returned),
            None => 0,
        };

        Fine {
            amount: Decimal::from(days_overdue) * unit_rate,
            paid: self.fine_paid,
            days_overdue: days_overdue as i32,
        }
    }
}

/// Loan with book/user details for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub book: BookShort,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserShort>,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub fine: Fine,
}

/// Borrow request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLoan {
    pub book_id: i32,
    /// Borrower; staff may borrow on behalf of another user
    pub user_id: Option<i32>,
}

/// Loan query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct LoanQuery {
    /// active, overdue or completed
    pub status: Option<String>,
    pub user_id: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn loan(returned: Option<DateTime<Utc>>) -> Loan {
        let now = Utc::now();
        Loan {
            id: 7,
            user_id: 1,
            book_id: 2,
            borrow_date: date(2025, 4, 1),
            due_date: date(2025, 4, 15),
            return_date: returned,
            status: if returned.is_some() { "completed" } else { "active" }.into(),
            fine_amount: Decimal::ZERO,
            fine_paid: false,
            fine_days_overdue: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn no_fine_when_not_returned() {
        let fine = loan(None).calculate_fine(Decimal::ONE);
        assert_eq!(fine.amount, Decimal::ZERO);
        assert_eq!(fine.days_overdue, 0);
    }

    #[test]
    fn no_fine_on_due_date() {
        let fine = loan(Some(date(2025, 4, 15))).calculate_fine(Decimal::ONE);
        assert_eq!(fine.amount, Decimal::ZERO);
    }

    #[test]
    fn one_day_late_is_one_unit() {
        let fine = loan(Some(date(2025, 4, 16))).calculate_fine(Decimal::ONE);
        assert_eq!(fine.days_overdue, 1);
        assert_eq!(fine.amount, Decimal::ONE);
    }

    #[test]
    fn five_days_late_is_five_units() {
        // borrowed 2025-04-01, due 2025-04-15, returned 2025-04-20
        let fine = loan(Some(date(2025, 4, 20))).calculate_fine(Decimal::ONE);
        assert_eq!(fine.days_overdue, 5);
        assert_eq!(fine.amount, Decimal::from(5));
    }

    #[test]
    fn partial_day_rounds_up() {
        let returned = date(2025, 4, 15) + chrono::Duration::hours(3);
        let fine = loan(Some(returned)).calculate_fine(Decimal::ONE);
        assert_eq!(fine.days_overdue, 1);
    }

    #[test]
    fn fine_is_idempotent() {
        let l = loan(Some(date(2025, 4, 20)));
        let first = l.calculate_fine(Decimal::ONE);
        let second = l.calculate_fine(Decimal::ONE);
        assert_eq!(first, second);
    }

    #[test]
    fn days_late_is_zero_up_to_the_due_date() {
        let due = date(2025, 4, 15);
        assert_eq!(days_late(due, due - chrono::Duration::days(1)), 0);
        assert_eq!(days_late(due, due), 0);
        assert_eq!(days_late(due, due + chrono::Duration::hours(1)), 1);
        assert_eq!(days_late(due, due + chrono::Duration::days(5)), 5);
    }

    #[test]
    fn fine_scales_with_unit_rate() {
        let fine = loan(Some(date(2025, 4, 20))).calculate_fine(Decimal::from(3));
        assert_eq!(fine.amount, Decimal::from(15));
    }

    #[test]
    fn status_completed_once_returned() {
        let l = loan(Some(date(2025, 4, 20)));
        assert_eq!(l.derived_status(date(2025, 5, 1)), LoanStatus::Completed);
    }

    #[test]
    fn status_overdue_past_due_date() {
        let l = loan(None);
        assert_eq!(l.derived_status(date(2025, 4, 20)), LoanStatus::Overdue);
    }

    #[test]
    fn status_active_before_due_date() {
        let l = loan(None);
        assert_eq!(l.derived_status(date(2025, 4, 10)), LoanStatus::Active);
        // exactly at the due date is still active
        assert_eq!(l.derived_status(date(2025, 4, 15)), LoanStatus::Active);
    }
}
