//! Loan management service

use chrono::Duration;
use rust_decimal::Decimal;

use crate::{
    config::LendingConfig,
    error::AppResult,
    models::loan::{Fine, Loan, LoanDetails, LoanQuery},
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    lending: LendingConfig,
}

impl LoansService {
    pub fn new(repository: Repository, lending: LendingConfig) -> Self {
        Self { repository, lending }
    }

    /// Get loan by ID
    pub async fn get_loan(&self, id: i32) -> AppResult<Loan> {
        self.repository.loans.get_by_id(id).await
    }

    /// Borrow a book for a user
    pub async fn borrow(&self, user_id: i32, book_id: i32) -> AppResult<Loan> {
        // Verify user exists before touching the ledger
        self.repository.users.get_by_id(user_id).await?;

        let loan = self
            .repository
            .loans
            .borrow(user_id, book_id, Duration::days(self.lending.loan_period_days))
            .await?;

        tracing::info!(loan_id = loan.id, user_id, book_id, "book borrowed");
        Ok(loan)
    }

    /// Return a borrowed book; yields the loan and the fine owed
    pub async fn return_loan(&self, loan_id: i32) -> AppResult<(Loan, Decimal)> {
        let (loan, fine) = self
            .repository
            .loans
            .return_loan(loan_id, self.lending.fine_per_day)
            .await?;

        tracing::info!(loan_id, fine = %fine, "book returned");
        Ok((loan, fine))
    }

    /// Fine currently owed on a loan, computed without mutation
    pub async fn calculate_fine(&self, loan_id: i32) -> AppResult<Fine> {
        let loan = self.repository.loans.get_by_id(loan_id).await?;
        Ok(loan.calculate_fine(self.lending.fine_per_day))
    }

    /// Get loans for a user
    pub async fn get_user_loans(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        // Verify user exists
        self.repository.users.get_by_id(user_id).await?;
        self.repository.loans.get_user_loans(user_id).await
    }

    /// List loans with filters (staff view)
    pub async fn list(&self, query: &LoanQuery) -> AppResult<(Vec<LoanDetails>, i64)> {
        self.repository.loans.list(query).await
    }
}
