//! Payment reconciliation service

use crate::{
    config::LendingConfig,
    error::AppResult,
    models::payment::{CreatePayment, Payment, PaymentQuery, PaymentSummary},
    repository::Repository,
};

#[derive(Clone)]
pub struct PaymentsService {
    repository: Repository,
    lending: LendingConfig,
}

impl PaymentsService {
    pub fn new(repository: Repository, lending: LendingConfig) -> Self {
        Self { repository, lending }
    }

    /// Record a fine payment made by `actor_id` against one of their loans
    pub async fn create(&self, actor_id: i32, payment: &CreatePayment) -> AppResult<Payment> {
        let created = self
            .repository
            .payments
            .create(actor_id, payment, self.lending.fine_per_day)
            .await?;

        tracing::info!(
            payment_id = created.id,
            loan_id = created.loan_id,
            amount = %created.amount,
            "fine payment recorded"
        );
        Ok(created)
    }

    /// Get a user's payment history
    pub async fn get_user_payments(&self, user_id: i32) -> AppResult<Vec<Payment>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.payments.get_user_payments(user_id).await
    }

    /// List payments with filters (staff view)
    pub async fn list(&self, query: &PaymentQuery) -> AppResult<(Vec<Payment>, i64)> {
        self.repository.payments.list(query).await
    }

    /// Collected-fines summary (staff view)
    pub async fn summary(&self) -> AppResult<PaymentSummary> {
        self.repository.payments.summary().await
    }
}
