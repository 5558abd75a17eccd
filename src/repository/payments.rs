//! Payments repository: fine reconciliation and payment history.
//!
//! Creating a payment and settling the loan's fine flag is a two-document
//! update; both writes share one transaction.

use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::Loan,
        payment::{CreatePayment, MethodTotal, Payment, PaymentQuery, PaymentStatus, PaymentSummary},
    },
};

#[derive(Clone)]
pub struct PaymentsRepository {
    pool: Pool<Postgres>,
}

impl PaymentsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get payment by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Payment> {
        sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payment with id {} not found", id)))
    }

    /// Record a fine payment. The amount must equal the fine currently
    /// computed for the loan; on success the payment row and the loan's
    /// `fine_paid` flag commit together.
    pub async fn create(
        &self,
        actor_id: i32,
        payment: &CreatePayment,
        unit_rate: Decimal,
    ) -> AppResult<Payment> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(payment.loan_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Loan with id {} not found", payment.loan_id))
            })?;

        if loan.user_id != actor_id {
            return Err(AppError::Forbidden(
                "Loan does not belong to this user".to_string(),
            ));
        }

        if loan.fine_paid {
            return Err(AppError::Conflict("Fine is already settled".to_string()));
        }

        let fine = loan.calculate_fine(unit_rate);
        if payment.amount != fine.amount {
            return Err(AppError::AmountMismatch { expected: fine.amount });
        }

        let created = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (user_id, loan_id, amount, payment_method, status, reference)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(loan.user_id)
        .bind(loan.id)
        .bind(payment.amount)
        .bind(payment.payment_method.as_str())
        .bind(PaymentStatus::Completed.as_str())
        .bind(&payment.reference)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE loans SET fine_paid = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(loan.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Get a user's payment history, newest first
    pub async fn get_user_payments(&self, user_id: i32) -> AppResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE user_id = $1 AND deleted_at IS NULL
            ORDER BY payment_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    /// List payments with filters and pagination
    pub async fn list(&self, query: &PaymentQuery) -> AppResult<(Vec<Payment>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let filter = r#"
            deleted_at IS NULL
            AND ($1::text IS NULL OR status = $1)
            AND ($2::text IS NULL OR payment_method = $2)
            AND ($3::int IS NULL OR user_id = $3)
        "#;

        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT * FROM payments WHERE {filter} ORDER BY payment_date DESC LIMIT $4 OFFSET $5"
        ))
        .bind(&query.status)
        .bind(&query.payment_method)
        .bind(query.user_id)
        .bind(per_page)
        .bind((page - 1) * per_page)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM payments WHERE {filter}"))
                .bind(&query.status)
                .bind(&query.payment_method)
                .bind(query.user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((payments, total))
    }

    /// Collected-fines summary over completed payments
    pub async fn summary(&self) -> AppResult<PaymentSummary> {
        let total_collected: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount), 0) FROM payments
            WHERE status = 'completed' AND deleted_at IS NULL
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let by_method = sqlx::query_as::<_, MethodTotal>(
            r#"
            SELECT payment_method, COALESCE(SUM(amount), 0) AS total, COUNT(*) AS count
            FROM payments
            WHERE status = 'completed' AND deleted_at IS NULL
            GROUP BY payment_method
            ORDER BY total DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(PaymentSummary {
            total_collected,
            by_method,
        })
    }
}
