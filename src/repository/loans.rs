//! Loans repository: the borrow/return state machine and its queries.
//!
//! Borrow and return each couple a loan write with a book-availability write;
//! both run inside a single transaction so partial application is impossible.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::BookShort,
        loan::{Fine, Loan, LoanDetails, LoanQuery, LoanStatus},
        user::UserShort,
    },
};

use super::{books::BooksRepository, is_unique_violation};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Borrow a book: create the loan and take a copy off the shelf in one
    /// transaction. Fails when the book is missing, out of stock, or the user
    /// already holds an active loan for it.
    pub async fn borrow(&self, user_id: i32, book_id: i32, loan_period: Duration) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let already_borrowed: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE user_id = $1 AND book_id = $2 AND status = 'active')",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        if already_borrowed {
            return Err(AppError::Conflict(
                "User already has this book borrowed".to_string(),
            ));
        }

        BooksRepository::decrement_availability(&mut *tx, book_id).await?;

        let now = Utc::now();
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (user_id, book_id, borrow_date, due_date)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(now)
        .bind(now + loan_period)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            // the partial unique index backs the check above under concurrency
            if is_unique_violation(&e) {
                AppError::Conflict("User already has this book borrowed".to_string())
            } else {
                AppError::from(e)
            }
        })?;

        tx.commit().await?;
        Ok(loan)
    }

    /// Return a loan: set the return date, persist the computed fine, and put
    /// the copy back on the shelf, all in one transaction. Returns the loan
    /// and the fine amount owed.
    pub async fn return_loan(&self, loan_id: i32, unit_rate: Decimal) -> AppResult<(Loan, Decimal)> {
        let mut tx = self.pool.begin().await?;

        let mut loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(loan_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        if loan.return_date.is_some() {
            return Err(AppError::Conflict("Loan already returned".to_string()));
        }

        loan.return_date = Some(Utc::now());
        let fine = loan.calculate_fine(unit_rate);

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET
                return_date = $2,
                status = 'completed',
                fine_amount = $3,
                fine_days_overdue = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(loan_id)
        .bind(loan.return_date)
        .bind(fine.amount)
        .bind(fine.days_overdue)
        .fetch_one(&mut *tx)
        .await?;

        BooksRepository::increment_availability(&mut *tx, loan.book_id).await?;

        tx.commit().await?;
        Ok((loan, fine.amount))
    }

    /// Get loans for a user, newest first
    pub async fn get_user_loans(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        let rows = sqlx::query(&format!(
            "{DETAILS_SELECT} WHERE l.user_id = $1 ORDER BY l.borrow_date DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();
        Ok(rows.iter().map(|row| details_from_row(row, now)).collect())
    }

    /// List loans with filters and pagination. The status filter matches the
    /// derived state: `overdue` is an active loan past its due date.
    pub async fn list(&self, query: &LoanQuery) -> AppResult<(Vec<LoanDetails>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let filter = r#"
            ($1::text IS NULL
             OR ($1 = 'completed' AND l.status = 'completed')
             OR ($1 = 'active' AND l.status = 'active' AND l.due_date >= NOW())
             OR ($1 = 'overdue' AND l.status = 'active' AND l.due_date < NOW()))
            AND ($2::int IS NULL OR l.user_id = $2)
        "#;

        let rows = sqlx::query(&format!(
            "{DETAILS_SELECT} WHERE {filter} ORDER BY l.borrow_date DESC LIMIT $3 OFFSET $4"
        ))
        .bind(&query.status)
        .bind(query.user_id)
        .bind(per_page)
        .bind((page - 1) * per_page)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM loans l WHERE {filter}"
        ))
        .bind(&query.status)
        .bind(query.user_id)
        .fetch_one(&self.pool)
        .await?;

        let now = Utc::now();
        Ok((rows.iter().map(|row| details_from_row(row, now)).collect(), total))
    }

    /// Count loans currently active (not yet due)
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE status = 'active' AND due_date >= NOW()",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Count loans past their due date and not returned
    pub async fn count_overdue(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE status = 'active' AND due_date < NOW()",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Count returned loans
    pub async fn count_completed(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE status = 'completed'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

const DETAILS_SELECT: &str = r#"
    SELECT l.id, l.user_id, l.book_id, l.borrow_date, l.due_date, l.return_date,
           l.fine_amount, l.fine_paid, l.fine_days_overdue,
           b.title AS book_title, b.author AS book_author, b.isbn AS book_isbn,
           u.name AS user_name, u.email AS user_email
    FROM loans l
    JOIN books b ON b.id = l.book_id
    JOIN users u ON u.id = l.user_id
"#;

fn details_from_row(row: &PgRow, now: DateTime<Utc>) -> LoanDetails {
    let due_date: DateTime<Utc> = row.get("due_date");
    let return_date: Option<DateTime<Utc>> = row.get("return_date");

    let status = if return_date.is_some() {
        LoanStatus::Completed
    } else if now > due_date {
        LoanStatus::Overdue
    } else {
        LoanStatus::Active
    };

    LoanDetails {
        id: row.get("id"),
        book: BookShort {
            id: row.get("book_id"),
            title: row.get("book_title"),
            author: row.get("book_author"),
            isbn: row.get("book_isbn"),
        },
        user: Some(UserShort {
            id: row.get("user_id"),
            name: row.get("user_name"),
            email: row.get("user_email"),
        }),
        borrow_date: row.get("borrow_date"),
        due_date,
        return_date,
        status,
        fine: Fine {
            amount: row.get("fine_amount"),
            paid: row.get("fine_paid"),
            days_overdue: row.get("fine_days_overdue"),
        },
    }
}
