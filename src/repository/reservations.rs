//! Reservations repository: eligibility-gated creation and status queries.
//!
//! Expiry is lazy: a pending reservation past its expiry date is excluded
//! from eligibility counts and active-reservation queries rather than swept
//! by a background job. Creation retires the caller's expired rows in-line
//! so the one-live-pending unique index never trips on stale entries.

use chrono::{Duration, Utc};
use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::BookShort,
        reservation::{Reservation, ReservationDetails, ReservationQuery, ReservationStatus},
        user::UserShort,
    },
};

use super::is_unique_violation;

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get reservation by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    /// Create a reservation, gated by eligibility. Locking the book row
    /// serializes concurrent creates for the same book, making the duplicate
    /// and capacity checks race-free.
    pub async fn create(&self, user_id: i32, book_id: i32, window: Duration) -> AppResult<Reservation> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query(
            "SELECT quantity, available_copies FROM books
             WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        let quantity: i32 = book.get("quantity");
        let available_copies: i32 = book.get("available_copies");

        // Retire the user's expired pendings for this book so they neither
        // trip the duplicate check nor the partial unique index below.
        sqlx::query(
            r#"
            UPDATE reservations SET status = 'cancelled', updated_at = NOW()
            WHERE user_id = $1 AND book_id = $2 AND status = 'pending'
              AND expiry_date <= NOW() AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        let has_pending: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM reservations
                WHERE user_id = $1 AND book_id = $2 AND status = 'pending'
                  AND expiry_date > NOW() AND deleted_at IS NULL
            )
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        if has_pending {
            return Err(AppError::Conflict(
                "User already has a pending reservation for this book".to_string(),
            ));
        }

        let pending_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM reservations
            WHERE book_id = $1 AND status = 'pending'
              AND expiry_date > NOW() AND deleted_at IS NULL
            "#,
        )
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        if !(available_copies > 0 && pending_count < quantity as i64) {
            return Err(AppError::NotReservable);
        }

        let now = Utc::now();
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (user_id, book_id, reservation_date, expiry_date)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(now)
        .bind(now + window)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            // the partial unique index backs the duplicate check above
            if is_unique_violation(&e) {
                AppError::Conflict(
                    "User already has a pending reservation for this book".to_string(),
                )
            } else {
                AppError::from(e)
            }
        })?;

        tx.commit().await?;
        Ok(reservation)
    }

    /// Move a reservation from `current` to `next`. The status guard in the
    /// WHERE clause makes the transition optimistic: a concurrent change
    /// surfaces as a conflict instead of a lost update.
    pub async fn set_status(
        &self,
        id: i32,
        current: ReservationStatus,
        next: ReservationStatus,
        notes: Option<&str>,
    ) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE reservations SET
                status = $3,
                notes = COALESCE($4, notes),
                updated_at = NOW()
            WHERE id = $1 AND status = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(current.as_str())
        .bind(next.as_str())
        .bind(notes)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::Conflict(format!(
                "Reservation is no longer {}, cannot mark it {}",
                current, next
            ))
        })
    }

    /// A user's active reservations: approved ones plus unexpired pendings
    pub async fn get_user_reservations(&self, user_id: i32) -> AppResult<Vec<ReservationDetails>> {
        let rows = sqlx::query(&format!(
            r#"{DETAILS_SELECT}
            WHERE r.user_id = $1 AND r.deleted_at IS NULL
              AND (r.status = 'approved' OR (r.status = 'pending' AND r.expiry_date > NOW()))
            ORDER BY r.reservation_date DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(details_from_row).collect())
    }

    /// List reservations with filters and pagination. The `pending` filter
    /// excludes expired entries.
    pub async fn list(&self, query: &ReservationQuery) -> AppResult<(Vec<ReservationDetails>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let filter = r#"
            r.deleted_at IS NULL
            AND ($1::text IS NULL OR r.status = $1)
            AND ($1::text IS DISTINCT FROM 'pending' OR r.expiry_date > NOW())
            AND ($2::int IS NULL OR r.user_id = $2)
        "#;

        let rows = sqlx::query(&format!(
            "{DETAILS_SELECT} WHERE {filter} ORDER BY r.reservation_date DESC LIMIT $3 OFFSET $4"
        ))
        .bind(&query.status)
        .bind(query.user_id)
        .bind(per_page)
        .bind((page - 1) * per_page)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM reservations r WHERE {filter}"
        ))
        .bind(&query.status)
        .bind(query.user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows.iter().map(details_from_row).collect(), total))
    }

    /// Count live pending reservations across all books
    pub async fn count_pending(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM reservations
            WHERE status = 'pending' AND expiry_date > NOW() AND deleted_at IS NULL
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

const DETAILS_SELECT: &str = r#"
    SELECT r.id, r.user_id, r.book_id, r.status, r.reservation_date, r.expiry_date, r.notes,
           b.title AS book_title, b.author AS book_author, b.isbn AS book_isbn,
           u.name AS user_name, u.email AS user_email
    FROM reservations r
    JOIN books b ON b.id = r.book_id
    JOIN users u ON u.id = r.user_id
"#;

fn details_from_row(row: &PgRow) -> ReservationDetails {
    let status: String = row.get("status");
    ReservationDetails {
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
        status: ReservationStatus::from(status.as_str()),
        reservation_date: row.get("reservation_date"),
        expiry_date: row.get("expiry_date"),
        notes: row.get("notes"),
    }
}
