//! Reporting service: library overview, popular-books, overdue, category
//! and user-activity reports

use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::{
    api::stats::{
        BookCounts, CategoryDistribution, LoanCounts, OverdueLoan, PopularBook,
        ReservationCounts, StatsResponse, UserActivity, UserCounts,
    },
    config::LendingConfig,
    error::AppResult,
    models::{book::BookShort, loan::days_late, user::UserShort},
    repository::Repository,
};

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
    lending: LendingConfig,
}

impl StatsService {
    pub fn new(repository: Repository, lending: LendingConfig) -> Self {
        Self { repository, lending }
    }

    /// Library overview: entity counts broken down by state
    pub async fn get_stats(&self) -> AppResult<StatsResponse> {
        let pool = &self.repository.pool;

        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'available') AS available,
                COUNT(*) FILTER (WHERE status = 'unavailable') AS unavailable
            FROM books WHERE deleted_at IS NULL
            "#,
        )
        .fetch_one(pool)
        .await?;
        let books = BookCounts {
            total: row.get("total"),
            available: row.get("available"),
            unavailable: row.get("unavailable"),
        };

        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'active') AS active,
                COUNT(*) FILTER (WHERE status = 'suspended') AS suspended
            FROM users WHERE deleted_at IS NULL
            "#,
        )
        .fetch_one(pool)
        .await?;
        let users = UserCounts {
            total: row.get("total"),
            active: row.get("active"),
            suspended: row.get("suspended"),
        };

        let loans = LoanCounts {
            active: self.repository.loans.count_active().await?,
            overdue: self.repository.loans.count_overdue().await?,
            completed: self.repository.loans.count_completed().await?,
        };

        let reservations = ReservationCounts {
            pending: self.repository.reservations.count_pending().await?,
        };

        Ok(StatsResponse {
            books,
            users,
            loans,
            reservations,
        })
    }

    /// Most-borrowed books over a trailing window of days
    pub async fn popular_books(&self, days: i64, limit: i64) -> AppResult<Vec<PopularBook>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.title, b.author, b.isbn, b.category,
                   COUNT(*) AS borrow_count
            FROM loans l
            JOIN books b ON b.id = l.book_id
            WHERE l.borrow_date >= NOW() - ($1 || ' days')::interval
            GROUP BY b.id, b.title, b.author, b.isbn, b.category
            ORDER BY borrow_count DESC, b.title
            LIMIT $2
            "#,
        )
        .bind(days.to_string())
        .bind(limit)
        .fetch_all(&self.repository.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| PopularBook {
                id: row.get("id"),
                title: row.get("title"),
                author: row.get("author"),
                isbn: row.get("isbn"),
                category: row.get("category"),
                borrow_count: row.get("borrow_count"),
            })
            .collect())
    }

    /// Loans past their due date and not returned, oldest due first, with
    /// the fine each would owe if returned now
    pub async fn overdue_report(&self) -> AppResult<Vec<OverdueLoan>> {
        let rows = sqlx::query(
            r#"
            SELECT l.id, l.user_id, l.book_id, l.borrow_date, l.due_date,
                   b.title AS book_title, b.author AS book_author, b.isbn AS book_isbn,
                   u.name AS user_name, u.email AS user_email
            FROM loans l
            JOIN books b ON b.id = l.book_id
            JOIN users u ON u.id = l.user_id
            WHERE l.status = 'active' AND l.due_date < NOW()
            ORDER BY l.due_date
            "#,
        )
        .fetch_all(&self.repository.pool)
        .await?;

        let now = Utc::now();
        Ok(rows
            .iter()
            .map(|row| {
                let due_date: DateTime<Utc> = row.get("due_date");
                let days_overdue = days_late(due_date, now);
                OverdueLoan {
                    loan_id: row.get("id"),
                    book: BookShort {
                        id: row.get("book_id"),
                        title: row.get("book_title"),
                        author: row.get("book_author"),
                        isbn: row.get("book_isbn"),
                    },
                    user: UserShort {
                        id: row.get("user_id"),
                        name: row.get("user_name"),
                        email: row.get("user_email"),
                    },
                    borrow_date: row.get("borrow_date"),
                    due_date,
                    days_overdue,
                    fine: rust_decimal::Decimal::from(days_overdue) * self.lending.fine_per_day,
                }
            })
            .collect())
    }

    /// Title and copy counts per category, largest holdings first
    pub async fn category_distribution(&self) -> AppResult<Vec<CategoryDistribution>> {
        let rows = sqlx::query(
            r#"
            SELECT category,
                   COUNT(*) AS titles,
                   SUM(quantity) AS total_copies,
                   SUM(available_copies) AS available_copies
            FROM books
            WHERE deleted_at IS NULL
            GROUP BY category
            ORDER BY total_copies DESC, category
            "#,
        )
        .fetch_all(&self.repository.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| CategoryDistribution {
                category: row.get("category"),
                titles: row.get("titles"),
                total_copies: row.get("total_copies"),
                available_copies: row.get("available_copies"),
            })
            .collect())
    }

    /// Per-user borrowing activity: borrows over a trailing window plus the
    /// count of loans currently overdue, most active first
    pub async fn user_activity(&self, days: i64, limit: i64) -> AppResult<Vec<UserActivity>> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.name, u.email, u.role,
                   COUNT(l.id) FILTER (
                       WHERE l.borrow_date >= NOW() - ($1 || ' days')::interval
                   ) AS total_borrows,
                   COUNT(l.id) FILTER (
                       WHERE l.status = 'active' AND l.due_date < NOW()
                   ) AS overdue_count
            FROM users u
            LEFT JOIN loans l ON l.user_id = u.id
            WHERE u.deleted_at IS NULL
            GROUP BY u.id, u.name, u.email, u.role
            ORDER BY total_borrows DESC, u.name
            LIMIT $2
            "#,
        )
        .bind(days.to_string())
        .bind(limit)
        .fetch_all(&self.repository.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| UserActivity {
                id: row.get("id"),
                name: row.get("name"),
                email: row.get("email"),
                role: row.get("role"),
                total_borrows: row.get("total_borrows"),
                overdue_count: row.get("overdue_count"),
            })
            .collect())
    }
}
