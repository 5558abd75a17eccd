//! Books repository: catalog CRUD and the availability ledger

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, BookStatus, CreateBook, UpdateBook},
};

use super::is_unique_violation;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID (soft-deleted books are treated as absent)
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// List books with filters and pagination
    pub async fn list(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let filter = r#"
            deleted_at IS NULL
            AND ($1::text IS NULL OR category = $1)
            AND ($2::text IS NULL OR status = $2)
            AND ($3::text IS NULL
                 OR title ILIKE '%' || $3 || '%'
                 OR author ILIKE '%' || $3 || '%'
                 OR isbn ILIKE '%' || $3 || '%')
        "#;

        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT * FROM books WHERE {filter} ORDER BY created_at DESC LIMIT $4 OFFSET $5"
        ))
        .bind(&query.category)
        .bind(&query.status)
        .bind(&query.search)
        .bind(per_page)
        .bind((page - 1) * per_page)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM books WHERE {filter}"))
            .bind(&query.category)
            .bind(&query.status)
            .bind(&query.search)
            .fetch_one(&self.pool)
            .await?;

        Ok((books, total))
    }

    /// Create a catalog entry; all copies start on the shelf
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, isbn, category, description, published_year,
                               shelf, row, quantity, available_copies, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.category)
        .bind(&book.description)
        .bind(book.published_year)
        .bind(&book.shelf)
        .bind(&book.row)
        .bind(book.quantity)
        .bind(BookStatus::for_copies(book.quantity).as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("A book with ISBN {} already exists", book.isbn))
            } else {
                e.into()
            }
        })
    }

    /// Update a catalog entry. A quantity change shifts available_copies by
    /// the same delta so the number of copies out on loan is preserved.
    pub async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                isbn = COALESCE($4, isbn),
                category = COALESCE($5, category),
                description = COALESCE($6, description),
                published_year = COALESCE($7, published_year),
                shelf = COALESCE($8, shelf),
                row = COALESCE($9, row),
                available_copies = CASE WHEN $10::int IS NULL THEN available_copies
                    ELSE GREATEST(0, LEAST($10, available_copies + ($10 - quantity))) END,
                quantity = COALESCE($10, quantity),
                status = CASE
                    WHEN (CASE WHEN $10::int IS NULL THEN available_copies
                          ELSE GREATEST(0, LEAST($10, available_copies + ($10 - quantity))) END) > 0
                    THEN 'available' ELSE 'unavailable' END,
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.title)
        .bind(&update.author)
        .bind(&update.isbn)
        .bind(&update.category)
        .bind(&update.description)
        .bind(update.published_year)
        .bind(&update.shelf)
        .bind(&update.row)
        .bind(update.quantity)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("A book with this ISBN already exists".to_string())
            } else {
                AppError::from(e)
            }
        })?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Soft-delete a book. Refused while copies are out on loan.
    pub async fn soft_delete(&self, id: i32) -> AppResult<()> {
        let on_loan: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE book_id = $1 AND status = 'active')",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if on_loan {
            return Err(AppError::Conflict(
                "Book has copies out on loan".to_string(),
            ));
        }

        let result = sqlx::query(
            "UPDATE books SET deleted_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }

    /// Take one copy off the shelf. The conditional update is what serializes
    /// concurrent borrows of the same book: only rows with a copy left match,
    /// so the count can never go negative.
    pub async fn decrement_availability(conn: &mut PgConnection, book_id: i32) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                available_copies = available_copies - 1,
                status = CASE WHEN available_copies - 1 > 0 THEN 'available' ELSE 'unavailable' END,
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL AND available_copies > 0
            RETURNING *
            "#,
        )
        .bind(book_id)
        .fetch_optional(&mut *conn)
        .await?;

        match book {
            Some(book) => Ok(book),
            None => {
                let exists: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM books WHERE id = $1 AND deleted_at IS NULL)",
                )
                .bind(book_id)
                .fetch_one(conn)
                .await?;
                if exists {
                    Err(AppError::OutOfStock)
                } else {
                    Err(AppError::NotFound(format!("Book with id {} not found", book_id)))
                }
            }
        }
    }

    /// Put one copy back on the shelf, capped at the owned quantity. Hitting
    /// the cap means an upstream accounting bug; the caller's transaction is
    /// aborted rather than silently clamping.
    pub async fn increment_availability(conn: &mut PgConnection, book_id: i32) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                available_copies = available_copies + 1,
                status = 'available',
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL AND available_copies < quantity
            RETURNING *
            "#,
        )
        .bind(book_id)
        .fetch_optional(&mut *conn)
        .await?;

        match book {
            Some(book) => Ok(book),
            None => {
                let exists: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM books WHERE id = $1 AND deleted_at IS NULL)",
                )
                .bind(book_id)
                .fetch_one(conn)
                .await?;
                if exists {
                    tracing::error!(
                        book_id,
                        "availability increment would exceed owned quantity"
                    );
                    Err(AppError::Conflict(
                        "Book availability would exceed owned quantity".to_string(),
                    ))
                } else {
                    Err(AppError::NotFound(format!("Book with id {} not found", book_id)))
                }
            }
        }
    }
}
