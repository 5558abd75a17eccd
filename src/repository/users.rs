//! Users repository for directory operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, Role, UpdateUser, User, UserQuery},
};

use super::is_unique_violation;

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// List users with filters and pagination
    pub async fn list(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let filter = r#"
            deleted_at IS NULL
            AND ($1::text IS NULL OR role = $1)
            AND ($2::text IS NULL OR status = $2)
            AND ($3::text IS NULL
                 OR name ILIKE '%' || $3 || '%'
                 OR email ILIKE '%' || $3 || '%')
        "#;

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT * FROM users WHERE {filter} ORDER BY name LIMIT $4 OFFSET $5"
        ))
        .bind(&query.role)
        .bind(&query.status)
        .bind(&query.search)
        .bind(per_page)
        .bind((page - 1) * per_page)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {filter}"))
            .bind(&query.role)
            .bind(&query.status)
            .bind(&query.search)
            .fetch_one(&self.pool)
            .await?;

        Ok((users, total))
    }

    /// Create a directory entry
    pub async fn create(&self, user: &CreateUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, role)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.unwrap_or(Role::Member).as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("A user with email {} already exists", user.email))
            } else {
                e.into()
            }
        })
    }

    /// Update a directory entry
    pub async fn update(&self, id: i32, update: &UpdateUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                role = COALESCE($4, role),
                status = COALESCE($5, status),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.email)
        .bind(update.role.map(|r| r.as_str()))
        .bind(update.status.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("A user with this email already exists".to_string())
            } else {
                AppError::from(e)
            }
        })?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Soft-delete a user. Refused while the user has books out on loan.
    pub async fn soft_delete(&self, id: i32) -> AppResult<()> {
        let has_loans: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE user_id = $1 AND status = 'active')",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if has_loans {
            return Err(AppError::Conflict(
                "User has books out on loan".to_string(),
            ));
        }

        let result = sqlx::query(
            "UPDATE users SET deleted_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }
}
