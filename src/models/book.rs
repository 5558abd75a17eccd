//! Book (catalog entry) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::SoftDelete;

/// Availability status, derived from `available_copies`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    Available,
    Unavailable,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "available",
            BookStatus::Unavailable => "unavailable",
        }
    }

    /// The status consistent with a given copy count
    pub fn for_copies(available_copies: i32) -> Self {
        if available_copies > 0 {
            BookStatus::Available
        } else {
            BookStatus::Unavailable
        }
    }
}

impl From<&str> for BookStatus {
    fn from(s: &str) -> Self {
        match s {
            "unavailable" => BookStatus::Unavailable,
            _ => BookStatus::Available,
        }
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Full book model (DB + API)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub category: String,
    pub description: Option<String>,
    pub published_year: Option<i32>,
    pub shelf: Option<String>,
    pub row: Option<String>,
    /// Total owned copies
    pub quantity: i32,
    /// Copies currently on the shelf; `0 <= available_copies <= quantity`
    pub available_copies: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

// Manual impl: the `FromRow` derive's generated `let row = ...` bindings are
// shadowed by the field named `row`, so it fails to compile.
impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for Book {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            isbn: row.try_get("isbn")?,
            category: row.try_get("category")?,
            description: row.try_get("description")?,
            published_year: row.try_get("published_year")?,
            shelf: row.try_get("shelf")?,
            row: row.try_get("row")?,
            quantity: row.try_get("quantity")?,
            available_copies: row.try_get("available_copies")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }
}

impl Book {
    pub fn status(&self) -> BookStatus {
        BookStatus::from(self.status.as_str())
    }

    /// Reservation eligibility: copies on the shelf and a pending queue
    /// shorter than the physical stock. `pending_reservations` must already
    /// exclude expired entries.
    pub fn can_be_reserved(&self, pending_reservations: i64) -> bool {
        self.available_copies > 0 && pending_reservations < self.quantity as i64
    }
}

impl SoftDelete for Book {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// Short book representation embedded in loan/reservation details
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookShort {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: String,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub author: String,
    #[validate(length(min = 1))]
    pub isbn: String,
    #[validate(length(min = 1))]
    pub category: String,
    pub description: Option<String>,
    pub published_year: Option<i32>,
    pub shelf: Option<String>,
    pub row: Option<String>,
    #[validate(range(min = 0))]
    pub quantity: i32,
}

/// Update book request; omitted fields are left unchanged
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub published_year: Option<i32>,
    pub shelf: Option<String>,
    pub row: Option<String>,
    #[validate(range(min = 0))]
    pub quantity: Option<i32>,
}

/// Book query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    pub category: Option<String>,
    pub status: Option<String>,
    /// Free-text search over title, author, ISBN
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(quantity: i32, available: i32) -> Book {
        let now = Utc::now();
        Book {
            id: 1,
            title: "The Pillow Book".into(),
            author: "Sei Shonagon".into(),
            isbn: "978-0-14-044806-1".into(),
            category: "classics".into(),
            description: None,
            published_year: Some(1002),
            shelf: Some("A".into()),
            row: Some("3".into()),
            quantity,
            available_copies: available,
            status: BookStatus::for_copies(available).as_str().into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn status_follows_copies() {
        assert_eq!(BookStatus::for_copies(0), BookStatus::Unavailable);
        assert_eq!(BookStatus::for_copies(1), BookStatus::Available);
        assert_eq!(book(2, 0).status(), BookStatus::Unavailable);
    }

    #[test]
    fn reservable_with_copies_and_queue_room() {
        let b = book(2, 1);
        assert!(b.can_be_reserved(0));
        assert!(b.can_be_reserved(1));
    }

    #[test]
    fn not_reservable_when_queue_reaches_stock() {
        // quantity=2 with 2 pending reservations
        let b = book(2, 2);
        assert!(!b.can_be_reserved(2));
    }

    #[test]
    fn not_reservable_without_copies() {
        let b = book(3, 0);
        assert!(!b.can_be_reserved(0));
    }
}
