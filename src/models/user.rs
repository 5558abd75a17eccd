//! User model, roles and token claims

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

use super::SoftDelete;

/// User roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Librarian,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Librarian => "librarian",
            Role::Admin => "admin",
        }
    }

    /// Staff roles may manage the catalog, users and reservations
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Librarian | Role::Admin)
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            "librarian" => Role::Librarian,
            _ => Role::Member,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Suspended,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Suspended => "suspended",
        }
    }
}

/// User model from database. Credentials live with the external identity
/// provider; this server only stores the directory entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::from(self.role.as_str())
    }
}

impl SoftDelete for User {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// Short user representation embedded in loan/reservation details
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserShort {
    pub id: i32,
    pub name: String,
    pub email: String,
}

/// Claims carried in tokens minted by the external issuer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    /// User id
    pub sub: i32,
    pub role: String,
    pub exp: usize,
}

impl UserClaims {
    /// Verify a bearer token and extract its claims
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        let validation = Validation::new(Algorithm::HS256);
        let data = jsonwebtoken::decode::<UserClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )?;
        Ok(data.claims)
    }

    pub fn user_id(&self) -> i32 {
        self.sub
    }

    pub fn role(&self) -> Role {
        Role::from(self.role.as_str())
    }

    pub fn is_staff(&self) -> bool {
        self.role().is_staff()
    }

    pub fn require_staff(&self) -> AppResult<()> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Staff privileges required".to_string()))
        }
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.role() == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin privileges required".to_string()))
        }
    }

    /// Members may only act on their own records; staff may act for anyone
    pub fn require_self_or_staff(&self, user_id: i32) -> AppResult<()> {
        if self.sub == user_id || self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Not authorized for this user's records".to_string(),
            ))
        }
    }
}

/// Create user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub role: Option<Role>,
}

/// Update user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

/// User query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct UserQuery {
    pub role: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: &str, sub: i32) -> UserClaims {
        UserClaims {
            sub,
            role: role.to_string(),
            exp: 0,
        }
    }

    #[test]
    fn member_cannot_pass_staff_gate() {
        assert!(claims("member", 1).require_staff().is_err());
        assert!(claims("librarian", 1).require_staff().is_ok());
        assert!(claims("admin", 1).require_staff().is_ok());
    }

    #[test]
    fn only_admin_passes_admin_gate() {
        assert!(claims("librarian", 1).require_admin().is_err());
        assert!(claims("admin", 1).require_admin().is_ok());
    }

    #[test]
    fn self_or_staff_gate() {
        assert!(claims("member", 5).require_self_or_staff(5).is_ok());
        assert!(claims("member", 5).require_self_or_staff(6).is_err());
        assert!(claims("librarian", 5).require_self_or_staff(6).is_ok());
    }
}
