//! Error types for Biblios server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Application error codes exposed to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchData = 4,
    BadValue = 5,
    OutOfStock = 6,
    NotReservable = 7,
    Conflict = 8,
    AmountMismatch = 9,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Payment amount does not match the currently computed fine
    #[error("Payment amount does not match the outstanding fine (expected {expected})")]
    AmountMismatch { expected: Decimal },

    #[error("No copies available")]
    OutOfStock,

    #[error("Book cannot be reserved at this time")]
    NotReservable,

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage-level failure; the request may be retried once the store recovers
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
    /// Expected payment amount, set on amount-mismatch errors only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_amount: Option<Decimal>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut expected_amount = None;

        let (status, code, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::AmountMismatch { expected } => {
                expected_amount = Some(*expected);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorCode::AmountMismatch,
                    self.to_string(),
                )
            }
            AppError::OutOfStock => {
                (StatusCode::CONFLICT, ErrorCode::OutOfStock, self.to_string())
            }
            AppError::NotReservable => {
                (StatusCode::CONFLICT, ErrorCode::NotReservable, self.to_string())
            }
            AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, ErrorCode::Conflict, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
            expected_amount,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
