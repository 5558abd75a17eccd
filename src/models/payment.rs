//! Payment model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::SoftDelete;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    MobileBanking,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::MobileBanking => "mobile_banking",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment settlement state. No gateway is modelled, so payments created
/// through the API are recorded as `completed` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

/// Payment model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    pub id: i32,
    pub user_id: i32,
    pub loan_id: i32,
    pub amount: Decimal,
    pub payment_method: String,
    pub status: String,
    pub payment_date: DateTime<Utc>,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SoftDelete for Payment {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// Create payment request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePayment {
    pub loan_id: i32,
    /// Must equal the fine currently computed for the loan
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub reference: Option<String>,
}

/// Payment query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct PaymentQuery {
    pub status: Option<String>,
    pub payment_method: Option<String>,
    pub user_id: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Totals per payment method, for the summary report
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct MethodTotal {
    pub payment_method: String,
    pub total: Decimal,
    pub count: i64,
}

/// Collected-fines summary
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentSummary {
    pub total_collected: Decimal,
    pub by_method: Vec<MethodTotal>,
}
