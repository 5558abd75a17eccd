//! Biblios Library Lending Server
//!
//! A Rust REST API backend for library lending management, covering the
//! book catalog, the loan lifecycle with overdue-fine accrual, reservations,
//! and fine payment reconciliation.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
