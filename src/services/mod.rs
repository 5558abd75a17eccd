//! Business logic services

pub mod catalog;
pub mod loans;
pub mod payments;
pub mod reservations;
pub mod stats;
pub mod users;

use crate::{config::LendingConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub users: users::UsersService,
    pub loans: loans::LoansService,
    pub reservations: reservations::ReservationsService,
    pub payments: payments::PaymentsService,
    pub stats: stats::StatsService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository and lending policy
    pub fn new(repository: Repository, lending: LendingConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            users: users::UsersService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone(), lending.clone()),
            reservations: reservations::ReservationsService::new(repository.clone(), lending.clone()),
            payments: payments::PaymentsService::new(repository.clone(), lending.clone()),
            stats: stats::StatsService::new(repository.clone(), lending),
            repository,
        }
    }

    /// Database connectivity probe backing the readiness endpoint
    pub async fn ping_database(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.repository.pool)
            .await?;
        Ok(())
    }
}
