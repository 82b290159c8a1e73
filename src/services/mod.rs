//! Business logic services

pub mod categories;
pub mod ledger;
pub mod loans;
pub mod settings;
pub mod stats;
pub mod tools;
pub mod users;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::{
    config::{AuthConfig, LedgerConfig},
    error::AppResult,
    repository::{ledger::PgLedgerStore, Repository},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub tools: tools::ToolsService,
    pub categories: categories::CategoriesService,
    pub users: users::UsersService,
    pub ledger: ledger::LedgerService,
    pub loans: loans::LoansService,
    pub settings: settings::SettingsService,
    pub stats: stats::StatsService,
    pool: Pool<Postgres>,
}

impl Services {
    /// Create all services with the given repository.
    /// Loads persisted settings, so the database must be reachable.
    pub async fn new(
        repository: Repository,
        auth_config: AuthConfig,
        ledger_config: LedgerConfig,
    ) -> AppResult<Self> {
        let settings = settings::SettingsService::load(repository.clone()).await?;
        let store = Arc::new(PgLedgerStore::new(repository.pool.clone()));
        let pool = repository.pool.clone();

        Ok(Self {
            tools: tools::ToolsService::new(repository.clone()),
            categories: categories::CategoriesService::new(repository.clone()),
            users: users::UsersService::new(repository.clone(), auth_config),
            ledger: ledger::LedgerService::new(store, ledger_config),
            loans: loans::LoansService::new(repository.clone(), settings.clone()),
            stats: stats::StatsService::new(repository, settings.clone()),
            settings,
            pool,
        })
    }

    /// Check database connectivity
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
