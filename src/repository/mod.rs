//! Repository layer for database operations

pub mod categories;
pub mod ledger;
pub mod loans;
pub mod memory;
pub mod settings;
pub mod tools;
pub mod users;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub tools: tools::ToolsRepository,
    pub categories: categories::CategoriesRepository,
    pub users: users::UsersRepository,
    pub loans: loans::LoansRepository,
    pub settings: settings::SettingsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            tools: tools::ToolsRepository::new(pool.clone()),
            categories: categories::CategoriesRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            settings: settings::SettingsRepository::new(pool.clone()),
            pool,
        }
    }
}
