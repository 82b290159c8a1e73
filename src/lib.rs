//! Toolshed: school tool inventory server
//!
//! REST JSON API for a tool catalog, user accounts and an inventory ledger
//! that tracks borrowed and returned units without overselling stock.

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
