//! System settings service.
//!
//! Settings live in a single database row. The service keeps a cached copy
//! that is loaded at startup and replaced after every successful write.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    error::AppResult,
    models::settings::{SystemSettings, UpdateSettings},
    repository::Repository,
};

#[derive(Clone)]
pub struct SettingsService {
    repository: Repository,
    cache: Arc<RwLock<SystemSettings>>,
}

impl SettingsService {
    /// Load persisted settings, writing the defaults when none exist
    pub async fn load(repository: Repository) -> AppResult<Self> {
        let settings = match repository.settings.load().await? {
            Some(settings) => settings,
            None => {
                tracing::info!("No stored settings found, saving defaults");
                repository.settings.save(&SystemSettings::default()).await?
            }
        };

        Ok(Self {
            repository,
            cache: Arc::new(RwLock::new(settings)),
        })
    }

    pub async fn get(&self) -> SystemSettings {
        self.cache.read().await.clone()
    }

    pub async fn max_loan_days(&self) -> i32 {
        self.cache.read().await.max_loan_days
    }

    /// Merge a partial update, persist it, then refresh the cache
    pub async fn update(&self, update: UpdateSettings) -> AppResult<SystemSettings> {
        let mut cache = self.cache.write().await;
        let mut next = cache.clone();
        next.merge(update);

        let saved = self.repository.settings.save(&next).await?;
        *cache = saved.clone();

        tracing::info!(max_loan_days = saved.max_loan_days, "Settings updated");
        Ok(saved)
    }
}
