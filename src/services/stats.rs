//! Dashboard statistics

use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::{error::AppResult, repository::Repository};

use super::settings::SettingsService;

#[derive(Debug, Clone, Default, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryTotals {
    pub total_tools: i64,
    pub total_units: i64,
    pub available_units: i64,
    pub units_on_loan: i64,
    pub tools_in_maintenance: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[serde(flatten)]
    pub inventory: InventoryTotals,
    pub active_loans: i64,
    pub overdue_loans: i64,
    pub total_users: i64,
    pub total_categories: i64,
}

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
    settings: SettingsService,
}

impl StatsService {
    pub fn new(repository: Repository, settings: SettingsService) -> Self {
        Self { repository, settings }
    }

    pub async fn get_stats(&self) -> AppResult<StatsResponse> {
        let pool = &self.repository.pool;

        let inventory = sqlx::query_as::<_, InventoryTotals>(
            r#"
            SELECT COUNT(*) AS total_tools,
                   COALESCE(SUM(quantity), 0)::BIGINT AS total_units,
                   COALESCE(SUM(available_quantity), 0)::BIGINT AS available_units,
                   COALESCE(SUM(quantity - available_quantity), 0)::BIGINT AS units_on_loan,
                   COUNT(*) FILTER (WHERE maintenance) AS tools_in_maintenance
            FROM tools
            "#,
        )
        .fetch_one(pool)
        .await?;

        let max_days = self.settings.max_loan_days().await;
        let active_loans = self.repository.loans.count_active().await?;
        let overdue_loans = self.repository.loans.count_overdue(max_days).await?;
        let total_users = self.repository.users.count().await?;
        let total_categories: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(pool)
            .await?;

        Ok(StatsResponse {
            inventory,
            active_loans,
            overdue_loans,
            total_users,
            total_categories,
        })
    }
}
