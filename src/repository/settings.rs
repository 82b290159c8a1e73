//! System settings persistence

use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::settings::SystemSettings,
};

#[derive(Clone)]
pub struct SettingsRepository {
    pool: Pool<Postgres>,
}

impl SettingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Load the settings row, if present
    pub async fn load(&self) -> AppResult<Option<SystemSettings>> {
        let settings = sqlx::query_as::<_, SystemSettings>("SELECT * FROM system_settings WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(settings)
    }

    /// Insert or replace the settings row
    pub async fn save(&self, settings: &SystemSettings) -> AppResult<SystemSettings> {
        let saved = sqlx::query_as::<_, SystemSettings>(
            r#"
            INSERT INTO system_settings (
                id, app_name, app_description, allow_registration, require_approval,
                max_loan_days, email_notifications, updated_at
            )
            VALUES (1, $1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (id) DO UPDATE SET
                app_name = EXCLUDED.app_name,
                app_description = EXCLUDED.app_description,
                allow_registration = EXCLUDED.allow_registration,
                require_approval = EXCLUDED.require_approval,
                max_loan_days = EXCLUDED.max_loan_days,
                email_notifications = EXCLUDED.email_notifications,
                updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
        )
        .bind(&settings.app_name)
        .bind(&settings.app_description)
        .bind(settings.allow_registration)
        .bind(settings.require_approval)
        .bind(settings.max_loan_days)
        .bind(settings.email_notifications)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }
}
