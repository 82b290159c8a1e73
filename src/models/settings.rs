//! System settings model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Persisted system settings (single row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettings {
    pub app_name: String,
    pub app_description: String,
    pub allow_registration: bool,
    pub require_approval: bool,
    /// Loans open longer than this are reported as overdue
    pub max_loan_days: i32,
    pub email_notifications: bool,
    pub updated_at: DateTime<Utc>,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            app_name: "Sistema de Inventario".to_string(),
            app_description: "Colegio - Gestión de Herramientas".to_string(),
            allow_registration: false,
            require_approval: true,
            max_loan_days: 30,
            email_notifications: false,
            updated_at: Utc::now(),
        }
    }
}

impl SystemSettings {
    /// Merge a partial update into these settings
    pub fn merge(&mut self, update: UpdateSettings) {
        if let Some(v) = update.app_name {
            self.app_name = v;
        }
        if let Some(v) = update.app_description {
            self.app_description = v;
        }
        if let Some(v) = update.allow_registration {
            self.allow_registration = v;
        }
        if let Some(v) = update.require_approval {
            self.require_approval = v;
        }
        if let Some(v) = update.max_loan_days {
            self.max_loan_days = v;
        }
        if let Some(v) = update.email_notifications {
            self.email_notifications = v;
        }
    }
}

/// Partial settings update
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateSettings {
    #[validate(length(min = 1, max = 100))]
    pub app_name: Option<String>,
    #[validate(length(max = 255))]
    pub app_description: Option<String>,
    pub allow_registration: Option<bool>,
    pub require_approval: Option<bool>,
    #[validate(range(min = 1, max = 365, message = "Max loan days must be between 1 and 365"))]
    pub max_loan_days: Option<i32>,
    pub email_notifications: Option<bool>,
}
