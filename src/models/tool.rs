//! Tool model and stock rules

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::enums::ToolStatus;
use crate::error::{AppError, AppResult};

/// Internal row structure for tool queries
#[derive(Debug, Clone, FromRow)]
pub struct ToolRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub qr_code: String,
    pub maintenance: bool,
    pub quantity: i32,
    pub available_quantity: i32,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ToolRow> for Tool {
    fn from(row: ToolRow) -> Self {
        Tool {
            status: ToolStatus::derive(row.maintenance, row.available_quantity),
            id: row.id,
            name: row.name,
            description: row.description,
            category: row.category,
            qr_code: row.qr_code,
            maintenance: row.maintenance,
            quantity: row.quantity,
            available_quantity: row.available_quantity,
            location: row.location,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Tool with its derived status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Category name
    pub category: Option<String>,
    pub qr_code: String,
    pub status: ToolStatus,
    /// Manual maintenance override
    pub maintenance: bool,
    /// Total units owned
    pub quantity: i32,
    /// Units currently loanable
    pub available_quantity: i32,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tool {
    /// New tool with every unit available
    pub fn new(name: impl Into<String>, qr_code: impl Into<String>, quantity: i32, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            category: None,
            qr_code: qr_code.into(),
            status: ToolStatus::derive(false, quantity),
            maintenance: false,
            quantity,
            available_quantity: quantity,
            location: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Units currently out on loan according to the stock counters
    pub fn loaned_quantity(&self) -> i32 {
        self.quantity - self.available_quantity
    }

    fn refresh(&mut self, now: DateTime<Utc>) {
        self.status = ToolStatus::derive(self.maintenance, self.available_quantity);
        self.updated_at = now;
    }

    /// Check that `quantity` units can be borrowed, without mutating the tool.
    pub fn check_take(&self, quantity: i32) -> AppResult<()> {
        if quantity < 1 {
            return Err(AppError::InvalidRange(format!(
                "Borrow quantity must be at least 1 (got {})",
                quantity
            )));
        }
        if self.maintenance {
            return Err(AppError::InvalidState(format!(
                "Tool {} is under maintenance",
                self.id
            )));
        }
        if quantity > self.available_quantity {
            return Err(AppError::InsufficientStock(format!(
                "Requested {} of tool {} but only {} available",
                quantity, self.id, self.available_quantity
            )));
        }
        Ok(())
    }

    /// Remove borrowed units from availability
    pub fn take(&mut self, quantity: i32, now: DateTime<Utc>) -> AppResult<()> {
        self.check_take(quantity)?;
        self.available_quantity -= quantity;
        self.refresh(now);
        Ok(())
    }

    /// Put returned units back, never exceeding the total owned
    pub fn restock(&mut self, quantity: i32, now: DateTime<Utc>) {
        let restored = self.available_quantity.saturating_add(quantity);
        if restored > self.quantity {
            tracing::warn!(
                tool_id = %self.id,
                restored,
                quantity = self.quantity,
                "Returned units exceed owned quantity, clamping availability"
            );
        }
        self.available_quantity = restored.min(self.quantity);
        self.refresh(now);
    }

    /// Administrative stock override.
    ///
    /// `outstanding` is the number of units held by open loans; the total may
    /// not drop below it.
    pub fn set_stock(
        &mut self,
        quantity: i32,
        available_quantity: i32,
        outstanding: i64,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        validate_stock_range(quantity, available_quantity)?;
        if (quantity as i64) < outstanding {
            return Err(AppError::InvalidRange(format!(
                "Quantity {} is below the {} units currently on loan",
                quantity, outstanding
            )));
        }
        self.quantity = quantity;
        self.available_quantity = available_quantity;
        self.refresh(now);
        Ok(())
    }
}

/// Check `0 <= available <= quantity`
pub fn validate_stock_range(quantity: i32, available_quantity: i32) -> AppResult<()> {
    if quantity < 0 || available_quantity < 0 {
        return Err(AppError::InvalidRange(
            "Quantities cannot be negative".to_string(),
        ));
    }
    if available_quantity > quantity {
        return Err(AppError::InvalidRange(format!(
            "Available quantity {} exceeds total quantity {}",
            available_quantity, quantity
        )));
    }
    Ok(())
}

/// Short tool representation embedded in loans
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToolShort {
    pub id: Uuid,
    pub name: String,
    pub qr_code: String,
    pub category: Option<String>,
}

/// Tool query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ToolQuery {
    pub category: Option<String>,
    pub status: Option<ToolStatus>,
    /// Case-insensitive name search
    pub search: Option<String>,
}

/// Create tool request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTool {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Generated when omitted
    #[validate(length(min = 1, max = 100, message = "QR code must be 1-100 characters"))]
    pub qr_code: Option<String>,
    pub location: Option<String>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i32>,
    #[validate(range(min = 0, message = "Available quantity cannot be negative"))]
    pub available_quantity: Option<i32>,
    pub maintenance: Option<bool>,
}

/// Update tool metadata request (stock goes through the stock endpoint)
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTool {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[validate(length(min = 1, max = 100, message = "QR code must be 1-100 characters"))]
    pub qr_code: Option<String>,
    pub location: Option<String>,
    pub maintenance: Option<bool>,
}

/// Stock adjustment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStock {
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
    #[validate(range(min = 0, message = "Available quantity cannot be negative"))]
    pub available_quantity: i32,
}

/// Generate a QR code identifier for a new tool
pub fn generate_qr_code() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("TOOL-{}", suffix)
}

/// Trim a client-supplied QR code; blank codes are rejected
pub fn normalize_qr_code(code: &str) -> AppResult<String> {
    let code = code.trim();
    if code.is_empty() {
        return Err(AppError::Validation("QR code cannot be blank".to_string()));
    }
    Ok(code.to_string())
}
