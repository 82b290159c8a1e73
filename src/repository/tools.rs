//! Tools repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::ToolStatus,
        tool::{Tool, ToolQuery, ToolRow, UpdateTool},
    },
};

/// Values for a new tool row, after defaults have been applied
#[derive(Debug)]
pub struct NewTool {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub qr_code: String,
    pub location: Option<String>,
    pub maintenance: bool,
    pub quantity: i32,
    pub available_quantity: i32,
}

#[derive(Clone)]
pub struct ToolsRepository {
    pool: Pool<Postgres>,
}

impl ToolsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List tools with optional filters
    pub async fn list(&self, query: &ToolQuery) -> AppResult<Vec<Tool>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM tools WHERE TRUE");

        if let Some(ref category) = query.category {
            builder.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(ref search) = query.search {
            builder
                .push(" AND name ILIKE ")
                .push_bind(format!("%{}%", search.trim()));
        }
        match query.status {
            Some(ToolStatus::Maintenance) => {
                builder.push(" AND maintenance = TRUE");
            }
            Some(ToolStatus::Borrowed) => {
                builder.push(" AND maintenance = FALSE AND available_quantity = 0");
            }
            Some(ToolStatus::Available) => {
                builder.push(" AND maintenance = FALSE AND available_quantity > 0");
            }
            None => {}
        }
        builder.push(" ORDER BY name");

        let rows = builder
            .build_query_as::<ToolRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Tool::from).collect())
    }

    /// Get tool by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Tool> {
        sqlx::query_as::<_, ToolRow>("SELECT * FROM tools WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Tool::from)
            .ok_or_else(|| AppError::NotFound(format!("Tool with id {} not found", id)))
    }

    /// Get tool by its QR code
    pub async fn get_by_qr_code(&self, qr_code: &str) -> AppResult<Tool> {
        sqlx::query_as::<_, ToolRow>("SELECT * FROM tools WHERE qr_code = $1")
            .bind(qr_code)
            .fetch_optional(&self.pool)
            .await?
            .map(Tool::from)
            .ok_or_else(|| AppError::NotFound(format!("No tool with QR code {}", qr_code)))
    }

    /// Check if a QR code is already used
    pub async fn qr_code_exists(&self, qr_code: &str, exclude_id: Option<Uuid>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM tools WHERE qr_code = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(qr_code)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Create a tool
    pub async fn create(&self, data: &NewTool) -> AppResult<Tool> {
        let row = sqlx::query_as::<_, ToolRow>(
            r#"
            INSERT INTO tools (id, name, description, category, qr_code, maintenance, quantity, available_quantity, location)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.category)
        .bind(&data.qr_code)
        .bind(data.maintenance)
        .bind(data.quantity)
        .bind(data.available_quantity)
        .bind(&data.location)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_db(e, "QR code already in use"))?;
        Ok(row.into())
    }

    /// Update tool metadata
    pub async fn update(&self, id: Uuid, data: &UpdateTool) -> AppResult<Tool> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE tools SET updated_at = ");
        builder.push_bind(Utc::now());

        macro_rules! set_field {
            ($field:expr, $name:expr) => {
                if let Some(ref val) = $field {
                    builder.push(concat!(", ", $name, " = ")).push_bind(val.clone());
                }
            };
        }

        set_field!(data.name, "name");
        set_field!(data.description, "description");
        set_field!(data.category, "category");
        set_field!(data.qr_code, "qr_code");
        set_field!(data.location, "location");
        set_field!(data.maintenance, "maintenance");

        builder.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        builder
            .build_query_as::<ToolRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::from_db(e, "QR code already in use"))?
            .map(Tool::from)
            .ok_or_else(|| AppError::NotFound(format!("Tool with id {} not found", id)))
    }

    /// Delete a tool
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM tools WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_db(e, "Tool is still referenced"))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Tool with id {} not found", id)));
        }
        Ok(())
    }

    /// Check whether any loan references the tool
    pub async fn has_loans(&self, id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM loans WHERE tool_id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}
