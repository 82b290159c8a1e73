//! Tool catalog service

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::tool::{
        generate_qr_code, normalize_qr_code, validate_stock_range, CreateTool, Tool, ToolQuery,
        UpdateTool,
    },
    repository::{tools::NewTool, Repository},
};

#[derive(Clone)]
pub struct ToolsService {
    repository: Repository,
}

impl ToolsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &ToolQuery) -> AppResult<Vec<Tool>> {
        self.repository.tools.list(query).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Tool> {
        self.repository.tools.get_by_id(id).await
    }

    /// Resolve a scanned QR code
    pub async fn get_by_qr_code(&self, qr_code: &str) -> AppResult<Tool> {
        self.repository.tools.get_by_qr_code(qr_code.trim()).await
    }

    /// Create a tool. Stock defaults to one unit, fully available.
    pub async fn create(&self, data: CreateTool) -> AppResult<Tool> {
        let quantity = data.quantity.unwrap_or(1);
        let available_quantity = data.available_quantity.unwrap_or(quantity);
        validate_stock_range(quantity, available_quantity)?;

        let qr_code = match data.qr_code {
            Some(code) => {
                let code = normalize_qr_code(&code)?;
                self.ensure_qr_code_free(&code, None).await?;
                code
            }
            None => generate_qr_code(),
        };

        let tool = self
            .repository
            .tools
            .create(&NewTool {
                name: data.name.trim().to_string(),
                description: data.description,
                category: data.category,
                qr_code,
                location: data.location,
                maintenance: data.maintenance.unwrap_or(false),
                quantity,
                available_quantity,
            })
            .await?;

        tracing::info!(tool_id = %tool.id, qr_code = %tool.qr_code, quantity, "Tool created");
        Ok(tool)
    }

    pub async fn update(&self, id: Uuid, mut data: UpdateTool) -> AppResult<Tool> {
        if let Some(code) = data.qr_code.take() {
            let code = normalize_qr_code(&code)?;
            self.ensure_qr_code_free(&code, Some(id)).await?;
            data.qr_code = Some(code);
        }
        self.repository.tools.update(id, &data).await
    }

    async fn ensure_qr_code_free(&self, code: &str, exclude: Option<Uuid>) -> AppResult<()> {
        if self.repository.tools.qr_code_exists(code, exclude).await? {
            return Err(AppError::Conflict(format!("QR code {} already in use", code)));
        }
        Ok(())
    }

    /// Delete a tool that no loan references
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if self.repository.tools.has_loans(id).await? {
            return Err(AppError::Conflict(
                "Tool has loan history and cannot be deleted".to_string(),
            ));
        }
        self.repository.tools.delete(id).await?;
        tracing::info!(tool_id = %id, "Tool deleted");
        Ok(())
    }
}
