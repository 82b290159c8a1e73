//! Tool catalog and stock endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::tool::{AdjustStock, CreateTool, Tool, ToolQuery, UpdateTool},
    AppState,
};

use super::{AuthenticatedUser, ValidJson};

/// List tools
#[utoipa::path(
    get,
    path = "/tools",
    tag = "tools",
    security(("bearer_auth" = [])),
    params(ToolQuery),
    responses(
        (status = 200, description = "List of tools", body = Vec<Tool>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_tools(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<ToolQuery>,
) -> AppResult<Json<Vec<Tool>>> {
    let tools = state.services.tools.list(&query).await?;
    Ok(Json(tools))
}

/// Get tool by ID
#[utoipa::path(
    get,
    path = "/tools/{id}",
    tag = "tools",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Tool ID")),
    responses(
        (status = 200, description = "Tool details", body = Tool),
        (status = 404, description = "Tool not found")
    )
)]
pub async fn get_tool(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Tool>> {
    let tool = state.services.tools.get_by_id(id).await?;
    Ok(Json(tool))
}

/// Resolve a scanned QR code
#[utoipa::path(
    get,
    path = "/tools/qr/{code}",
    tag = "tools",
    security(("bearer_auth" = [])),
    params(("code" = String, Path, description = "QR code content")),
    responses(
        (status = 200, description = "Tool details", body = Tool),
        (status = 404, description = "No tool with this QR code")
    )
)]
pub async fn get_tool_by_qr(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(code): Path<String>,
) -> AppResult<Json<Tool>> {
    let tool = state.services.tools.get_by_qr_code(&code).await?;
    Ok(Json(tool))
}

/// Create a tool
#[utoipa::path(
    post,
    path = "/tools",
    tag = "tools",
    security(("bearer_auth" = [])),
    request_body = CreateTool,
    responses(
        (status = 201, description = "Tool created", body = Tool),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Administrator privileges required"),
        (status = 409, description = "QR code already in use"),
        (status = 422, description = "Available quantity out of range")
    )
)]
pub async fn create_tool(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidJson(tool): ValidJson<CreateTool>,
) -> AppResult<(StatusCode, Json<Tool>)> {
    claims.require_admin()?;

    let created = state.services.tools.create(tool).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update tool metadata
#[utoipa::path(
    put,
    path = "/tools/{id}",
    tag = "tools",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Tool ID")),
    request_body = UpdateTool,
    responses(
        (status = 200, description = "Tool updated", body = Tool),
        (status = 404, description = "Tool not found"),
        (status = 409, description = "QR code already in use")
    )
)]
pub async fn update_tool(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    ValidJson(tool): ValidJson<UpdateTool>,
) -> AppResult<Json<Tool>> {
    claims.require_admin()?;

    let updated = state.services.tools.update(id, tool).await?;
    Ok(Json(updated))
}

/// Delete a tool
#[utoipa::path(
    delete,
    path = "/tools/{id}",
    tag = "tools",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Tool ID")),
    responses(
        (status = 204, description = "Tool deleted"),
        (status = 404, description = "Tool not found"),
        (status = 409, description = "Tool is referenced by loans")
    )
)]
pub async fn delete_tool(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.tools.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Overwrite stock counters
#[utoipa::path(
    put,
    path = "/tools/{id}/stock",
    tag = "tools",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Tool ID")),
    request_body = AdjustStock,
    responses(
        (status = 200, description = "Stock adjusted", body = Tool),
        (status = 404, description = "Tool not found"),
        (status = 409, description = "Concurrent update, retry"),
        (status = 422, description = "Counters out of range")
    )
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    ValidJson(stock): ValidJson<AdjustStock>,
) -> AppResult<Json<Tool>> {
    claims.require_admin()?;

    let tool = state
        .services
        .ledger
        .adjust_stock(id, stock.quantity, stock.available_quantity)
        .await?;
    Ok(Json(tool))
}
