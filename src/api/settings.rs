//! Settings endpoints

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::settings::{SystemSettings, UpdateSettings},
    AppState,
};

use super::{AuthenticatedUser, ValidJson};

/// Get current system settings
#[utoipa::path(
    get,
    path = "/settings",
    tag = "settings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current settings", body = SystemSettings)
    )
)]
pub async fn get_settings(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<SystemSettings>> {
    Ok(Json(state.services.settings.get().await))
}

/// Update system settings (partial)
#[utoipa::path(
    put,
    path = "/settings",
    tag = "settings",
    security(("bearer_auth" = [])),
    request_body = UpdateSettings,
    responses(
        (status = 200, description = "Settings updated", body = SystemSettings),
        (status = 400, description = "Invalid or unknown field"),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn update_settings(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidJson(update): ValidJson<UpdateSettings>,
) -> AppResult<Json<SystemSettings>> {
    claims.require_admin()?;

    let settings = state.services.settings.update(update).await?;
    Ok(Json(settings))
}
