//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, categories, health, loans, settings, stats, tools, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Toolshed API",
        version = "1.0.0",
        description = "School tool inventory REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        auth::verify,
        auth::update_profile,
        // Tools
        tools::list_tools,
        tools::get_tool,
        tools::get_tool_by_qr,
        tools::create_tool,
        tools::update_tool,
        tools::delete_tool,
        tools::adjust_stock,
        // Categories
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        // Loans
        loans::list_loans,
        loans::get_loan,
        loans::get_user_loans,
        loans::borrow,
        loans::bulk_borrow,
        loans::return_loan,
        // Stats
        stats::get_stats,
        // Settings
        settings::get_settings,
        settings::update_settings,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            // Tools
            crate::models::tool::Tool,
            crate::models::tool::ToolShort,
            crate::models::tool::CreateTool,
            crate::models::tool::UpdateTool,
            crate::models::tool::AdjustStock,
            crate::models::enums::ToolStatus,
            // Categories
            crate::models::category::Category,
            crate::models::category::CreateCategory,
            crate::models::category::UpdateCategory,
            // Users
            crate::models::user::User,
            crate::models::user::UserShort,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            crate::models::user::UpdateProfile,
            crate::models::enums::Role,
            // Loans
            crate::models::loan::Loan,
            crate::models::loan::LoanDetails,
            crate::models::loan::LoanFilter,
            crate::models::loan::BorrowRequest,
            crate::models::loan::BorrowLine,
            crate::models::loan::BulkBorrowRequest,
            crate::models::loan::ReturnRequest,
            crate::models::enums::LoanStatus,
            // Stats
            crate::services::stats::StatsResponse,
            crate::services::stats::InventoryTotals,
            // Settings
            crate::models::settings::SystemSettings,
            crate::models::settings::UpdateSettings,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "tools", description = "Tool catalog and stock"),
        (name = "categories", description = "Tool categories"),
        (name = "users", description = "User management"),
        (name = "loans", description = "Borrowing and returns"),
        (name = "stats", description = "Statistics"),
        (name = "settings", description = "System settings")
    )
)]
pub struct ApiDoc;

/// Registers the JWT bearer scheme referenced by `security(("bearer_auth" = []))`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
