//! Error types for Toolshed server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error codes returned in error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NotFound = 4,
    InsufficientStock = 5,
    InvalidState = 6,
    QuantityExceeded = 7,
    InvalidRange = 8,
    Conflict = 9,
    BadValue = 10,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    /// Borrow asks for more units than the tool has available
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    /// Operation not allowed in the current loan/tool state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Return asks for more units than the loan holds
    #[error("Quantity exceeded: {0}")]
    QuantityExceeded(String),

    /// Negative or inverted stock values
    #[error("Invalid range: {0}")]
    InvalidRange(String),
}

impl AppError {
    /// Map a database error, surfacing serialization failures and deadlocks as `Conflict`
    /// and unique violations as `Conflict` with the given message.
    pub fn from_db(err: sqlx::Error, unique_msg: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if let Some(code) = db_err.code() {
                match code.as_ref() {
                    "40001" | "40P01" => {
                        return AppError::Conflict("Concurrent update detected, try again".to_string())
                    }
                    "23505" => return AppError::Conflict(unique_msg.to_string()),
                    "23503" => {
                        return AppError::Conflict("Record is still referenced by loans".to_string())
                    }
                    _ => {}
                }
            }
        }
        AppError::Database(err)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NotFound, msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Conflict, msg.clone()),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::InsufficientStock(msg) => {
                (StatusCode::CONFLICT, ErrorCode::InsufficientStock, msg.clone())
            }
            AppError::InvalidState(msg) => {
                (StatusCode::CONFLICT, ErrorCode::InvalidState, msg.clone())
            }
            AppError::QuantityExceeded(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::QuantityExceeded,
                msg.clone(),
            ),
            AppError::InvalidRange(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::InvalidRange,
                msg.clone(),
            ),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
