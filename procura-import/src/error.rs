//! Error types for procura-import
//!
//! Two layers:
//! - [`ImportError`]: setup failures that abort a job before anything is
//!   persisted (they become the terminal `error` event)
//! - [`ApiError`]: HTTP-level rejections returned before a stream is opened

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;

/// Fatal import setup error
#[derive(Debug, Error)]
pub enum ImportError {
    /// Workbook bytes could not be retrieved
    #[error("Failed to fetch workbook: {0}")]
    Fetch(String),

    /// Workbook unreadable or structurally invalid (e.g. too few rows)
    #[error("Invalid workbook: {0}")]
    InvalidWorkbook(String),

    /// Required columns could not be resolved from the header row
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Replacing the previous data for the context failed
    #[error("Failed to clear existing data for {context}: {source}")]
    ClearExisting {
        context: String,
        #[source]
        source: StoreError,
    },
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - an import for the same context is already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage error
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Store(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORE_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
