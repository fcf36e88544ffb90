/// Unified error types for the document registry
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Main error type for the registry
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Alias, hash or record does not resolve to anything stored
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation errors (bad upload hash, oversized body, unsafe alias)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Artifact storage errors
    #[error("Artifact storage error: {0}")]
    Storage(String),

    /// Mapping table persistence errors
    #[error("Mapping table error: {0}")]
    Mapping(String),

    /// JSON encode/decode errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RegistryError {
    /// True for the single "nothing here" outcome the resolver reports
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound(_))
    }
}

/// JSON error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert RegistryError to HTTP response
impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            RegistryError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "NotFound", self.to_string())
            }
            RegistryError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            // Storage messages name paths on disk; keep them in the log only
            RegistryError::Storage(_)
            | RegistryError::Mapping(_)
            | RegistryError::Serialization(_)
            | RegistryError::Io(_)
            | RegistryError::Internal(_) => {
                error!("Request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalServerError",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;
