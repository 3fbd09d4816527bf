//! Error types for the cache
//!
//! Provides unified error handling using thiserror. Only construction-time
//! configuration errors escape the backends; steady-state failures degrade to
//! a miss or a no-op and surface here only at the HTTP boundary.

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backend cannot be constructed from the given settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem operation failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stored payload could not be decoded
    #[error("Corrupt cache node: {0}")]
    Corrupt(String),

    /// Relative-time expression could not be resolved
    #[error("Invalid expiration: {0}")]
    InvalidExpiration(String),

    /// Key not found in cache (never stored, deleted or expired)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Write was refused by the backend
    #[error("Key not stored: {0}")]
    NotStored(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Blocking cache work did not run to completion
    #[error("Cache task failed: {0}")]
    Task(String),
}

impl CacheError {
    /// Wraps an `io::Error` with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::NotStored(_) => StatusCode::CONFLICT,
            CacheError::InvalidRequest(_) | CacheError::InvalidExpiration(_) => {
                StatusCode::BAD_REQUEST
            }
            CacheError::Config(_)
            | CacheError::Io { .. }
            | CacheError::Corrupt(_)
            | CacheError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
