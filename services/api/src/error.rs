//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and how each
//! variant is rendered as an HTTP response.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use storywriter_core::ports::PortError;
use tracing::error;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A required field is missing or malformed in the request.
    #[error("{0}")]
    BadRequest(String),

    /// The history store is not configured or not connected.
    #[error("Story store is not connected")]
    StoreUnavailable,

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    fn status_and_body(&self) -> (StatusCode, ErrorBody) {
        let plain = |status: StatusCode, error: String| {
            (status, ErrorBody { error, details: None })
        };
        match self {
            Self::BadRequest(message) => plain(StatusCode::BAD_REQUEST, message.clone()),
            Self::StoreUnavailable => plain(
                StatusCode::SERVICE_UNAVAILABLE,
                "Story store is not connected".to_string(),
            ),
            Self::Port(port) => match port {
                PortError::NotFound(message) => plain(StatusCode::NOT_FOUND, message.clone()),
                PortError::InvalidInput(message) | PortError::NotConfigured(message) => {
                    plain(StatusCode::BAD_REQUEST, message.clone())
                }
                PortError::Unavailable(message) => {
                    plain(StatusCode::SERVICE_UNAVAILABLE, message.clone())
                }
                PortError::Upstream { status, body } => (
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                    ErrorBody {
                        error: format!("ASI-1 API error: {}", status),
                        details: Some(body.clone()),
                    },
                ),
                PortError::Unexpected(message) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Internal server error".to_string(),
                        details: Some(message.clone()),
                    },
                ),
            },
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "Internal server error".to_string(),
                    details: Some(other.to_string()),
                },
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        if status.is_server_error() {
            error!("Request failed with {}: {}", status, self);
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_status_passes_through() {
        let err = ApiError::Port(PortError::Upstream {
            status: 429,
            body: "slow down".to_string(),
        });
        let (status, body) = err.status_and_body();
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body.error, "ASI-1 API error: 429");
        assert_eq!(body.details.as_deref(), Some("slow down"));
    }

    #[test]
    fn missing_credential_is_a_bad_request() {
        let err = ApiError::Port(PortError::NotConfigured("no key".to_string()));
        assert_eq!(err.status_and_body().0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError::Port(PortError::NotFound("Story not found".to_string()));
        let (status, body) = err.status_and_body();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Story not found");
    }

    #[test]
    fn unavailable_store_maps_to_503() {
        assert_eq!(
            ApiError::StoreUnavailable.status_and_body().0,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
