//! Error types for SitePulse server

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Outbound call an upstream failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    /// Google Analytics Data API (token exchange or report)
    Analytics,
    /// Reading the counter document from the Gist
    StoreRead,
    /// Writing the counter document back to the Gist
    StoreWrite,
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Upstream::Analytics => write!(f, "Google Analytics API"),
            Upstream::StoreRead | Upstream::StoreWrite => write!(f, "GitHub API"),
        }
    }
}

/// Error codes reported by the visit counter endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    TokenMissing,
    ApiError,
    UpdateError,
    InternalError,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Configuration(String),

    #[error("{message}")]
    Upstream {
        upstream: Upstream,
        status: Option<StatusCode>,
        message: String,
    },

    #[error("Malformed upstream data: {0}")]
    MalformedData(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Upstream answered with a non-success status
    pub fn upstream_status(upstream: Upstream, status: StatusCode) -> Self {
        let message = match upstream {
            Upstream::StoreRead => format!("GitHub API error: {}", status.as_u16()),
            Upstream::StoreWrite => format!("Failed to update Gist: {}", status.as_u16()),
            Upstream::Analytics => format!("{} error: {}", upstream, status.as_u16()),
        };
        AppError::Upstream {
            upstream,
            status: Some(status),
            message,
        }
    }

    /// Upstream could not be reached, or the exchange broke off
    pub fn upstream_transport(upstream: Upstream, err: reqwest::Error) -> Self {
        AppError::Upstream {
            upstream,
            status: err.status(),
            message: format!("{} request failed: {}", upstream, err),
        }
    }

    /// Code reported to visit counter clients
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Configuration(_) => ErrorCode::TokenMissing,
            AppError::Upstream { upstream: Upstream::StoreRead, .. } => ErrorCode::ApiError,
            AppError::Upstream { upstream: Upstream::StoreWrite, .. } => ErrorCode::UpdateError,
            _ => ErrorCode::InternalError,
        }
    }

    /// Log the error once, at the handler boundary
    pub fn log(&self) {
        match self {
            AppError::Configuration(msg) => tracing::warn!("Configuration error: {}", msg),
            AppError::Upstream {
                upstream,
                status,
                message,
            } => tracing::error!(%upstream, status = ?status, "{}", message),
            AppError::MalformedData(msg) => tracing::error!("Malformed upstream data: {}", msg),
            AppError::Validation(msg) => tracing::debug!("Validation error: {}", msg),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
        }
    }
}

/// Error response body of the visit counter endpoint
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: ErrorCode,
}

/// Failures are reported in the body; the transport status stays 200 so
/// browser clients always get a parseable envelope.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code(),
        });

        (StatusCode::OK, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
