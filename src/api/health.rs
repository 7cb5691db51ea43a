//! Health check endpoints

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Current status of the service
    pub status: String,
    /// Version of the service
    pub version: String,
}

#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    /// `ready`, or `degraded` when an endpoint is missing configuration
    pub status: String,
    pub version: String,
    /// Settings that are not configured
    pub missing: Vec<String>,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check endpoint (checks that upstream credentials are configured)
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Configuration status", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<AppState>) -> Json<ReadinessResponse> {
    let config = &state.config;
    let mut missing = Vec::new();

    if config.gist.token.is_none() {
        missing.push("GIST_TOKEN".to_string());
    }
    if config.analytics.credentials_json.is_none() && config.analytics.credentials_file.is_none() {
        missing.push("GA_CREDENTIALS".to_string());
    }
    if config.analytics.property_id.is_none() {
        missing.push("GA_PROPERTY_ID".to_string());
    }

    let status = if missing.is_empty() { "ready" } else { "degraded" };

    Json(ReadinessResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        missing,
    })
}
