//! API handlers for SitePulse endpoints

pub mod analytics;
pub mod counter;
pub mod health;
pub mod openapi;

use axum::{
    extract::{rejection::QueryRejection, Query},
    http::{
        header::{ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS},
        HeaderValue,
    },
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::{
    error::{AppError, AppResult},
    AppState,
};

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type";

/// Raw query pairs, with extraction failures reported in the JSON envelope
pub(crate) fn query_pairs(
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> AppResult<Vec<(String, String)>> {
    query
        .map(|Query(pairs)| pairs)
        .map_err(|e| AppError::Validation(e.body_text()))
}

/// Last value given for `key`
pub(crate) fn last_value(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CorsLayer answers every OPTIONS request itself with an empty 200; the
    // allowed methods and headers are pinned by the outer layers.
    let cors = CorsLayer::new().allow_origin(Any);

    let api = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Analytics
        .route("/ga-stats", get(analytics::get_snapshot))
        // Visit counter
        .route(
            "/gist-proxy",
            get(counter::get_counter).post(counter::record_visit),
        )
        .with_state(state.clone());

    let mut app = Router::new()
        .nest("/api", api)
        .merge(openapi::create_openapi_router());

    if let Some(dir) = state.config.server.static_dir.as_deref() {
        tracing::info!("Serving static files from {}", dir);
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ))
}
