//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{analytics, counter, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SitePulse API",
        version = "0.3.0",
        description = "Traffic snapshot and visit counter for a personal home page",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Analytics
        analytics::get_snapshot,
        // Counter
        counter::get_counter,
        counter::record_visit,
    ),
    components(
        schemas(
            // Analytics
            analytics::SnapshotQuery,
            analytics::SnapshotResponse,
            analytics::SnapshotStats,
            analytics::SnapshotErrorResponse,
            // Counter
            counter::CounterQuery,
            counter::CounterResponse,
            crate::models::VisitRecord,
            // Health
            health::HealthResponse,
            health::ReadinessResponse,
            // Errors
            crate::error::ErrorResponse,
            crate::error::ErrorCode,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "analytics", description = "Google Analytics traffic snapshot"),
        (name = "counter", description = "Gist-backed visit counter")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
