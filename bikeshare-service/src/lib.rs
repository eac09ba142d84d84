//! Bikeshare Service Library
//!
//! HTTP handlers and router for the nearest-bike service.
//! This library is used by both the bikeshare-service binary and integration tests.

pub mod handlers;
pub mod mcp;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use bikeshare::BikeshareService;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across handlers.
pub struct AppState {
    /// Query engine over the live feed.
    pub service: BikeshareService,
}

/// OpenAPI documentation for the bikeshare service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bikeshare Service",
        version = "0.1.0",
        description = "Nearest rentable bikes and free docks from live GBFS bikeshare feeds.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    paths(
        handlers::nearest_bikes,
        handlers::nearest_docks,
        handlers::health_check,
        handlers::get_stats,
    ),
    components(
        schemas(
            handlers::NearestResponse,
            handlers::NearestItem,
            handlers::AvailableCountsBody,
            handlers::ErrorResponse,
            handlers::HealthResponse,
            handlers::StatsResponse,
        )
    ),
    tags(
        (name = "query", description = "Nearest bike and dock queries"),
        (name = "system", description = "System and health endpoints")
    )
)]
pub struct ApiDoc;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/bikes/nearest", get(handlers::nearest_bikes))
        .route("/docks/nearest", get(handlers::nearest_docks))
        .route("/mcp", post(mcp::handle))
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}

// Re-export commonly used types for convenience
pub use handlers::{
    ErrorResponse, HealthResponse, NearestItem, NearestResponse, StatsResponse,
};
