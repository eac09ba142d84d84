//! Bikeshare Service - HTTP microservice for nearest-bike queries.
//!
//! Serves nearest rentable bikes and free docks computed from a live GBFS feed.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `BIKESHARE_FEED_URL` | GBFS discovery document URL | Bay Wheels |
//! | `BIKESHARE_BASE_URL` | Base URL serving `<feed>.json` | None |
//! | `BIKESHARE_DATA_DIR` | Directory of saved feed documents | None |
//! | `BIKESHARE_LANGUAGE` | Discovery language key | en |
//! | `BIKESHARE_CACHE_TTL` | Snapshot TTL in seconds | 60 |
//! | `BIKESHARE_TIMEOUT` | HTTP timeout in seconds | 10 |
//! | `BIKESHARE_MAX_RETRIES` | HTTP retries per document | 2 |
//! | `BIKESHARE_HOST` | Bind address | 0.0.0.0 |
//! | `BIKESHARE_PORT` | HTTP server port | 8000 |
//! | `BIKESHARE_PRELOAD` | Fetch a snapshot before serving ("true"/"1") | false |
//! | `RUST_LOG` | Log level (e.g., "info", "debug") | "info" |
//!
//! ## Endpoints
//!
//! - `GET /bikes/nearest?lat=X&lon=Y` - Nearest rentable bikes
//! - `GET /docks/nearest?lat=X&lon=Y` - Nearest free docks
//! - `POST /mcp` - JSON-RPC tool calls
//! - `GET /health` - Health check
//! - `GET /stats` - Snapshot statistics
//! - `GET /docs` - OpenAPI documentation (Swagger UI)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use bikeshare::BikeshareServiceBuilder;
use bikeshare_service::{router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "bikeshare_service=info,bikeshare=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Service-specific config; the library reads the feed settings
    let port: u16 = std::env::var("BIKESHARE_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8000);
    let host: IpAddr = std::env::var("BIKESHARE_HOST")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    let service = BikeshareServiceBuilder::from_env()?.build()?;

    tracing::info!(
        source = %service.source_description(),
        cache_ttl_secs = service.cache_ttl().as_secs(),
        port = port,
        "Starting bikeshare service"
    );

    let state = Arc::new(AppState { service });

    if preload_enabled() {
        let warm = Arc::clone(&state);
        match tokio::task::spawn_blocking(move || warm.service.refresh()).await? {
            Ok(snapshot) => tracing::info!(
                stations = snapshot.stations.len(),
                free_bikes = snapshot.free_bikes.len(),
                "Preload complete"
            ),
            Err(e) => tracing::warn!(error = %e, "Preload failed, will retry on first query"),
        }
    }

    let app = router(state);

    // Start server
    let addr = SocketAddr::new(host, port);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Whether `BIKESHARE_PRELOAD` asks for a warm start.
fn preload_enabled() -> bool {
    std::env::var("BIKESHARE_PRELOAD")
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}
