//! HTTP request handlers for the query service.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bikeshare::{BikeQuery, BikeshareError, DockQuery, NearestResult};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::AppState;

fn default_count() -> usize {
    1
}

fn default_min_available() -> u32 {
    1
}

/// Query parameters for the nearest-bike endpoint.
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct NearestBikeParams {
    /// Latitude in decimal degrees (-90 to 90).
    pub lat: f64,
    /// Longitude in decimal degrees (-180 to 180).
    pub lon: f64,
    /// Maximum number of results (default 1).
    #[serde(default = "default_count")]
    pub count: usize,
    /// `classic_bike` or `electric_bike`. Any type when omitted.
    pub bike_type: Option<String>,
    /// Minimum bikes a station must hold (default 1). Dockless bikes only
    /// qualify at 1.
    #[serde(default = "default_min_available")]
    pub min_available: u32,
    /// `geojson` for a FeatureCollection instead of JSON.
    pub format: Option<String>,
}

/// Query parameters for the nearest-dock endpoint.
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct NearestDockParams {
    /// Latitude in decimal degrees (-90 to 90).
    pub lat: f64,
    /// Longitude in decimal degrees (-180 to 180).
    pub lon: f64,
    /// Maximum number of results (default 1).
    #[serde(default = "default_count")]
    pub count: usize,
    /// Minimum free docks a station must have (default 1).
    #[serde(default = "default_min_available")]
    pub min_available: u32,
    /// `geojson` for a FeatureCollection instead of JSON.
    pub format: Option<String>,
}

/// Availability at one result.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AvailableCountsBody {
    pub classic_bikes: u32,
    pub electric_bikes: u32,
    pub docks: u32,
}

/// One ranked result.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NearestItem {
    /// Station or bike identifier.
    pub id: String,
    pub name: String,
    /// `station` or `free_bike`.
    pub kind: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Distance from the query point in meters.
    pub distance: f64,
    /// Bikes (or docks) that qualified this result.
    pub available: u32,
    pub available_counts: AvailableCountsBody,
    /// `classic_bike` or `electric_bike`, when a single type is available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bike_type: Option<String>,
}

impl From<NearestResult> for NearestItem {
    fn from(result: NearestResult) -> Self {
        Self {
            kind: match result.kind {
                bikeshare::CandidateKind::Station => "station".to_string(),
                bikeshare::CandidateKind::FreeBike => "free_bike".to_string(),
            },
            bike_type: result.bike_type.map(|t| t.as_str().to_string()),
            available_counts: AvailableCountsBody {
                classic_bikes: result.available_counts.classic_bikes,
                electric_bikes: result.available_counts.electric_bikes,
                docks: result.available_counts.docks,
            },
            id: result.id,
            name: result.name,
            latitude: result.latitude,
            longitude: result.longitude,
            distance: result.distance,
            available: result.available,
        }
    }
}

/// Successful nearest-bike or nearest-dock response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NearestResponse {
    /// Latitude queried.
    pub lat: f64,
    /// Longitude queried.
    pub lon: f64,
    /// Nearest first. May hold fewer entries than requested.
    pub results: Vec<NearestItem>,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
}

/// Feed snapshot statistics.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    /// Queries answered without fetching.
    pub cache_hits: u64,
    /// Successful snapshot refreshes.
    pub refreshes: u64,
    /// Failed refresh attempts.
    pub failed_refreshes: u64,
    /// Queries answered from a stale snapshot after a failed refresh.
    pub degraded_serves: u64,
    /// Cache hit rate (0.0 to 1.0).
    pub hit_rate: f64,
    /// Age of the current snapshot in seconds, if one exists.
    pub snapshot_age_secs: Option<f64>,
    pub stations: usize,
    pub free_bikes: usize,
    /// Upstream `last_updated` (epoch seconds) of the current snapshot.
    pub last_updated: Option<u64>,
    /// Snapshot time-to-live in seconds.
    pub cache_ttl_secs: u64,
    /// Where feeds are fetched from.
    pub source: String,
}

/// An engine error mapped onto an HTTP status.
#[derive(Debug)]
pub enum ApiError {
    Engine(BikeshareError),
    /// The blocking task panicked or was cancelled.
    Internal(String),
}

impl From<BikeshareError> for ApiError {
    fn from(e: BikeshareError) -> Self {
        ApiError::Engine(e)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Engine(e @ BikeshareError::InvalidArgument { .. }) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Engine(e @ BikeshareError::FeedUnavailable { .. }) => {
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }
            ApiError::Engine(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message.clone()),
        };

        tracing::warn!(status = status.as_u16(), error = %message, "Query failed");

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Run a blocking engine call off the async runtime.
pub(crate) async fn run_blocking<T, F>(state: &Arc<AppState>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> bikeshare::Result<T> + Send + 'static,
{
    let state = Arc::clone(state);
    Ok(tokio::task::spawn_blocking(move || f(&state)).await??)
}

fn wants_geojson(format: Option<&str>) -> bool {
    format.is_some_and(|f| f.eq_ignore_ascii_case("geojson"))
}

fn respond(lat: f64, lon: f64, results: Vec<NearestResult>, geojson: bool) -> Response {
    if geojson {
        let collection = bikeshare::geojson::to_feature_collection(&results);
        return Json(geojson::GeoJson::from(collection)).into_response();
    }
    Json(NearestResponse {
        lat,
        lon,
        results: results.into_iter().map(NearestItem::from).collect(),
    })
    .into_response()
}

/// Find the nearest rentable bikes.
///
/// Stations and free-floating bikes are ranked together by great-circle
/// distance.
#[utoipa::path(
    get,
    path = "/bikes/nearest",
    tag = "query",
    params(NearestBikeParams),
    responses(
        (status = 200, description = "Nearest bikes, closest first", body = NearestResponse),
        (status = 400, description = "Invalid coordinates, count or bike type", body = ErrorResponse),
        (status = 503, description = "Feed unavailable", body = ErrorResponse)
    )
)]
pub async fn nearest_bikes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearestBikeParams>,
) -> Result<Response, ApiError> {
    tracing::debug!(
        lat = params.lat,
        lon = params.lon,
        count = params.count,
        bike_type = ?params.bike_type,
        "Nearest bike query"
    );

    let bike_type = bikeshare::service::parse_bike_type(params.bike_type.as_deref())?;
    let query = BikeQuery::new(params.lat, params.lon)
        .with_count(params.count)
        .with_bike_type(bike_type)
        .with_min_available(params.min_available);

    let results = run_blocking(&state, move |s| s.service.nearest_bikes(&query)).await?;

    tracing::info!(
        lat = params.lat,
        lon = params.lon,
        results = results.len(),
        "Nearest bikes found"
    );
    Ok(respond(
        params.lat,
        params.lon,
        results,
        wants_geojson(params.format.as_deref()),
    ))
}

/// Find the nearest stations with free docks.
#[utoipa::path(
    get,
    path = "/docks/nearest",
    tag = "query",
    params(NearestDockParams),
    responses(
        (status = 200, description = "Nearest docks, closest first", body = NearestResponse),
        (status = 400, description = "Invalid coordinates or count", body = ErrorResponse),
        (status = 503, description = "Feed unavailable", body = ErrorResponse)
    )
)]
pub async fn nearest_docks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearestDockParams>,
) -> Result<Response, ApiError> {
    tracing::debug!(
        lat = params.lat,
        lon = params.lon,
        count = params.count,
        "Nearest dock query"
    );

    let query = DockQuery::new(params.lat, params.lon)
        .with_count(params.count)
        .with_min_available(params.min_available);

    let results = run_blocking(&state, move |s| s.service.nearest_docks(&query)).await?;

    tracing::info!(
        lat = params.lat,
        lon = params.lon,
        results = results.len(),
        "Nearest docks found"
    );
    Ok(respond(
        params.lat,
        params.lon,
        results,
        wants_geojson(params.format.as_deref()),
    ))
}

/// Health check endpoint.
///
/// Returns service status and version without touching the feed.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "bikeshare".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Get feed snapshot statistics.
#[utoipa::path(
    get,
    path = "/stats",
    tag = "system",
    responses((status = 200, description = "Snapshot statistics", body = StatsResponse))
)]
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let stats = state.service.stats();

    Json(StatsResponse {
        cache_hits: stats.cache_hits,
        refreshes: stats.refreshes,
        failed_refreshes: stats.failed_refreshes,
        degraded_serves: stats.degraded_serves,
        hit_rate: stats.hit_rate(),
        snapshot_age_secs: stats.snapshot_age.map(|age| age.as_secs_f64()),
        stations: stats.stations,
        free_bikes: stats.free_bikes,
        last_updated: stats.last_updated,
        cache_ttl_secs: state.service.cache_ttl().as_secs(),
        source: state.service.source_description(),
    })
}
