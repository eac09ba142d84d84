//! Nearest-bike and nearest-dock queries with automatic feed refresh.
//!
//! [`BikeshareService`] validates query arguments, takes a snapshot from its
//! [`FeedFetcher`], and ranks the snapshot's candidates. Validation always
//! happens before the snapshot is requested, so a malformed query never
//! causes upstream traffic.
//!
//! ```ignore
//! use bikeshare::BikeshareServiceBuilder;
//!
//! let service = BikeshareServiceBuilder::new().build()?;
//!
//! // Two closest rentable e-bikes near the Ferry Building
//! let bikes = service.find_nearest_bike(37.7955, -122.3937, 2, Some("electric_bike"))?;
//! for bike in &bikes {
//!     println!("{} at {:.0}m", bike.name, bike.distance);
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::error::{BikeshareError, Result};
use crate::fetch::{FeedFetcher, FeedSource, FeedStats, DEFAULT_TTL_SECS};
use crate::model::{BikeType, Candidate, CandidateKind, Coordinates, FeedSnapshot};
use crate::rank::{rank, Predicate, Ranked};
use crate::source::DirFeedSource;

#[cfg(feature = "http")]
use crate::source::{HttpFeedConfig, HttpFeedSource};

/// Per-type availability of one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AvailableCounts {
    pub classic_bikes: u32,
    pub electric_bikes: u32,
    pub docks: u32,
}

/// One entry of a nearest-bike or nearest-dock answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestResult {
    pub id: String,
    pub name: String,
    pub kind: CandidateKind,
    pub latitude: f64,
    pub longitude: f64,
    /// Great-circle distance from the query point in meters.
    pub distance: f64,
    /// The count that qualified this result: rentable bikes (of the requested
    /// type, if any) or free docks.
    pub available: u32,
    pub available_counts: AvailableCounts,
    /// The bike type actually available here, when it is a single type.
    /// Always absent for dock results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bike_type: Option<BikeType>,
}

impl NearestResult {
    fn from_ranked(ranked: &Ranked<'_>, predicate: &Predicate) -> Self {
        let candidate = &ranked.candidate;
        let coords = candidate.coordinates();
        let counts = AvailableCounts {
            classic_bikes: candidate.bikes_available(Some(BikeType::Classic)),
            electric_bikes: candidate.bikes_available(Some(BikeType::Electric)),
            docks: candidate.docks_available(),
        };
        let single_type = match (counts.classic_bikes, counts.electric_bikes) {
            (0, 0) => None,
            (_, 0) => Some(BikeType::Classic),
            (0, _) => Some(BikeType::Electric),
            _ => None,
        };
        let bike_type = match (predicate, candidate) {
            (Predicate::Docks { .. }, _) => None,
            (Predicate::Bikes { .. }, Candidate::FreeFloating(bike)) => Some(bike.bike_type),
            (Predicate::Bikes { bike_type, .. }, Candidate::Docked(_)) => {
                bike_type.or(single_type)
            }
        };
        Self {
            id: candidate.id().to_string(),
            name: candidate.name().into_owned(),
            kind: candidate.kind(),
            latitude: coords.lat,
            longitude: coords.lon,
            distance: ranked.distance_m,
            available: ranked.available,
            available_counts: counts,
            bike_type,
        }
    }
}

/// Arguments of a nearest-bike query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BikeQuery {
    pub lat: f64,
    pub lon: f64,
    pub count: usize,
    pub bike_type: Option<BikeType>,
    /// Minimum bikes a result must hold. Dockless bikes only qualify at 1.
    pub min_available: u32,
}

impl BikeQuery {
    /// The single nearest bike of any type.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            count: 1,
            bike_type: None,
            min_available: 1,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_bike_type(mut self, bike_type: Option<BikeType>) -> Self {
        self.bike_type = bike_type;
        self
    }

    pub fn with_min_available(mut self, min_available: u32) -> Self {
        self.min_available = min_available;
        self
    }

    /// Check the arguments, returning the query origin and ranking predicate.
    pub fn validate(&self) -> Result<(Coordinates, Predicate)> {
        let origin = Coordinates::parse(self.lat, self.lon)?;
        validate_count(self.count)?;
        validate_min_available(self.min_available)?;
        Ok((
            origin,
            Predicate::Bikes {
                bike_type: self.bike_type,
                min_available: self.min_available,
            },
        ))
    }
}

/// Arguments of a nearest-dock query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DockQuery {
    pub lat: f64,
    pub lon: f64,
    pub count: usize,
    /// Minimum free docks a station must have.
    pub min_available: u32,
}

impl DockQuery {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            count: 1,
            min_available: 1,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_min_available(mut self, min_available: u32) -> Self {
        self.min_available = min_available;
        self
    }

    /// Check the arguments, returning the query origin and ranking predicate.
    pub fn validate(&self) -> Result<(Coordinates, Predicate)> {
        let origin = Coordinates::parse(self.lat, self.lon)?;
        validate_count(self.count)?;
        validate_min_available(self.min_available)?;
        Ok((
            origin,
            Predicate::Docks {
                min_available: self.min_available,
            },
        ))
    }
}

fn validate_count(count: usize) -> Result<()> {
    if count == 0 {
        return Err(BikeshareError::invalid("count", "must be at least 1"));
    }
    Ok(())
}

fn validate_min_available(min_available: u32) -> Result<()> {
    if min_available == 0 {
        return Err(BikeshareError::invalid("min_available", "must be at least 1"));
    }
    Ok(())
}

/// Parse an optional bike type argument.
pub fn parse_bike_type(bike_type: Option<&str>) -> Result<Option<BikeType>> {
    bike_type.map(str::parse).transpose()
}

/// Rank `snapshot` for an already validated query.
///
/// Useful when many queries should see the same snapshot, e.g. batch jobs.
pub fn nearest_in(
    snapshot: &FeedSnapshot,
    origin: Coordinates,
    predicate: &Predicate,
    count: usize,
) -> Vec<NearestResult> {
    rank(origin, snapshot.candidates(), predicate, count)
        .iter()
        .map(|ranked| NearestResult::from_ranked(ranked, predicate))
        .collect()
}

/// High-level query interface over a live bikeshare feed.
///
/// The service is `Send + Sync`; share it behind an `Arc` across threads.
pub struct BikeshareService {
    fetcher: FeedFetcher,
}

impl BikeshareService {
    /// Create a service over any feed source.
    pub fn new(source: impl FeedSource + 'static, ttl: Duration) -> Self {
        Self {
            fetcher: FeedFetcher::new(source, ttl),
        }
    }

    pub fn builder() -> BikeshareServiceBuilder {
        BikeshareServiceBuilder::new()
    }

    /// Find up to `count` candidates with rentable bikes, nearest first.
    ///
    /// `bike_type` accepts `classic_bike` or `electric_bike` (and the aliases
    /// `classic`, `electric`, `ebike`); `None` matches any type.
    ///
    /// # Errors
    ///
    /// - [`BikeshareError::InvalidArgument`] for bad coordinates, a zero
    ///   count or an unknown bike type. No upstream request is made.
    /// - [`BikeshareError::FeedUnavailable`] if no snapshot can be obtained.
    pub fn find_nearest_bike(
        &self,
        lat: f64,
        lon: f64,
        count: usize,
        bike_type: Option<&str>,
    ) -> Result<Vec<NearestResult>> {
        let bike_type = parse_bike_type(bike_type)?;
        self.nearest_bikes(
            &BikeQuery::new(lat, lon)
                .with_count(count)
                .with_bike_type(bike_type),
        )
    }

    /// Find up to `count` stations with free docks, nearest first.
    ///
    /// Dockless bikes never appear in the result.
    pub fn find_nearest_dock_spaces(
        &self,
        lat: f64,
        lon: f64,
        count: usize,
    ) -> Result<Vec<NearestResult>> {
        self.nearest_docks(&DockQuery::new(lat, lon).with_count(count))
    }

    pub fn nearest_bikes(&self, query: &BikeQuery) -> Result<Vec<NearestResult>> {
        let (origin, predicate) = query.validate()?;
        let snapshot = self.fetcher.get_snapshot()?;
        Ok(nearest_in(&snapshot, origin, &predicate, query.count))
    }

    pub fn nearest_docks(&self, query: &DockQuery) -> Result<Vec<NearestResult>> {
        let (origin, predicate) = query.validate()?;
        let snapshot = self.fetcher.get_snapshot()?;
        Ok(nearest_in(&snapshot, origin, &predicate, query.count))
    }

    /// Get the current snapshot, refreshing it if expired.
    pub fn snapshot(&self) -> Result<Arc<FeedSnapshot>> {
        self.fetcher.get_snapshot()
    }

    /// Refresh the snapshot now. Used to warm up at startup.
    pub fn refresh(&self) -> Result<Arc<FeedSnapshot>> {
        self.fetcher.refresh()
    }

    pub fn stats(&self) -> FeedStats {
        self.fetcher.stats()
    }

    pub fn cache_ttl(&self) -> Duration {
        self.fetcher.ttl()
    }

    pub fn source_description(&self) -> String {
        self.fetcher.source_description()
    }
}

/// Where a built service reads its feeds from.
enum SourceConfig {
    #[cfg(feature = "http")]
    Http(HttpFeedConfig),
    Dir(PathBuf),
    Custom(Box<dyn FeedSource>),
}

/// Builder for [`BikeshareService`].
///
/// # Example
///
/// ```ignore
/// use bikeshare::BikeshareServiceBuilder;
///
/// // Replay feeds saved to disk, refreshing every 5 minutes
/// let service = BikeshareServiceBuilder::new()
///     .data_dir("/data/gbfs")
///     .cache_ttl(300)
///     .build()?;
/// ```
pub struct BikeshareServiceBuilder {
    source: Option<SourceConfig>,
    cache_ttl_secs: u64,
    #[cfg(feature = "http")]
    timeout_secs: Option<u64>,
    #[cfg(feature = "http")]
    max_retries: Option<u32>,
}

impl Default for BikeshareServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BikeshareServiceBuilder {
    /// Create a builder with the default source (Bay Wheels, with the `http`
    /// feature) and a 60 second snapshot TTL.
    pub fn new() -> Self {
        Self {
            source: None,
            cache_ttl_secs: DEFAULT_TTL_SECS,
            #[cfg(feature = "http")]
            timeout_secs: None,
            #[cfg(feature = "http")]
            max_retries: None,
        }
    }

    /// Create a builder configured from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `BIKESHARE_DATA_DIR` | Directory of saved feed documents | None |
    /// | `BIKESHARE_BASE_URL` | Base URL serving `<feed>.json`* | None |
    /// | `BIKESHARE_FEED_URL` | GBFS discovery document URL* | Bay Wheels |
    /// | `BIKESHARE_LANGUAGE` | Discovery language key* | en |
    /// | `BIKESHARE_CACHE_TTL` | Snapshot TTL in seconds | 60 |
    /// | `BIKESHARE_TIMEOUT` | HTTP timeout in seconds* | 10 |
    /// | `BIKESHARE_MAX_RETRIES` | HTTP retries per document* | 2 |
    ///
    /// *Only used when the `http` feature is enabled.
    ///
    /// The first of `BIKESHARE_DATA_DIR`, `BIKESHARE_BASE_URL` and
    /// `BIKESHARE_FEED_URL` that is set selects the source.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::new();

        if let Some(ttl) = env_number::<u64>("BIKESHARE_CACHE_TTL")? {
            builder = builder.cache_ttl(ttl);
        }

        if let Some(dir) = env_string("BIKESHARE_DATA_DIR") {
            return Ok(builder.data_dir(dir));
        }

        #[cfg(feature = "http")]
        {
            let base_url = env_string("BIKESHARE_BASE_URL");
            let feed_url = env_string("BIKESHARE_FEED_URL");
            let config = match (base_url, feed_url) {
                (Some(base), _) => Some(HttpFeedConfig::with_base_url(base)),
                (None, Some(url)) => Some(HttpFeedConfig::with_discovery_url(url)),
                (None, None) => None,
            };
            let config = match env_string("BIKESHARE_LANGUAGE") {
                Some(language) => Some(
                    config
                        .unwrap_or_else(HttpFeedConfig::bay_wheels)
                        .with_language(language),
                ),
                None => config,
            };
            if let Some(config) = config {
                builder = builder.http(config);
            }
            builder.timeout_secs = env_number("BIKESHARE_TIMEOUT")?;
            builder.max_retries = env_number("BIKESHARE_MAX_RETRIES")?;
        }

        Ok(builder)
    }

    /// Set the snapshot time-to-live in seconds. Zero refetches on every query.
    pub fn cache_ttl(mut self, secs: u64) -> Self {
        self.cache_ttl_secs = secs;
        self
    }

    /// Read feeds from `<path>/<feed>.json`.
    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.source = Some(SourceConfig::Dir(path.as_ref().to_path_buf()));
        self
    }

    /// Use any [`FeedSource`].
    pub fn source(mut self, source: impl FeedSource + 'static) -> Self {
        self.source = Some(SourceConfig::Custom(Box::new(source)));
        self
    }

    /// Fetch feeds over HTTP with the given configuration.
    #[cfg(feature = "http")]
    pub fn http(mut self, config: HttpFeedConfig) -> Self {
        self.source = Some(SourceConfig::Http(config));
        self
    }

    /// Locate feeds through a GBFS discovery document.
    #[cfg(feature = "http")]
    pub fn feed_url(self, url: impl Into<String>) -> Self {
        self.http(HttpFeedConfig::with_discovery_url(url))
    }

    /// Fetch feeds from `<base>/<feed>.json`.
    #[cfg(feature = "http")]
    pub fn base_url(self, base_url: impl Into<String>) -> Self {
        self.http(HttpFeedConfig::with_base_url(base_url))
    }

    /// Override the HTTP request timeout.
    #[cfg(feature = "http")]
    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Override the number of HTTP retries per document.
    #[cfg(feature = "http")]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Build the [`BikeshareService`]. No request is made until the first query.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created, or if no source
    /// was configured and the `http` feature is disabled.
    pub fn build(mut self) -> Result<BikeshareService> {
        let ttl = Duration::from_secs(self.cache_ttl_secs);
        let source: Box<dyn FeedSource> = match self.source.take() {
            Some(SourceConfig::Dir(dir)) => Box::new(DirFeedSource::new(dir)),
            Some(SourceConfig::Custom(source)) => source,
            #[cfg(feature = "http")]
            Some(SourceConfig::Http(config)) => Box::new(self.http_source(config)?),
            #[cfg(feature = "http")]
            None => Box::new(self.http_source(HttpFeedConfig::bay_wheels())?),
            #[cfg(not(feature = "http"))]
            None => {
                return Err(BikeshareError::invalid(
                    "source",
                    "no feed source configured and the `http` feature is disabled",
                ))
            }
        };

        tracing::debug!(
            source = %source.describe(),
            ttl_secs = ttl.as_secs(),
            "Building bikeshare service"
        );
        Ok(BikeshareService {
            fetcher: FeedFetcher::from_boxed(source, ttl),
        })
    }

    #[cfg(feature = "http")]
    fn http_source(&self, mut config: HttpFeedConfig) -> Result<HttpFeedSource> {
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(secs);
        }
        if let Some(retries) = self.max_retries {
            config = config.with_max_retries(retries);
        }
        HttpFeedSource::new(config)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_number<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>> {
    env_string(name)
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| BikeshareError::invalid(name, format!("`{v}` is not a number")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticFeedSource;

    const INFO: &str = r#"{"last_updated": 1700000000, "data": {"stations": [
        {"station_id": "A", "name": "Ferry Building", "lat": 37.7955, "lon": -122.3937, "capacity": 5},
        {"station_id": "B", "name": "Market St", "lat": 37.7929, "lon": -122.4269, "capacity": 5}
    ]}}"#;
    const STATUS: &str = r#"{"last_updated": 1700000000, "data": {"stations": [
        {"station_id": "A", "num_bikes_available": 3, "num_ebikes_available": 0, "num_docks_available": 2},
        {"station_id": "B", "num_bikes_available": 0, "num_ebikes_available": 0, "num_docks_available": 5}
    ]}}"#;
    const FREE: &str = r#"{"last_updated": 1700000000, "data": {"bikes": [
        {"bike_id": "e1", "lat": 37.7940, "lon": -122.4000, "vehicle_type_id": "2"}
    ]}}"#;

    fn service() -> (BikeshareService, Arc<StaticFeedSource>) {
        let source = Arc::new(StaticFeedSource::new(INFO, STATUS, FREE));
        let service = BikeshareServiceBuilder::new()
            .source(source.clone())
            .build()
            .unwrap();
        (service, source)
    }

    #[test]
    fn test_find_nearest_bike() {
        let (service, _) = service();
        let result = service
            .find_nearest_bike(37.7955, -122.3937, 2, None)
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "A");
        assert_eq!(result[0].name, "Ferry Building");
        assert_eq!(result[0].kind, CandidateKind::Station);
        assert_eq!(result[0].distance, 0.0);
        assert_eq!(result[0].available, 3);
        assert_eq!(result[0].bike_type, Some(BikeType::Classic));
        assert_eq!(
            result[0].available_counts,
            AvailableCounts {
                classic_bikes: 3,
                electric_bikes: 0,
                docks: 2,
            }
        );

        assert_eq!(result[1].id, "e1");
        assert_eq!(result[1].name, "Free Bike (e1)");
        assert_eq!(result[1].kind, CandidateKind::FreeBike);
        assert_eq!(result[1].bike_type, Some(BikeType::Electric));
        assert!(result[1].distance > 0.0);
    }

    #[test]
    fn test_find_nearest_bike_by_type() {
        let (service, _) = service();
        let result = service
            .find_nearest_bike(37.7955, -122.3937, 5, Some("electric_bike"))
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "e1");

        let result = service
            .find_nearest_bike(37.7955, -122.3937, 5, Some("classic"))
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "A");
    }

    #[test]
    fn test_find_nearest_dock_spaces() {
        let (service, _) = service();
        let result = service
            .find_nearest_dock_spaces(37.7955, -122.3937, 2)
            .unwrap();

        let ids: Vec<_> = result.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(result[0].available, 2);
        assert_eq!(result[1].available, 5);
        assert!(result.iter().all(|r| r.kind == CandidateKind::Station));
    }

    #[test]
    fn test_min_available() {
        let (service, _) = service();
        let result = service
            .nearest_docks(&DockQuery::new(37.7955, -122.3937).with_count(5).with_min_available(3))
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "B");

        let result = service
            .nearest_bikes(&BikeQuery::new(37.7955, -122.3937).with_count(5).with_min_available(2))
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "A");
    }

    #[test]
    fn test_repeated_queries_agree() {
        let (service, source) = service();
        let first = service.find_nearest_bike(37.7955, -122.3937, 3, None).unwrap();
        let second = service.find_nearest_bike(37.7955, -122.3937, 3, None).unwrap();

        assert_eq!(first, second);
        assert_eq!(source.fetch_count(), 3);
    }

    #[test]
    fn test_invalid_arguments_make_no_request() {
        let (service, source) = service();

        let err = service
            .find_nearest_bike(37.7955, -122.3937, 1, Some("tandem"))
            .unwrap_err();
        assert!(matches!(err, BikeshareError::InvalidArgument { field: "bike_type", .. }));

        let err = service.find_nearest_dock_spaces(37.7955, -122.3937, 0).unwrap_err();
        assert!(matches!(err, BikeshareError::InvalidArgument { field: "count", .. }));

        let err = service.find_nearest_bike(91.0, 0.0, 1, None).unwrap_err();
        assert!(err.is_invalid_argument());

        let err = service.find_nearest_bike(f64::NAN, 0.0, 1, None).unwrap_err();
        assert!(err.is_invalid_argument());

        let err = service
            .nearest_docks(&DockQuery::new(0.0, 0.0).with_min_available(0))
            .unwrap_err();
        assert!(matches!(err, BikeshareError::InvalidArgument { field: "min_available", .. }));

        assert_eq!(source.fetch_count(), 0);
        assert_eq!(service.stats().refreshes, 0);
    }

    #[test]
    fn test_feed_unavailable() {
        let source = StaticFeedSource::default();
        let service = BikeshareService::new(source, Duration::from_secs(60));

        let err = service.find_nearest_bike(0.0, 0.0, 1, None).unwrap_err();
        assert!(matches!(err, BikeshareError::FeedUnavailable { .. }));
    }

    #[test]
    fn test_count_larger_than_candidates() {
        let (service, _) = service();
        let result = service
            .find_nearest_dock_spaces(37.7955, -122.3937, 100)
            .unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_result_serialization() {
        let (service, _) = service();
        let result = service.find_nearest_dock_spaces(37.7955, -122.3937, 1).unwrap();
        let json = serde_json::to_value(&result[0]).unwrap();

        assert_eq!(json["id"], "A");
        assert_eq!(json["kind"], "station");
        assert_eq!(json["available_counts"]["docks"], 2);
        assert_eq!(json["available_counts"]["classic_bikes"], 3);
        // Dock results never name a bike type
        assert!(json.get("bike_type").is_none());
        assert_eq!(result[0].bike_type, None);

        let bikes = service.find_nearest_bike(37.7955, -122.3937, 1, None).unwrap();
        assert_eq!(bikes[0].bike_type, Some(BikeType::Classic));
    }

    #[test]
    fn test_builder_data_dir() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        for (name, body) in [
            ("station_information", INFO),
            ("station_status", STATUS),
            ("free_bike_status", FREE),
        ] {
            std::fs::write(temp_dir.path().join(format!("{name}.json")), body).unwrap();
        }

        let service = BikeshareServiceBuilder::new()
            .data_dir(temp_dir.path())
            .cache_ttl(5)
            .build()
            .unwrap();

        assert_eq!(service.cache_ttl(), Duration::from_secs(5));
        assert!(service.source_description().starts_with("dir:"));
        let snapshot = service.snapshot().unwrap();
        assert_eq!(snapshot.stations.len(), 2);
        assert_eq!(snapshot.free_bikes.len(), 1);
    }

    #[test]
    fn test_parse_bike_type() {
        assert_eq!(parse_bike_type(None).unwrap(), None);
        assert_eq!(parse_bike_type(Some("ebike")).unwrap(), Some(BikeType::Electric));
        assert!(parse_bike_type(Some("tandem")).is_err());
    }
}
