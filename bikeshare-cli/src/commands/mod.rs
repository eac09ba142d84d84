pub mod batch;
pub mod info;
pub mod list;
pub mod query;

use anyhow::{Context, Result};
use bikeshare::source::HttpFeedConfig;
use bikeshare::{BikeshareService, BikeshareServiceBuilder, CandidateKind, NearestResult};

use crate::FeedArgs;

/// How query results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    GeoJson,
}

impl OutputFormat {
    pub fn from_flags(json: bool, geojson: bool) -> Self {
        match (json, geojson) {
            (_, true) => OutputFormat::GeoJson,
            (true, false) => OutputFormat::Json,
            (false, false) => OutputFormat::Table,
        }
    }
}

/// Build the query service from the global flags.
///
/// A data directory wins over a base URL, which wins over a discovery URL.
pub fn build_service(feed: &FeedArgs) -> Result<BikeshareService> {
    let mut builder = BikeshareServiceBuilder::new().cache_ttl(feed.ttl);

    builder = match (&feed.data_dir, &feed.base_url, &feed.feed_url) {
        (Some(dir), _, _) => builder.data_dir(dir),
        (None, Some(base), _) => builder.http(HttpFeedConfig::with_base_url(base)),
        (None, None, Some(url)) => builder.http(HttpFeedConfig::with_discovery_url(url)),
        (None, None, None) => builder.http(HttpFeedConfig::bay_wheels()),
    };

    builder
        .timeout(feed.timeout)
        .build()
        .context("Failed to create bikeshare service")
}

/// Print results in the requested format.
pub fn print_results(results: &[NearestResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(results)?),
        OutputFormat::GeoJson => {
            let collection = bikeshare::geojson::to_feature_collection(results);
            let geojson = geojson::GeoJson::from(collection);
            println!("{}", serde_json::to_string_pretty(&geojson)?);
        }
        OutputFormat::Table => print_table(results),
    }
    Ok(())
}

fn print_table(results: &[NearestResult]) {
    if results.is_empty() {
        println!("No matches found.");
        return;
    }

    println!(
        "{:<3} {:<9} {:<36} {:>10} {:>6}  {}",
        "#", "KIND", "NAME", "DISTANCE", "AVAIL", "TYPE"
    );
    println!("{}", "-".repeat(80));

    for (i, result) in results.iter().enumerate() {
        let kind = match result.kind {
            CandidateKind::Station => "station",
            CandidateKind::FreeBike => "free bike",
        };
        println!(
            "{:<3} {:<9} {:<36} {:>10} {:>6}  {}",
            i + 1,
            kind,
            truncate(&result.name, 36),
            format_distance(result.distance),
            result.available,
            result.bike_type.map(|t| t.as_str()).unwrap_or("-"),
        );
    }
}

fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.2} km", meters / 1000.0)
    } else {
        format!("{:.0} m", meters)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max - 1).collect();
        format!("{cut}…")
    }
}
