use anyhow::{Context, Result};
use bikeshare::service::parse_bike_type;
use bikeshare::{BikeQuery, DockQuery};

use super::{build_service, print_results, OutputFormat};
use crate::FeedArgs;

pub fn run_bike(
    feed: &FeedArgs,
    lat: f64,
    lon: f64,
    count: usize,
    bike_type: Option<&str>,
    min_available: u32,
    format: OutputFormat,
) -> Result<()> {
    // Validate before building anything so typos never hit the network
    let query = BikeQuery::new(lat, lon)
        .with_count(count)
        .with_bike_type(parse_bike_type(bike_type)?)
        .with_min_available(min_available);
    query.validate()?;

    let service = build_service(feed)?;
    let results = service
        .nearest_bikes(&query)
        .context("Failed to find nearest bikes")?;

    print_results(&results, format)
}

pub fn run_dock(
    feed: &FeedArgs,
    lat: f64,
    lon: f64,
    count: usize,
    min_available: u32,
    format: OutputFormat,
) -> Result<()> {
    let query = DockQuery::new(lat, lon)
        .with_count(count)
        .with_min_available(min_available);
    query.validate()?;

    let service = build_service(feed)?;
    let results = service
        .nearest_docks(&query)
        .context("Failed to find nearest docks")?;

    print_results(&results, format)
}
