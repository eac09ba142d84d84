use anyhow::{Context, Result};
use bikeshare::Station;

use super::build_service;
use crate::FeedArgs;

pub fn run(feed: &FeedArgs, limit: Option<usize>) -> Result<()> {
    let service = build_service(feed)?;
    let snapshot = service
        .snapshot()
        .context("Failed to load bikeshare feed")?;

    if snapshot.stations.is_empty() {
        println!("No stations in feed: {}", service.source_description());
        return Ok(());
    }

    let stations = sorted_by_name(&snapshot.stations, limit);

    println!(
        "{:<12} {:<36} {:>7} {:>7} {:>6}  {}",
        "ID", "NAME", "CLASSIC", "EBIKES", "DOCKS", "STATUS"
    );
    println!("{}", "-".repeat(82));

    for station in &stations {
        println!(
            "{:<12} {:<36} {:>7} {:>7} {:>6}  {}",
            station.id,
            station.name,
            station.classic_bikes,
            station.electric_bikes,
            station.docks_available,
            status(station)
        );
    }

    // Summary
    let bikes: u64 = snapshot
        .stations
        .iter()
        .map(|s| u64::from(s.bikes_available()))
        .sum();
    let docks: u64 = snapshot
        .stations
        .iter()
        .map(|s| u64::from(s.docks_available))
        .sum();

    println!();
    println!("Summary:");
    println!(
        "  Stations: {} (showing {})",
        snapshot.stations.len(),
        stations.len()
    );
    println!("  Docked bikes: {}", bikes);
    println!("  Free docks: {}", docks);
    println!("  Free-floating bikes: {}", snapshot.free_bikes.len());
    println!("  Source: {}", service.source_description());

    Ok(())
}

fn sorted_by_name(stations: &[Station], limit: Option<usize>) -> Vec<&Station> {
    let mut sorted: Vec<&Station> = stations.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    if let Some(limit) = limit {
        sorted.truncate(limit);
    }
    sorted
}

fn status(station: &Station) -> &'static str {
    match (station.is_renting, station.is_returning) {
        (true, true) => "open",
        (true, false) => "no returns",
        (false, true) => "returns only",
        (false, false) => "closed",
    }
}
