use anyhow::{Context, Result};
use bikeshare::FeedSnapshot;
use serde::Serialize;

use super::build_service;
use crate::FeedArgs;

/// Totals over one feed snapshot.
#[derive(Debug, PartialEq, Eq, Serialize)]
struct FeedSummary {
    source: String,
    stations: usize,
    renting_stations: usize,
    free_bikes: usize,
    available_free_bikes: usize,
    classic_bikes: u64,
    electric_bikes: u64,
    docks_available: u64,
    last_updated: Option<u64>,
}

impl FeedSummary {
    fn from_snapshot(source: String, snapshot: &FeedSnapshot) -> Self {
        let mut summary = FeedSummary {
            source,
            stations: snapshot.stations.len(),
            renting_stations: 0,
            free_bikes: snapshot.free_bikes.len(),
            available_free_bikes: 0,
            classic_bikes: 0,
            electric_bikes: 0,
            docks_available: 0,
            last_updated: snapshot.last_updated,
        };

        for station in &snapshot.stations {
            if station.is_renting {
                summary.renting_stations += 1;
                summary.classic_bikes += u64::from(station.classic_bikes);
                summary.electric_bikes += u64::from(station.electric_bikes);
            }
            if station.is_returning {
                summary.docks_available += u64::from(station.docks_available);
            }
        }

        for bike in snapshot.free_bikes.iter().filter(|b| b.is_available) {
            summary.available_free_bikes += 1;
            match bike.bike_type {
                bikeshare::BikeType::Classic => summary.classic_bikes += 1,
                bikeshare::BikeType::Electric => summary.electric_bikes += 1,
            }
        }

        summary
    }
}

pub fn run(feed: &FeedArgs, json: bool) -> Result<()> {
    let service = build_service(feed)?;
    let snapshot = service
        .snapshot()
        .context("Failed to load bikeshare feed")?;

    let summary = FeedSummary::from_snapshot(service.source_description(), &snapshot);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Source: {}", summary.source);
    match summary.last_updated {
        Some(ts) => println!("Last updated: {} (epoch seconds)", ts),
        None => println!("Last updated: unknown"),
    }
    println!();
    println!(
        "Stations: {} ({} renting)",
        summary.stations, summary.renting_stations
    );
    println!(
        "Free bikes: {} ({} available)",
        summary.free_bikes, summary.available_free_bikes
    );
    println!();
    println!("Classic bikes: {}", summary.classic_bikes);
    println!("E-bikes: {}", summary.electric_bikes);
    println!("Free docks: {}", summary.docks_available);

    Ok(())
}
