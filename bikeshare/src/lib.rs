//! # Bikeshare - nearest bikes and docks from live GBFS feeds
//!
//! Answers two questions about a bikeshare system: where is the nearest bike
//! I can rent, and where is the nearest dock I can return one to.
//!
//! ## Features
//!
//! - **Consistent**: every answer is computed from one complete snapshot of the
//!   operator's station and bike feeds, never a mix of old and new documents
//! - **Cached**: snapshots are reused for a configurable TTL, with a single
//!   refresh in flight at a time
//! - **Resilient**: if a refresh fails the last good snapshot keeps serving
//! - **Docked and dockless**: free-floating bikes rank alongside stations
//!
//! ## Quick Start
//!
//! ```ignore
//! use bikeshare::BikeshareServiceBuilder;
//!
//! let service = BikeshareServiceBuilder::new().build()?;
//! let bikes = service.find_nearest_bike(37.7955, -122.3937, 3, None)?;
//! let docks = service.find_nearest_dock_spaces(37.7955, -122.3937, 3)?;
//! ```
//!
//! ## Data
//!
//! Feeds follow the General Bikeshare Feed Specification (GBFS). Three
//! documents make up a snapshot: `station_information`, `station_status` and
//! `free_bike_status` (`vehicle_status` in GBFS 3).
//!
//! ## Cargo features
//!
//! - `http`: fetch live feeds with reqwest, including GBFS discovery
//! - `geojson`: render results as GeoJSON

pub mod error;
pub mod feed;
pub mod fetch;
pub mod model;
pub mod normalize;
pub mod rank;
pub mod service;
pub mod source;

#[cfg(feature = "geojson")]
pub mod geojson;

// Re-export main types at crate root for convenience
pub use error::{BikeshareError, Result};
pub use feed::FeedKind;
pub use fetch::{FeedFetcher, FeedSource, FeedStats};
pub use model::{BikeType, Candidate, CandidateKind, Coordinates, FeedSnapshot, FreeBike, Station};
pub use service::{
    AvailableCounts, BikeQuery, BikeshareService, BikeshareServiceBuilder, DockQuery,
    NearestResult,
};
