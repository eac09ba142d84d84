//! Normalized bikeshare records.
//!
//! Everything in this module has already passed the trust boundary in
//! [`crate::normalize`]: coordinates are in range, joins are complete and
//! counts are plain integers. Ranking code never looks at raw feed JSON.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant, SystemTime};

use serde::{Deserialize, Serialize};

use crate::error::{BikeshareError, Result};

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Create coordinates, rejecting NaN and out-of-range values.
    ///
    /// Valid ranges are latitude `[-90, 90]` and longitude `[-180, 180]`.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) {
            Some(Self { lat, lon })
        } else {
            None
        }
    }

    /// Like [`Coordinates::new`] but reports the failure as an
    /// [`BikeshareError::InvalidArgument`].
    pub fn parse(lat: f64, lon: f64) -> Result<Self> {
        Self::new(lat, lon).ok_or_else(|| {
            BikeshareError::invalid(
                "coordinates",
                format!("lat={lat}, lon={lon} (valid: lat ±90°, lon ±180°)"),
            )
        })
    }
}

/// The kind of bike a rider can pick up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BikeType {
    #[serde(rename = "classic_bike")]
    Classic,
    #[serde(rename = "electric_bike")]
    Electric,
}

impl BikeType {
    /// Canonical wire name (`classic_bike` / `electric_bike`).
    pub fn as_str(&self) -> &'static str {
        match self {
            BikeType::Classic => "classic_bike",
            BikeType::Electric => "electric_bike",
        }
    }

    /// Map a GBFS `vehicle_type_id` to a bike type.
    ///
    /// Bay Wheels publishes `"1"` for classic and `"2"` for electric bikes.
    /// Ids mentioning "electric" or "ebike" are electric too; anything else,
    /// including unknown ids, is treated as classic.
    pub fn from_vehicle_type_id(id: &str) -> Self {
        let lower = id.to_ascii_lowercase();
        if lower == "2" || lower.contains("electric") || lower.contains("ebike") {
            BikeType::Electric
        } else {
            BikeType::Classic
        }
    }
}

impl fmt::Display for BikeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BikeType {
    type Err = BikeshareError;

    /// Parse a user-supplied bike type.
    ///
    /// Accepts `classic_bike` and `electric_bike` plus the short aliases
    /// `classic`, `electric` and `ebike`, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic_bike" | "classic" => Ok(BikeType::Classic),
            "electric_bike" | "electric" | "ebike" => Ok(BikeType::Electric),
            _ => Err(BikeshareError::invalid(
                "bike_type",
                format!("unknown bike type {s:?} (expected classic_bike or electric_bike)"),
            )),
        }
    }
}

/// A docked station with its live availability.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub coords: Coordinates,
    pub classic_bikes: u32,
    pub electric_bikes: u32,
    pub docks_available: u32,
    /// Total number of docks, when the operator publishes it.
    pub capacity: Option<u32>,
    pub is_renting: bool,
    pub is_returning: bool,
}

impl Station {
    pub fn bikes_available(&self) -> u32 {
        self.classic_bikes.saturating_add(self.electric_bikes)
    }
}

/// A single dockless vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct FreeBike {
    pub id: String,
    pub coords: Coordinates,
    pub bike_type: BikeType,
    /// False when the bike is reserved or disabled.
    pub is_available: bool,
}

/// Whether a candidate is a station or a dockless bike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    Station,
    FreeBike,
}

/// Anything that can appear in a ranked result.
///
/// Free-floating bikes behave as stations holding exactly one bike of their
/// own type and no docks.
#[derive(Debug, Clone, Copy)]
pub enum Candidate<'a> {
    Docked(&'a Station),
    FreeFloating(&'a FreeBike),
}

impl<'a> Candidate<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            Candidate::Docked(s) => &s.id,
            Candidate::FreeFloating(b) => &b.id,
        }
    }

    pub fn name(&self) -> Cow<'a, str> {
        match self {
            Candidate::Docked(s) => Cow::Borrowed(&s.name),
            Candidate::FreeFloating(b) => Cow::Owned(format!("Free Bike ({})", b.id)),
        }
    }

    pub fn kind(&self) -> CandidateKind {
        match self {
            Candidate::Docked(_) => CandidateKind::Station,
            Candidate::FreeFloating(_) => CandidateKind::FreeBike,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        match self {
            Candidate::Docked(s) => s.coords,
            Candidate::FreeFloating(b) => b.coords,
        }
    }

    /// Bikes that can be rented right now, optionally restricted to one type.
    pub fn bikes_available(&self, bike_type: Option<BikeType>) -> u32 {
        match self {
            Candidate::Docked(s) if !s.is_renting => 0,
            Candidate::Docked(s) => match bike_type {
                Some(BikeType::Classic) => s.classic_bikes,
                Some(BikeType::Electric) => s.electric_bikes,
                None => s.bikes_available(),
            },
            Candidate::FreeFloating(b) if !b.is_available => 0,
            Candidate::FreeFloating(b) => match bike_type {
                Some(t) if t != b.bike_type => 0,
                _ => 1,
            },
        }
    }

    /// Docks that accept a return right now. Always zero for dockless bikes.
    pub fn docks_available(&self) -> u32 {
        match self {
            Candidate::Docked(s) if s.is_returning => s.docks_available,
            _ => 0,
        }
    }
}

/// One complete, internally consistent view of the feed.
///
/// Snapshots are immutable once built and shared behind an `Arc`; a refresh
/// produces a new snapshot rather than patching the current one.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub stations: Vec<Station>,
    pub free_bikes: Vec<FreeBike>,
    /// Wall-clock time the snapshot was built.
    pub fetched_at: SystemTime,
    /// Upstream `last_updated` of the station status document (epoch seconds).
    pub last_updated: Option<u64>,
    built: Instant,
}

impl FeedSnapshot {
    pub fn new(
        stations: Vec<Station>,
        free_bikes: Vec<FreeBike>,
        last_updated: Option<u64>,
    ) -> Self {
        Self {
            stations,
            free_bikes,
            fetched_at: SystemTime::now(),
            last_updated,
            built: Instant::now(),
        }
    }

    /// Time elapsed since this snapshot was built.
    pub fn age(&self) -> Duration {
        self.built.elapsed()
    }

    /// All stations followed by all free bikes.
    pub fn candidates(&self) -> impl Iterator<Item = Candidate<'_>> {
        self.stations
            .iter()
            .map(Candidate::Docked)
            .chain(self.free_bikes.iter().map(Candidate::FreeFloating))
    }
}
