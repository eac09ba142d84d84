//! Distance ranking.
//!
//! Every query is a linear scan: each candidate is tested against a
//! [`Predicate`], survivors get a haversine distance, and the closest `count`
//! are selected with a partial sort. Cost is O(n) over the snapshot plus
//! O(k log k) to order the selected entries.

use std::cmp::Ordering;

use geo::{HaversineDistance, Point};

use crate::model::{BikeType, Candidate, Coordinates};

/// Great-circle distance between two positions, in meters.
pub fn haversine_distance(a: Coordinates, b: Coordinates) -> f64 {
    Point::new(a.lon, a.lat).haversine_distance(&Point::new(b.lon, b.lat))
}

/// Filter applied to candidates before ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// Rentable bikes, optionally of one type.
    Bikes {
        bike_type: Option<BikeType>,
        min_available: u32,
    },
    /// Docks accepting returns. Dockless bikes never qualify.
    Docks { min_available: u32 },
}

impl Predicate {
    /// The availability count that qualifies `candidate`, or `None` if it
    /// does not qualify.
    pub fn evaluate(&self, candidate: &Candidate<'_>) -> Option<u32> {
        let (available, min_available) = match *self {
            Predicate::Bikes {
                bike_type,
                min_available,
            } => (candidate.bikes_available(bike_type), min_available),
            Predicate::Docks { .. } if matches!(candidate, Candidate::FreeFloating(_)) => {
                return None
            }
            Predicate::Docks { min_available } => (candidate.docks_available(), min_available),
        };
        (available > 0 && available >= min_available).then_some(available)
    }
}

/// A candidate that passed the predicate, with its distance to the query.
#[derive(Debug, Clone)]
pub struct Ranked<'a> {
    pub candidate: Candidate<'a>,
    /// Meters from the query point.
    pub distance_m: f64,
    /// The count that satisfied the predicate.
    pub available: u32,
}

/// Ascending distance; exact ties resolve by identifier. A station and a
/// free bike sharing an identifier order station first.
fn by_distance(a: &Ranked<'_>, b: &Ranked<'_>) -> Ordering {
    a.distance_m
        .total_cmp(&b.distance_m)
        .then_with(|| a.candidate.id().cmp(b.candidate.id()))
        .then_with(|| a.candidate.kind().cmp(&b.candidate.kind()))
}

/// Return up to `count` candidates satisfying `predicate`, nearest first.
///
/// Fewer than `count` entries are returned when fewer candidates qualify.
pub fn rank<'a, I>(
    origin: Coordinates,
    candidates: I,
    predicate: &Predicate,
    count: usize,
) -> Vec<Ranked<'a>>
where
    I: IntoIterator<Item = Candidate<'a>>,
{
    if count == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<Ranked<'a>> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let available = predicate.evaluate(&candidate)?;
            Some(Ranked {
                distance_m: haversine_distance(origin, candidate.coordinates()),
                candidate,
                available,
            })
        })
        .collect();

    if ranked.len() > count {
        ranked.select_nth_unstable_by(count - 1, by_distance);
        ranked.truncate(count);
    }
    ranked.sort_by(by_distance);
    ranked
}
