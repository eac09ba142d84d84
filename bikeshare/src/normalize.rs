//! Merge the three GBFS documents into typed records.
//!
//! Station information (geometry) is joined to station status (counts) by
//! `station_id`. A station missing from either side cannot be ranked and is
//! dropped, as is any record with coordinates outside the valid range.
//! Nothing here fails: bad records are counted in a [`NormalizeReport`] and
//! left out.

use std::collections::{HashMap, HashSet};

use crate::feed::{FreeBikeStatus, StationInformation, StationStatus, StationStatusRecord};
use crate::model::{BikeType, Coordinates, FreeBike, Station};

/// Counts of what was kept and dropped during one normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Stations present in both documents.
    pub stations: usize,
    /// Free bikes kept (available or not).
    pub free_bikes: usize,
    /// Station information entries without a status entry.
    pub missing_status: usize,
    /// Station status entries without an information entry.
    pub missing_information: usize,
    /// Records with out-of-range coordinates.
    pub invalid_coordinates: usize,
    /// Stations flagged `is_installed: false`.
    pub not_installed: usize,
    /// Records that did not parse at all.
    pub malformed: usize,
    /// Repeated identifiers after the first occurrence.
    pub duplicates: usize,
}

impl NormalizeReport {
    /// Total number of records left out.
    pub fn dropped(&self) -> usize {
        self.missing_status
            + self.missing_information
            + self.invalid_coordinates
            + self.not_installed
            + self.malformed
            + self.duplicates
    }
}

/// Output of [`normalize`].
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub stations: Vec<Station>,
    pub free_bikes: Vec<FreeBike>,
    pub report: NormalizeReport,
}

/// Build stations and free bikes from the three documents.
pub fn build(
    info: &StationInformation,
    status: &StationStatus,
    free: &FreeBikeStatus,
) -> (Vec<Station>, Vec<FreeBike>) {
    let normalized = normalize(info, status, free);
    (normalized.stations, normalized.free_bikes)
}

/// Like [`build`], also reporting what was dropped.
pub fn normalize(
    info: &StationInformation,
    status: &StationStatus,
    free: &FreeBikeStatus,
) -> Normalized {
    let mut report = NormalizeReport {
        malformed: info.data.stations.malformed
            + status.data.stations.malformed
            + free.data.bikes.malformed,
        ..Default::default()
    };

    let mut status_by_id: HashMap<&str, &StationStatusRecord> = HashMap::new();
    for record in &status.data.stations.items {
        if status_by_id.insert(&record.station_id, record).is_some() {
            report.duplicates += 1;
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut stations = Vec::with_capacity(info.data.stations.items.len());

    for record in &info.data.stations.items {
        if !seen.insert(&record.station_id) {
            report.duplicates += 1;
            continue;
        }
        let Some(live) = status_by_id.get(record.station_id.as_str()) else {
            report.missing_status += 1;
            continue;
        };
        let Some(coords) = Coordinates::new(record.lat, record.lon) else {
            report.invalid_coordinates += 1;
            continue;
        };
        if live.is_installed == Some(false) {
            report.not_installed += 1;
            continue;
        }

        let (classic_bikes, electric_bikes) = bike_counts(live);
        stations.push(Station {
            id: record.station_id.clone(),
            name: record
                .name
                .clone()
                .unwrap_or_else(|| record.station_id.clone()),
            coords,
            classic_bikes,
            electric_bikes,
            docks_available: live.num_docks_available.unwrap_or(0),
            capacity: record.capacity,
            is_renting: live.is_renting.unwrap_or(true),
            is_returning: live.is_returning.unwrap_or(true),
        });
    }

    report.missing_information = status_by_id
        .keys()
        .filter(|id| !seen.contains(*id))
        .count();
    report.stations = stations.len();

    let mut seen_bikes: HashSet<&str> = HashSet::new();
    let mut free_bikes = Vec::with_capacity(free.data.bikes.items.len());
    for record in &free.data.bikes.items {
        if !seen_bikes.insert(&record.bike_id) {
            report.duplicates += 1;
            continue;
        }
        let Some(coords) = Coordinates::new(record.lat, record.lon) else {
            report.invalid_coordinates += 1;
            continue;
        };
        free_bikes.push(FreeBike {
            id: record.bike_id.clone(),
            coords,
            bike_type: record
                .vehicle_type_id
                .as_deref()
                .map(BikeType::from_vehicle_type_id)
                .unwrap_or(BikeType::Classic),
            is_available: !record.is_reserved.unwrap_or(false)
                && !record.is_disabled.unwrap_or(false),
        });
    }
    report.free_bikes = free_bikes.len();

    if report.dropped() > 0 {
        tracing::debug!(?report, "Dropped feed records during normalization");
    }

    Normalized {
        stations,
        free_bikes,
        report,
    }
}

/// Split a station's bikes into (classic, electric).
///
/// Per-type counts are preferred when the operator publishes them; otherwise
/// `num_ebikes_available` is subtracted from the total.
fn bike_counts(status: &StationStatusRecord) -> (u32, u32) {
    if let Some(types) = &status.vehicle_types_available {
        return types
            .iter()
            .fold((0, 0), |(classic, electric), vt| {
                match BikeType::from_vehicle_type_id(&vt.vehicle_type_id) {
                    BikeType::Classic => (classic.saturating_add(vt.count), electric),
                    BikeType::Electric => (classic, electric.saturating_add(vt.count)),
                }
            });
    }

    let total = status.num_bikes_available.unwrap_or(0);
    let electric = status.num_ebikes_available.unwrap_or(0).min(total);
    (total - electric, electric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{parse_document, FeedKind};

    fn info(body: &str) -> StationInformation {
        parse_document(FeedKind::StationInformation, body.as_bytes()).unwrap()
    }

    fn status(body: &str) -> StationStatus {
        parse_document(FeedKind::StationStatus, body.as_bytes()).unwrap()
    }

    fn free(body: &str) -> FreeBikeStatus {
        parse_document(FeedKind::FreeBikeStatus, body.as_bytes()).unwrap()
    }

    fn empty_free() -> FreeBikeStatus {
        free(r#"{"data": {"bikes": []}}"#)
    }

    #[test]
    fn test_join_by_station_id() {
        let info = info(
            r#"{"data": {"stations": [
                {"station_id": "A", "name": "Ferry Building", "lat": 37.7955, "lon": -122.3937, "capacity": 5},
                {"station_id": "B", "name": "Only info", "lat": 37.7929, "lon": -122.4269}
            ]}}"#,
        );
        let status = status(
            r#"{"data": {"stations": [
                {"station_id": "A", "num_bikes_available": 3, "num_ebikes_available": 0, "num_docks_available": 2},
                {"station_id": "Z", "num_bikes_available": 9, "num_docks_available": 9}
            ]}}"#,
        );

        let out = normalize(&info, &status, &empty_free());

        assert_eq!(out.stations.len(), 1);
        let a = &out.stations[0];
        assert_eq!(a.id, "A");
        assert_eq!(a.classic_bikes, 3);
        assert_eq!(a.electric_bikes, 0);
        assert_eq!(a.docks_available, 2);
        assert_eq!(a.capacity, Some(5));
        assert!(a.is_renting && a.is_returning);

        assert_eq!(out.report.missing_status, 1);
        assert_eq!(out.report.missing_information, 1);
        assert_eq!(out.report.dropped(), 2);
    }

    #[test]
    fn test_invalid_coordinates_dropped() {
        let info = info(
            r#"{"data": {"stations": [
                {"station_id": "A", "name": "North of the pole", "lat": 91.0, "lon": 0.0},
                {"station_id": "B", "name": "Fine", "lat": 10.0, "lon": 10.0}
            ]}}"#,
        );
        let status = status(
            r#"{"data": {"stations": [
                {"station_id": "A", "num_bikes_available": 1},
                {"station_id": "B", "num_bikes_available": 1}
            ]}}"#,
        );
        let bikes = free(
            r#"{"data": {"bikes": [
                {"bike_id": "x", "lat": 0.0, "lon": 200.0},
                {"bike_id": "y", "lat": 0.0, "lon": 0.0}
            ]}}"#,
        );

        let out = normalize(&info, &status, &bikes);
        assert_eq!(out.stations.len(), 1);
        assert_eq!(out.stations[0].id, "B");
        assert_eq!(out.free_bikes.len(), 1);
        assert_eq!(out.free_bikes[0].id, "y");
        assert_eq!(out.report.invalid_coordinates, 2);
    }

    #[test]
    fn test_vehicle_types_available_preferred() {
        let info = info(r#"{"data": {"stations": [{"station_id": "A", "lat": 1.0, "lon": 1.0}]}}"#);
        let status = status(
            r#"{"data": {"stations": [
                {"station_id": "A", "num_bikes_available": 5, "num_ebikes_available": 0,
                 "vehicle_types_available": [
                    {"vehicle_type_id": "1", "count": 2},
                    {"vehicle_type_id": "2", "count": 3}
                 ]}
            ]}}"#,
        );

        let (stations, _) = build(&info, &status, &empty_free());
        assert_eq!(stations[0].classic_bikes, 2);
        assert_eq!(stations[0].electric_bikes, 3);
        // Missing name falls back to the id.
        assert_eq!(stations[0].name, "A");
    }

    #[test]
    fn test_ebike_count_saturates() {
        let info = info(r#"{"data": {"stations": [{"station_id": "A", "lat": 1.0, "lon": 1.0}]}}"#);
        let status = status(
            r#"{"data": {"stations": [
                {"station_id": "A", "num_bikes_available": 2, "num_ebikes_available": 7}
            ]}}"#,
        );

        let (stations, _) = build(&info, &status, &empty_free());
        assert_eq!(stations[0].classic_bikes, 0);
        assert_eq!(stations[0].electric_bikes, 2);
    }

    #[test]
    fn test_vehicle_type_counts_saturate() {
        let info = info(r#"{"data": {"stations": [{"station_id": "A", "lat": 1.0, "lon": 1.0}]}}"#);
        let status = status(
            r#"{"data": {"stations": [
                {"station_id": "A", "num_docks_available": 1, "vehicle_types_available": [
                    {"vehicle_type_id": "1", "count": 4294967295},
                    {"vehicle_type_id": "classic", "count": 1},
                    {"vehicle_type_id": "2", "count": 3}
                ]}
            ]}}"#,
        );

        let (stations, _) = build(&info, &status, &empty_free());
        assert_eq!(stations[0].classic_bikes, u32::MAX);
        assert_eq!(stations[0].electric_bikes, 3);
        assert_eq!(stations[0].bikes_available(), u32::MAX);
    }

    #[test]
    fn test_station_flags() {
        let info = info(
            r#"{"data": {"stations": [
                {"station_id": "A", "lat": 1.0, "lon": 1.0},
                {"station_id": "B", "lat": 1.0, "lon": 1.0}
            ]}}"#,
        );
        let status = status(
            r#"{"data": {"stations": [
                {"station_id": "A", "num_bikes_available": 2, "is_renting": 0, "is_returning": true},
                {"station_id": "B", "num_bikes_available": 2, "is_installed": false}
            ]}}"#,
        );

        let out = normalize(&info, &status, &empty_free());
        assert_eq!(out.stations.len(), 1);
        assert!(!out.stations[0].is_renting);
        assert!(out.stations[0].is_returning);
        assert_eq!(out.report.not_installed, 1);
    }

    #[test]
    fn test_free_bike_defaults() {
        let bikes = free(
            r#"{"data": {"bikes": [
                {"bike_id": "a", "lat": 1.0, "lon": 1.0},
                {"bike_id": "b", "lat": 1.0, "lon": 1.0, "vehicle_type_id": "2", "is_reserved": true},
                {"bike_id": "c", "lat": 1.0, "lon": 1.0, "vehicle_type_id": {"bogus": true}, "is_disabled": 1},
                {"bike_id": "a", "lat": 2.0, "lon": 2.0},
                {"lat": 1.0, "lon": 1.0}
            ]}}"#,
        );
        let no_stations = info(r#"{"data": {"stations": []}}"#);
        let no_status = status(r#"{"data": {"stations": []}}"#);

        let out = normalize(&no_stations, &no_status, &bikes);
        assert_eq!(out.free_bikes.len(), 3);

        let a = &out.free_bikes[0];
        assert_eq!(a.bike_type, BikeType::Classic);
        assert!(a.is_available);

        let b = &out.free_bikes[1];
        assert_eq!(b.bike_type, BikeType::Electric);
        assert!(!b.is_available);

        let c = &out.free_bikes[2];
        assert_eq!(c.bike_type, BikeType::Classic);
        assert!(!c.is_available);

        assert_eq!(out.report.duplicates, 1);
        assert_eq!(out.report.malformed, 1);
    }
}
