use std::time::Duration;

use bikeshare::model::{BikeType, Coordinates, FeedSnapshot, FreeBike, Station};
use bikeshare::rank::{rank, Predicate};
use bikeshare::service::nearest_in;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const STATIONS: usize = 5000;
const FREE_BIKES: usize = 2000;

/// Build a synthetic snapshot spread over roughly the San Francisco area.
fn create_snapshot() -> FeedSnapshot {
    let coords = |i: usize| {
        let lat = 37.70 + ((i * 7919) % 1000) as f64 / 10_000.0;
        let lon = -122.50 + ((i * 104_729) % 1500) as f64 / 10_000.0;
        Coordinates::new(lat, lon).unwrap()
    };

    let stations = (0..STATIONS)
        .map(|i| Station {
            id: format!("station-{i}"),
            name: format!("Station {i}"),
            coords: coords(i),
            classic_bikes: (i % 7) as u32,
            electric_bikes: (i % 3) as u32,
            docks_available: (i % 11) as u32,
            capacity: Some(20),
            is_renting: true,
            is_returning: i % 50 != 0,
        })
        .collect();

    let free_bikes = (0..FREE_BIKES)
        .map(|i| FreeBike {
            id: format!("bike-{i}"),
            coords: coords(i + STATIONS),
            bike_type: if i % 2 == 0 {
                BikeType::Electric
            } else {
                BikeType::Classic
            },
            is_available: i % 10 != 0,
        })
        .collect();

    FeedSnapshot::new(stations, free_bikes, None)
}

fn bench_nearest_bike(c: &mut Criterion) {
    let snapshot = create_snapshot();
    let origin = Coordinates::new(37.7955, -122.3937).unwrap();
    let predicate = Predicate::Bikes {
        bike_type: None,
        min_available: 1,
    };

    c.bench_function("nearest_bike_k5", |b| {
        b.iter(|| {
            black_box(rank(
                black_box(origin),
                snapshot.candidates(),
                &predicate,
                5,
            ));
        });
    });
}

fn bench_nearest_electric(c: &mut Criterion) {
    let snapshot = create_snapshot();
    let origin = Coordinates::new(37.7955, -122.3937).unwrap();
    let predicate = Predicate::Bikes {
        bike_type: Some(BikeType::Electric),
        min_available: 1,
    };

    c.bench_function("nearest_electric_k5", |b| {
        b.iter(|| {
            black_box(nearest_in(&snapshot, black_box(origin), &predicate, 5));
        });
    });
}

fn bench_nearest_dock(c: &mut Criterion) {
    let snapshot = create_snapshot();
    let origin = Coordinates::new(37.7955, -122.3937).unwrap();
    let predicate = Predicate::Docks { min_available: 1 };

    c.bench_function("nearest_dock_k1", |b| {
        b.iter(|| {
            black_box(nearest_in(&snapshot, black_box(origin), &predicate, 1));
        });
    });
}

fn bench_full_sort(c: &mut Criterion) {
    let snapshot = create_snapshot();
    let origin = Coordinates::new(37.7955, -122.3937).unwrap();
    let predicate = Predicate::Docks { min_available: 1 };

    c.bench_function("all_docks_sorted", |b| {
        b.iter(|| {
            black_box(rank(
                black_box(origin),
                snapshot.candidates(),
                &predicate,
                STATIONS,
            ));
        });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = bench_nearest_bike, bench_nearest_electric, bench_nearest_dock, bench_full_sort
}
criterion_main!(benches);
