use anyhow::{Context, Result};
use bikeshare::service::{nearest_in, parse_bike_type};
use bikeshare::{BikeQuery, BikeType, BikeshareService, DockQuery, FeedSnapshot};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use super::build_service;
use crate::FeedArgs;

/// What every row of a batch asks for.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Target {
    Bikes(Option<BikeType>),
    Docks,
}

/// Outcome counts of a batch run.
#[derive(Debug, Default, PartialEq, Eq)]
struct BatchSummary {
    matched: u64,
    unmatched: u64,
    invalid: u64,
}

pub fn run(
    feed: &FeedArgs,
    input: PathBuf,
    output: Option<PathBuf>,
    lat_col: String,
    lon_col: String,
    docks: bool,
    bike_type: Option<&str>,
) -> Result<()> {
    let target = if docks {
        Target::Docks
    } else {
        Target::Bikes(parse_bike_type(bike_type)?)
    };

    let service = build_service(feed)?;
    let output_path = output.unwrap_or_else(|| default_output_path(&input));

    let summary = process_csv(&service, &input, &output_path, &lat_col, &lon_col, target)?;

    eprintln!(
        "{} matched, {} without a match, {} invalid rows. Output written to: {}",
        summary.matched,
        summary.unmatched,
        summary.invalid,
        output_path.display()
    );

    Ok(())
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}_nearest.csv", stem))
}

fn process_csv(
    service: &BikeshareService,
    input: &Path,
    output_path: &Path,
    lat_col: &str,
    lon_col: &str,
    target: Target,
) -> Result<BatchSummary> {
    let file = File::open(input).context("Failed to open input file")?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));

    // Find column indices
    let headers = reader.headers()?.clone();
    let lat_idx = headers
        .iter()
        .position(|h| h == lat_col)
        .with_context(|| format!("Column '{}' not found in CSV", lat_col))?;
    let lon_idx = headers
        .iter()
        .position(|h| h == lon_col)
        .with_context(|| format!("Column '{}' not found in CSV", lon_col))?;

    let records: Vec<_> = reader.records().collect::<Result<_, _>>()?;

    // One snapshot for the whole file so every row sees the same feed
    let snapshot = service
        .snapshot()
        .context("Failed to load bikeshare feed")?;

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let output_file = File::create(output_path).context("Failed to create output file")?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(output_file));

    let mut new_headers: Vec<&str> = headers.iter().collect();
    new_headers.extend(["nearest_id", "nearest_name", "nearest_distance_m", "nearest_available"]);
    writer.write_record(&new_headers)?;

    let mut summary = BatchSummary::default();
    for record in &records {
        let lat = record.get(lat_idx).and_then(|v| v.trim().parse::<f64>().ok());
        let lon = record.get(lon_idx).and_then(|v| v.trim().parse::<f64>().ok());

        let nearest = match (lat, lon) {
            (Some(lat), Some(lon)) => nearest_for(&snapshot, lat, lon, target),
            _ => None,
        };

        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        match nearest {
            Some(Some(result)) => {
                summary.matched += 1;
                row.push(result.id);
                row.push(result.name);
                row.push(format!("{:.1}", result.distance));
                row.push(result.available.to_string());
            }
            Some(None) => {
                summary.unmatched += 1;
                row.extend(std::iter::repeat(String::new()).take(4));
            }
            None => {
                summary.invalid += 1;
                row.extend(std::iter::repeat(String::new()).take(4));
            }
        }
        writer.write_record(&row)?;
        pb.inc(1);
    }

    pb.finish_with_message("Done");
    writer.flush()?;

    Ok(summary)
}

/// The single nearest match for one row. `None` when the row's coordinates
/// are rejected, `Some(None)` when nothing in the snapshot qualifies.
fn nearest_for(
    snapshot: &FeedSnapshot,
    lat: f64,
    lon: f64,
    target: Target,
) -> Option<Option<bikeshare::NearestResult>> {
    let validated = match target {
        Target::Bikes(bike_type) => BikeQuery::new(lat, lon)
            .with_bike_type(bike_type)
            .validate(),
        Target::Docks => DockQuery::new(lat, lon).validate(),
    };
    let (origin, predicate) = validated.ok()?;
    Some(nearest_in(snapshot, origin, &predicate, 1).into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bikeshare::source::DirFeedSource;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_feed(dir: &Path) {
        fs::write(
            dir.join("station_information.json"),
            r#"{"last_updated": 1700000000, "data": {"stations": [
                {"station_id": "A", "name": "Ferry Building", "lat": 37.7955, "lon": -122.3937},
                {"station_id": "B", "name": "Market St at 10th", "lat": 37.7929, "lon": -122.4269}
            ]}}"#,
        )
        .unwrap();
        fs::write(
            dir.join("station_status.json"),
            r#"{"last_updated": 1700000000, "data": {"stations": [
                {"station_id": "A", "num_bikes_available": 3, "num_ebikes_available": 0,
                 "num_docks_available": 0, "is_renting": 1, "is_returning": 1},
                {"station_id": "B", "num_bikes_available": 0, "num_ebikes_available": 0,
                 "num_docks_available": 5, "is_renting": 1, "is_returning": 1}
            ]}}"#,
        )
        .unwrap();
        fs::write(
            dir.join("free_bike_status.json"),
            r#"{"last_updated": 1700000000, "data": {"bikes": []}}"#,
        )
        .unwrap();
    }

    fn service_for(dir: &Path) -> BikeshareService {
        BikeshareService::new(DirFeedSource::new(dir), Duration::from_secs(60))
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/tmp/trips.csv")),
            PathBuf::from("/tmp/trips_nearest.csv")
        );
    }

    #[test]
    fn test_process_csv_bikes() {
        let dir = TempDir::new().unwrap();
        write_feed(dir.path());

        let input = dir.path().join("points.csv");
        fs::write(
            &input,
            "name,lat,lon\nferry,37.7955,-122.3937\nbad,abc,-122.4\nfar,95.0,0.0\n",
        )
        .unwrap();
        let output = dir.path().join("out.csv");

        let summary = process_csv(
            &service_for(dir.path()),
            &input,
            &output,
            "lat",
            "lon",
            Target::Bikes(None),
        )
        .unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                matched: 1,
                unmatched: 0,
                invalid: 2
            }
        );

        let mut reader = csv::Reader::from_path(&output).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.get(3), Some("nearest_id"));

        let rows: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get(3), Some("A"));
        assert_eq!(rows[0].get(4), Some("Ferry Building"));
        assert_eq!(rows[0].get(5), Some("0.0"));
        assert_eq!(rows[0].get(6), Some("3"));
        assert_eq!(rows[1].get(3), Some(""));
        assert_eq!(rows[2].get(3), Some(""));
    }

    #[test]
    fn test_process_csv_docks_and_unmatched() {
        let dir = TempDir::new().unwrap();
        write_feed(dir.path());

        let input = dir.path().join("points.csv");
        fs::write(&input, "latitude,longitude\n37.7955,-122.3937\n").unwrap();
        let output = dir.path().join("out.csv");
        let service = service_for(dir.path());

        let summary = process_csv(
            &service,
            &input,
            &output,
            "latitude",
            "longitude",
            Target::Docks,
        )
        .unwrap();
        assert_eq!(summary.matched, 1);

        let mut reader = csv::Reader::from_path(&output).unwrap();
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(row.get(2), Some("B"));
        assert_eq!(row.get(5), Some("5"));

        // No electric bikes anywhere
        let summary = process_csv(
            &service,
            &input,
            &output,
            "latitude",
            "longitude",
            Target::Bikes(Some(BikeType::Electric)),
        )
        .unwrap();
        assert_eq!(summary.unmatched, 1);
    }

    #[test]
    fn test_process_csv_missing_column() {
        let dir = TempDir::new().unwrap();
        write_feed(dir.path());

        let input = dir.path().join("points.csv");
        fs::write(&input, "x,y\n1,2\n").unwrap();

        let err = process_csv(
            &service_for(dir.path()),
            &input,
            &dir.path().join("out.csv"),
            "lat",
            "lon",
            Target::Docks,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Column 'lat' not found"));
    }
}
