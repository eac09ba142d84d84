use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// Nearest bikeshare bikes and docks from live GBFS feeds
#[derive(Parser)]
#[command(name = "bikeshare")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    feed: FeedArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Where feeds come from and how long snapshots are kept.
#[derive(Args, Debug, Clone)]
pub struct FeedArgs {
    /// GBFS discovery document URL (defaults to Bay Wheels)
    #[arg(long, env = "BIKESHARE_FEED_URL", global = true)]
    pub feed_url: Option<String>,

    /// Base URL serving <feed>.json, instead of discovery
    #[arg(long, env = "BIKESHARE_BASE_URL", global = true, conflicts_with = "feed_url")]
    pub base_url: Option<String>,

    /// Directory with saved station_information.json etc., for offline use
    #[arg(short, long, env = "BIKESHARE_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Snapshot time-to-live in seconds
    #[arg(long, env = "BIKESHARE_CACHE_TTL", default_value = "60", global = true)]
    pub ttl: u64,

    /// HTTP timeout in seconds
    #[arg(long, env = "BIKESHARE_TIMEOUT", default_value = "10", global = true)]
    pub timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the nearest rentable bikes
    Bike {
        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Number of results
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// classic_bike or electric_bike (any type if omitted)
        #[arg(short, long)]
        bike_type: Option<String>,

        /// Minimum bikes at a station
        #[arg(short, long, default_value = "1")]
        min_available: u32,

        /// Output results as JSON
        #[arg(short, long, conflicts_with = "geojson")]
        json: bool,

        /// Output results as a GeoJSON FeatureCollection
        #[arg(short, long)]
        geojson: bool,
    },

    /// Find the nearest stations with free docks
    Dock {
        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Number of results
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// Minimum free docks at a station
        #[arg(short, long, default_value = "1")]
        min_available: u32,

        /// Output results as JSON
        #[arg(short, long, conflicts_with = "geojson")]
        json: bool,

        /// Output results as a GeoJSON FeatureCollection
        #[arg(short, long)]
        geojson: bool,
    },

    /// Find the nearest bike (or dock) for every row of a CSV file
    Batch {
        /// Input CSV file
        input: PathBuf,

        /// Output file (defaults to <input>_nearest.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Column name for latitude
        #[arg(long, default_value = "lat")]
        lat_col: String,

        /// Column name for longitude
        #[arg(long, default_value = "lon")]
        lon_col: String,

        /// Look for free docks instead of bikes
        #[arg(long, conflicts_with = "bike_type")]
        docks: bool,

        /// classic_bike or electric_bike (any type if omitted)
        #[arg(short, long)]
        bike_type: Option<String>,
    },

    /// Summarize the current feed snapshot
    Info {
        /// Output summary as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List stations sorted by name
    List {
        /// Show at most this many stations
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Bike {
            lat,
            lon,
            count,
            bike_type,
            min_available,
            json,
            geojson,
        } => commands::query::run_bike(
            &cli.feed,
            lat,
            lon,
            count,
            bike_type.as_deref(),
            min_available,
            commands::OutputFormat::from_flags(json, geojson),
        ),
        Commands::Dock {
            lat,
            lon,
            count,
            min_available,
            json,
            geojson,
        } => commands::query::run_dock(
            &cli.feed,
            lat,
            lon,
            count,
            min_available,
            commands::OutputFormat::from_flags(json, geojson),
        ),
        Commands::Batch {
            input,
            output,
            lat_col,
            lon_col,
            docks,
            bike_type,
        } => commands::batch::run(
            &cli.feed,
            input,
            output,
            lat_col,
            lon_col,
            docks,
            bike_type.as_deref(),
        ),
        Commands::Info { json } => commands::info::run(&cli.feed, json),
        Commands::List { limit } => commands::list::run(&cli.feed, limit),
    }
}
