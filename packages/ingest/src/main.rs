#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the noise complaint ingestion tool.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use noise_map_ingest::{
    DEFAULT_OUTPUT_DIR, all_sources, default_input, fetch_source, load_file, near_json,
    parse_since, preview, resolve_source,
};
use noise_map_source::{ComplaintSource as _, FetchOptions};
use noise_map_spatial::{DEFAULT_CELL_SIZE_DEG, DEFAULT_SHARDS, GridConfig};

#[derive(Parser)]
#[command(name = "noise_map_ingest", about = "Noise complaint ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all configured data sources
    Sources,
    /// Download complaints from the open data portal
    Fetch {
        /// Source identifier (defaults to `nyc_311_noise`)
        #[arg(long)]
        source: Option<String>,
        /// Only fetch complaints created at or after this date
        /// (`YYYY-MM-DD` or a full timestamp)
        #[arg(long, value_parser = parse_since)]
        since: Option<DateTime<Utc>>,
        /// Maximum number of records to fetch
        #[arg(long)]
        limit: Option<u64>,
        /// Directory for the downloaded file
        #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,
    },
    /// Load a downloaded file and print index statistics
    Stats {
        /// Downloaded file (defaults to the source's file under `data/`)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Source identifier used to decode the file
        #[arg(long)]
        source: Option<String>,
        /// Number of records to list
        #[arg(long, default_value = "10")]
        show: usize,
        /// Grid cell edge length in degrees
        #[arg(long, default_value_t = DEFAULT_CELL_SIZE_DEG)]
        cell_size_deg: f64,
    },
    /// Find complaints within a radius, newest first, printed as JSON
    Near {
        /// Downloaded file (defaults to the source's file under `data/`)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Source identifier used to decode the file
        #[arg(long)]
        source: Option<String>,
        /// Center latitude
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Center longitude
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Search radius in kilometres
        #[arg(long)]
        distance_km: f64,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Sources => {
            let sources = all_sources();
            println!("{:<20} NAME", "ID");
            println!("{}", "-".repeat(50));
            for source in &sources {
                println!("{:<20} {}", source.id(), source.name());
            }
        }
        Commands::Fetch {
            source,
            since,
            limit,
            output_dir,
        } => {
            let source = resolve_source(source.as_deref())?;
            let options = FetchOptions {
                since,
                limit,
                output_dir,
            };
            let path = fetch_source(&source, &options).await?;
            println!("{}", path.display());
        }
        Commands::Stats {
            input,
            source,
            show,
            cell_size_deg,
        } => {
            let source = resolve_source(source.as_deref())?;
            let input = input.unwrap_or_else(|| default_input(&source));
            let grid = GridConfig {
                cell_size_deg,
                shards: DEFAULT_SHARDS,
            };

            let start = Instant::now();
            let (service, summary) = load_file(&source, &input, grid)?;
            let stats = service.stats();
            log::info!(
                "Loaded {} in {:.1}s",
                input.display(),
                start.elapsed().as_secs_f64()
            );

            println!("records:    {}", stats.records);
            println!("indexed:    {}", stats.indexed);
            println!("cells:      {}", stats.cells);
            println!("duplicates: {}", summary.duplicates);
            if show > 0 {
                println!();
                for line in preview(&service, show) {
                    println!("{line}");
                }
            }
        }
        Commands::Near {
            input,
            source,
            lat,
            lon,
            distance_km,
            limit,
        } => {
            let source = resolve_source(source.as_deref())?;
            let input = input.unwrap_or_else(|| default_input(&source));
            let (service, _) = load_file(&source, &input, GridConfig::default())?;
            println!("{}", near_json(&service, lat, lon, distance_km, limit)?);
        }
    }

    Ok(())
}
