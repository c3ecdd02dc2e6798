#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Library for downloading noise complaint data and inspecting it locally.
//!
//! The binary wraps these helpers in `fetch`, `stats` and `near`
//! subcommands. Everything except [`fetch_source`] works offline against a
//! previously downloaded file.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use noise_map_complaint_models::ComplaintRecord;
use noise_map_source::parsing::parse_socrata_date;
use noise_map_source::registry::{self, DEFAULT_SOURCE_ID};
use noise_map_source::source_def::SourceDefinition;
use noise_map_source::{ComplaintSource, FetchOptions, SourceError};
use noise_map_spatial::{GridConfig, SpatialError};
use noise_map_store::service::{ComplaintService, LoadSummary};

/// Default directory for downloaded files.
pub const DEFAULT_OUTPUT_DIR: &str = "data";

/// Errors surfaced by the ingestion commands.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Download or decode failure.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Bad grid settings or query parameters.
    #[error(transparent)]
    Spatial(#[from] SpatialError),

    /// JSON output failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No source definition with the requested id.
    #[error("Unknown source: {id}")]
    UnknownSource {
        /// The requested id.
        id: String,
    },
}

/// Returns all configured data sources from the TOML registry.
#[must_use]
pub fn all_sources() -> Vec<SourceDefinition> {
    registry::all_sources()
}

/// Looks up a source by id, falling back to the default NYC 311 source.
///
/// # Errors
///
/// Returns [`IngestError::UnknownSource`] if no source has the given id.
pub fn resolve_source(id: Option<&str>) -> Result<SourceDefinition, IngestError> {
    let id = id.unwrap_or(DEFAULT_SOURCE_ID);
    registry::find_source(id).ok_or_else(|| IngestError::UnknownSource { id: id.to_string() })
}

/// Parses a `--since` argument: a plain `YYYY-MM-DD` date (midnight UTC) or
/// any timestamp form the portal itself emits.
///
/// # Errors
///
/// Returns a message suitable for clap when the value is not a date.
pub fn parse_since(value: &str) -> Result<DateTime<Utc>, String> {
    if let Some(midnight) = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }
    parse_socrata_date(value).ok_or_else(|| format!("invalid date {value:?}"))
}

/// Default path of the downloaded file for `source`.
#[must_use]
pub fn default_input(source: &SourceDefinition) -> PathBuf {
    Path::new(DEFAULT_OUTPUT_DIR).join(&source.output_filename)
}

/// Downloads `source` into `options.output_dir`.
///
/// # Errors
///
/// Returns [`IngestError::Source`] if the download fails.
pub async fn fetch_source(
    source: &SourceDefinition,
    options: &FetchOptions,
) -> Result<PathBuf, IngestError> {
    let start = Instant::now();
    log::info!("Fetching source: {} ({})", source.name(), source.id());

    let path = source.fetch(options).await?;

    log::info!(
        "{}: download complete in {:.1}s -> {}",
        source.name(),
        start.elapsed().as_secs_f64(),
        path.display()
    );
    Ok(path)
}

/// Decodes `input` with `source` and loads it into a fresh service.
///
/// # Errors
///
/// Returns [`IngestError`] if the grid config is invalid or the file cannot
/// be read.
pub fn load_file(
    source: &SourceDefinition,
    input: &Path,
    grid: GridConfig,
) -> Result<(ComplaintService, LoadSummary), IngestError> {
    let service = ComplaintService::new(grid)?;
    let records = source.load(input)?;
    let summary = service.load(records);
    Ok((service, summary))
}

/// One-line description of a record for terminal listings.
#[must_use]
pub fn describe(record: &ComplaintRecord) -> String {
    let location = match (record.latitude(), record.longitude()) {
        (Some(lat), Some(lon)) => format!("({lat:.5}, {lon:.5})"),
        _ => "(no location)".to_string(),
    };
    format!(
        "{:<12} {} {:<22} {:<28} {}",
        record.id(),
        record.created_at().format("%Y-%m-%d %H:%M:%S"),
        location,
        record.descriptor().unwrap_or("-"),
        record.incident_address().unwrap_or("-"),
    )
}

/// Describes the first `count` stored records in insertion order.
#[must_use]
pub fn preview(service: &ComplaintService, count: usize) -> Vec<String> {
    service
        .store()
        .all()
        .take(count)
        .map(|record| describe(&record))
        .collect()
}

/// Runs a proximity query and renders the matches as a JSON array.
///
/// # Errors
///
/// Returns [`IngestError::Spatial`] for out-of-range parameters.
pub fn near_json(
    service: &ComplaintService,
    lat: f64,
    lon: f64,
    distance_km: f64,
    limit: Option<usize>,
) -> Result<String, IngestError> {
    let records = service.find_near(lat, lon, distance_km, limit)?;
    let records: Vec<&ComplaintRecord> = records.iter().map(AsRef::as_ref).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}
