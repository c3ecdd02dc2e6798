//! Config-driven complaint source definition.
//!
//! [`SourceDefinition`] captures everything unique about a Socrata dataset
//! in a serializable config struct and implements [`ComplaintSource`] for
//! it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use noise_map_complaint_models::ComplaintRecord;
use serde::Deserialize;

use crate::normalize::normalize_rows;
use crate::parsing::parse_socrata_date;
use crate::socrata::{SocrataConfig, fetch_socrata};
use crate::{ComplaintSource, FetchOptions, SourceError};

/// A complete, config-driven complaint source definition.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDefinition {
    /// Unique identifier (e.g., `"nyc_311_noise"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// File name the raw download is written to.
    pub output_filename: String,
    /// Human-readable data portal page for this source.
    #[serde(default)]
    pub portal_url: Option<String>,
    /// How to fetch raw data from the API.
    pub fetcher: FetcherConfig,
}

/// Socrata fetch settings.
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Base Socrata API URL.
    pub api_url: String,
    /// Date column for ordering and filtering.
    pub date_column: String,
    /// Records per page.
    pub page_size: u64,
    /// Record cap applied when the caller does not give one.
    #[serde(default)]
    pub default_limit: Option<u64>,
    /// Lower bound on `date_column` applied when the caller does not give
    /// one, as a Socrata timestamp.
    #[serde(default)]
    pub since: Option<String>,
    /// Extra `SoQL` predicate.
    #[serde(default)]
    pub filter: Option<String>,
    /// Columns to request.
    #[serde(default)]
    pub select: Vec<String>,
}

impl FetcherConfig {
    /// The configured lower bound, if it parses.
    #[must_use]
    pub fn default_since(&self) -> Option<DateTime<Utc>> {
        let raw = self.since.as_deref()?;
        let parsed = parse_socrata_date(raw);
        if parsed.is_none() {
            log::warn!("Ignoring unparseable source `since` value {raw:?}");
        }
        parsed
    }
}

/// Parses a source definition from TOML.
///
/// # Errors
///
/// Returns [`SourceError::Config`] if the TOML is malformed or missing
/// required fields.
pub fn parse_source_toml(toml_str: &str) -> Result<SourceDefinition, SourceError> {
    Ok(toml::de::from_str(toml_str)?)
}

/// Reads a JSON array of raw rows from disk and decodes it.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be read or is not a JSON
/// array.
pub fn load_rows_file(path: &Path) -> Result<Vec<ComplaintRecord>, SourceError> {
    let contents = std::fs::read_to_string(path)?;
    let rows: Vec<serde_json::Value> = serde_json::from_str(&contents)?;
    log::info!("Read {} raw rows from {}", rows.len(), path.display());
    Ok(normalize_rows(&rows))
}

#[async_trait]
impl ComplaintSource for SourceDefinition {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, options: &FetchOptions) -> Result<PathBuf, SourceError> {
        let effective = FetchOptions {
            since: options.since.or_else(|| self.fetcher.default_since()),
            limit: options.limit.or(self.fetcher.default_limit),
            output_dir: options.output_dir.clone(),
        };

        let config = SocrataConfig {
            api_url: &self.fetcher.api_url,
            date_column: &self.fetcher.date_column,
            select: &self.fetcher.select,
            filter: self.fetcher.filter.as_deref(),
            output_filename: &self.output_filename,
            label: &self.name,
            page_size: self.fetcher.page_size,
        };

        fetch_socrata(&config, &effective).await
    }

    fn load(&self, raw_path: &Path) -> Result<Vec<ComplaintRecord>, SourceError> {
        load_rows_file(raw_path)
    }
}
