#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Complaint data source trait and the NYC 311 implementation.
//!
//! A [`ComplaintSource`] knows how to download its raw rows and how to turn
//! a downloaded file into [`ComplaintRecord`]s. All schema concerns (nested
//! location objects, textual timestamps, JSON-encoded address blobs) are
//! resolved here so the store and index only ever see fully decoded records.

pub mod normalize;
pub mod parsing;
pub mod registry;
pub mod socrata;
pub mod source_def;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use noise_map_complaint_models::ComplaintRecord;

/// Errors that can occur during data source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Source definition could not be parsed.
    #[error("Invalid source config: {0}")]
    Config(#[from] toml::de::Error),

    /// A raw row could not be decoded into a complaint.
    #[error("Normalization error: {message}")]
    Normalization {
        /// Description of what went wrong.
        message: String,
    },
}

/// Configuration for fetching data from a source.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Only fetch records created at or after this timestamp. Falls back to
    /// the source's configured lower bound when `None`.
    pub since: Option<chrono::DateTime<chrono::Utc>>,
    /// Maximum number of records to fetch. Falls back to the source's
    /// configured default when `None`.
    pub limit: Option<u64>,
    /// Directory to store downloaded files.
    pub output_dir: PathBuf,
}

/// Trait that all complaint data sources implement.
#[async_trait]
pub trait ComplaintSource: Send + Sync {
    /// Returns a unique identifier for this source (e.g., `"nyc_311_noise"`).
    fn id(&self) -> &str;

    /// Returns the human-readable name of this source.
    fn name(&self) -> &str;

    /// Downloads raw data from the source, returning the path to the
    /// downloaded file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the download fails.
    async fn fetch(&self, options: &FetchOptions) -> Result<PathBuf, SourceError>;

    /// Reads a downloaded file and decodes every usable row.
    ///
    /// Rows that cannot be decoded are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file cannot be read or is not a JSON
    /// array.
    fn load(&self, raw_path: &Path) -> Result<Vec<ComplaintRecord>, SourceError>;
}
