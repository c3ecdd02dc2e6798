//! Server configuration read from environment variables.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;

use noise_map_spatial::{DEFAULT_CELL_SIZE_DEG, DEFAULT_SHARDS, GridConfig};

/// Default location of the raw 311 download.
pub const DEFAULT_DATA_PATH: &str = "data/nyc_311_complaints.json";

/// An environment variable held a value that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid value {value:?} for {name}")]
pub struct ConfigError {
    /// Variable name.
    pub name: &'static str,
    /// The raw value.
    pub value: String,
}

/// Settings for [`crate::run_server`].
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address to bind (`BIND_ADDR`).
    pub bind_addr: String,
    /// Port to bind (`PORT`).
    pub port: u16,
    /// Raw complaint rows loaded at startup (`NOISE_MAP_DATA`).
    pub data_path: PathBuf,
    /// Proximity index grid settings (`NOISE_MAP_CELL_SIZE_DEG`,
    /// `NOISE_MAP_SHARDS`).
    pub grid: GridConfig,
    /// Upper bound on results per query (`NOISE_MAP_MAX_RESULTS`). Unset
    /// means unbounded; zero is rejected.
    pub max_results: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            grid: GridConfig::default(),
            max_results: None,
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set but unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, falling back to defaults
    /// for unset variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set but unparseable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: parse_var(&lookup, "PORT")?.unwrap_or(defaults.port),
            data_path: lookup("NOISE_MAP_DATA").map_or(defaults.data_path, PathBuf::from),
            grid: GridConfig {
                cell_size_deg: parse_var(&lookup, "NOISE_MAP_CELL_SIZE_DEG")?
                    .unwrap_or(DEFAULT_CELL_SIZE_DEG),
                shards: parse_var(&lookup, "NOISE_MAP_SHARDS")?.unwrap_or(DEFAULT_SHARDS),
            },
            max_results: parse_var::<NonZeroUsize>(&lookup, "NOISE_MAP_MAX_RESULTS")?
                .map(NonZeroUsize::get),
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(value) = lookup(name) else {
        return Ok(None);
    };
    match value.trim().parse() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(_) => Err(ConfigError { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("BIND_ADDR", "0.0.0.0"),
            ("PORT", "9000"),
            ("NOISE_MAP_DATA", "/tmp/rows.json"),
            ("NOISE_MAP_CELL_SIZE_DEG", "0.05"),
            ("NOISE_MAP_SHARDS", "4"),
            ("NOISE_MAP_MAX_RESULTS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.data_path, PathBuf::from("/tmp/rows.json"));
        assert!((config.grid.cell_size_deg - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.grid.shards, 4);
        assert_eq!(config.max_results, Some(250));
    }

    #[test]
    fn rejects_unparseable_values() {
        let err = ServerConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert_eq!(err.name, "PORT");
        assert_eq!(err.value, "eighty");
    }

    #[test]
    fn rejects_zero_max_results() {
        let err =
            ServerConfig::from_lookup(lookup(&[("NOISE_MAP_MAX_RESULTS", "0")])).unwrap_err();
        assert_eq!(err.name, "NOISE_MAP_MAX_RESULTS");
        assert_eq!(err.value, "0");

        let config =
            ServerConfig::from_lookup(lookup(&[("NOISE_MAP_MAX_RESULTS", "1")])).unwrap();
        assert_eq!(config.max_results, Some(1));
    }
}
