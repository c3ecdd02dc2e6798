//! Socrata SODA API fetcher.
//!
//! Handles paginated fetching from a Socrata dataset using the `$select`,
//! `$where`, `$order`, `$limit`, and `$offset` query parameters.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::{FetchOptions, SourceError};

/// Configuration for a Socrata fetch operation.
pub struct SocrataConfig<'a> {
    /// Base API URL (e.g., `"https://data.cityofnewyork.us/resource/erm2-nwe9.json"`).
    pub api_url: &'a str,
    /// The date column used for ordering and the `since` lower bound.
    pub date_column: &'a str,
    /// Columns to request. Empty means every column.
    pub select: &'a [String],
    /// Extra `SoQL` predicate `AND`-ed into `$where`.
    pub filter: Option<&'a str>,
    /// Output filename (e.g., `"nyc_311_complaints.json"`).
    pub output_filename: &'a str,
    /// Label for log messages.
    pub label: &'a str,
    /// Page size for pagination.
    pub page_size: u64,
}

impl SocrataConfig<'_> {
    /// Builds the `$where` clause from the lower bound and extra filter.
    #[must_use]
    pub fn where_clause(&self, since: Option<&DateTime<Utc>>) -> Option<String> {
        let since = since.map(|since| {
            format!(
                "{} >= '{}'",
                self.date_column,
                since.format("%Y-%m-%dT%H:%M:%S")
            )
        });

        match (since, self.filter) {
            (Some(since), Some(filter)) => Some(format!("{since} AND ({filter})")),
            (Some(since), None) => Some(since),
            (None, Some(filter)) => Some(filter.to_string()),
            (None, None) => None,
        }
    }

    /// Query parameters for one page.
    #[must_use]
    pub fn page_params(
        &self,
        since: Option<&DateTime<Utc>>,
        offset: u64,
        limit: u64,
    ) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(5);
        if !self.select.is_empty() {
            params.push(("$select", self.select.join(", ")));
        }
        if let Some(clause) = self.where_clause(since) {
            params.push(("$where", clause));
        }
        params.push(("$order", format!("{} DESC", self.date_column)));
        params.push(("$limit", limit.to_string()));
        params.push(("$offset", offset.to_string()));
        params
    }
}

/// Fetches records from a Socrata dataset with pagination, writes them to a
/// JSON file, and returns the output path.
///
/// Stops after `limit` records or the first short page.
///
/// # Errors
///
/// Returns [`SourceError`] if HTTP requests or file I/O fail.
pub async fn fetch_socrata(
    config: &SocrataConfig<'_>,
    options: &FetchOptions,
) -> Result<PathBuf, SourceError> {
    let output_path = options.output_dir.join(config.output_filename);
    std::fs::create_dir_all(&options.output_dir)?;

    let client = reqwest::Client::new();
    let mut all_records: Vec<serde_json::Value> = Vec::new();
    let mut offset: u64 = 0;
    let fetch_limit = options.limit.unwrap_or(u64::MAX);
    let page_size = config.page_size.max(1);

    loop {
        let remaining = fetch_limit.saturating_sub(offset);
        if remaining == 0 {
            break;
        }
        let page_limit = remaining.min(page_size);

        log::info!(
            "Fetching {} data: offset={offset}, limit={page_limit}",
            config.label
        );
        let response = client
            .get(config.api_url)
            .query(&config.page_params(options.since.as_ref(), offset, page_limit))
            .send()
            .await?
            .error_for_status()?;
        let records: Vec<serde_json::Value> = response.json().await?;

        let count = records.len() as u64;
        if count == 0 {
            break;
        }

        all_records.extend(records);
        offset += count;

        if count < page_limit {
            break;
        }
    }

    log::info!(
        "Downloaded {} {} records total",
        all_records.len(),
        config.label
    );
    let json = serde_json::to_string(&all_records)?;
    std::fs::write(&output_path, json)?;

    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn config<'a>(select: &'a [String], filter: Option<&'a str>) -> SocrataConfig<'a> {
        SocrataConfig {
            api_url: "https://data.cityofnewyork.us/resource/erm2-nwe9.json",
            date_column: "created_date",
            select,
            filter,
            output_filename: "out.json",
            label: "test",
            page_size: 1000,
        }
    }

    #[test]
    fn where_clause_combines_since_and_filter() {
        let since = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let cfg = config(&[], Some("complaint_type like 'Noise%'"));
        assert_eq!(
            cfg.where_clause(Some(&since)).unwrap(),
            "created_date >= '2024-06-01T00:00:00' AND (complaint_type like 'Noise%')"
        );
        assert_eq!(
            cfg.where_clause(None).unwrap(),
            "complaint_type like 'Noise%'"
        );
        assert!(config(&[], None).where_clause(None).is_none());
    }

    #[test]
    fn page_params_include_paging_and_order() {
        let select = vec!["unique_key".to_string(), "created_date".to_string()];
        let cfg = config(&select, None);
        let params = cfg.page_params(None, 2000, 500);

        assert_eq!(params[0], ("$select", "unique_key, created_date".to_string()));
        assert!(params.contains(&("$order", "created_date DESC".to_string())));
        assert!(params.contains(&("$limit", "500".to_string())));
        assert!(params.contains(&("$offset", "2000".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "$where"));
    }
}
