//! Shared parsing utilities for Socrata rows.
//!
//! Socrata serializes most scalar columns as strings, but exports and older
//! API versions sometimes emit numbers, so the helpers here accept both.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

/// Parses a Socrata datetime string (ISO 8601 with optional fractional
/// seconds). Floating timestamps are taken as UTC; strings carrying an
/// explicit offset are converted to UTC.
#[must_use]
pub fn parse_socrata_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Reads a numeric coordinate from a JSON string or number. Returns `None`
/// if the value is missing, empty, or unparseable. Range checks are left to
/// the caller.
#[must_use]
pub fn parse_coordinate(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Reads a text column, rendering numbers as text (ZIP codes are sometimes
/// exported as integers). `null` and missing values become `None`.
#[must_use]
pub fn parse_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_socrata_date_with_fractional() {
        let dt = parse_socrata_date("2024-06-01T14:30:00.000").unwrap();
        assert_eq!(dt.to_string(), "2024-06-01 14:30:00 UTC");
    }

    #[test]
    fn parses_socrata_date_without_fractional() {
        let dt = parse_socrata_date("2024-06-01T14:30:00").unwrap();
        assert_eq!(dt.to_string(), "2024-06-01 14:30:00 UTC");
    }

    #[test]
    fn parses_date_with_offset_into_utc() {
        let dt = parse_socrata_date("2024-06-01T10:30:00-04:00").unwrap();
        assert_eq!(dt.to_string(), "2024-06-01 14:30:00 UTC");
    }

    #[test]
    fn rejects_garbage_date() {
        assert!(parse_socrata_date("yesterday").is_none());
        assert!(parse_socrata_date("").is_none());
    }

    #[test]
    fn parses_coordinate_from_string_and_number() {
        assert_eq!(parse_coordinate(Some(&json!("40.7128"))), Some(40.7128));
        assert_eq!(parse_coordinate(Some(&json!(-73.99))), Some(-73.99));
        assert_eq!(parse_coordinate(Some(&json!(""))), None);
        assert_eq!(parse_coordinate(Some(&json!(null))), None);
        assert_eq!(parse_coordinate(None), None);
    }

    #[test]
    fn keeps_out_of_range_coordinate_values() {
        assert_eq!(parse_coordinate(Some(&json!("999"))), Some(999.0));
    }

    #[test]
    fn parses_text_from_number() {
        assert_eq!(parse_text(Some(&json!(11201))), Some("11201".to_string()));
        assert_eq!(parse_text(Some(&json!("11201"))), Some("11201".to_string()));
        assert_eq!(parse_text(Some(&json!(null))), None);
    }
}
