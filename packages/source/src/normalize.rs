//! Decodes raw NYC 311 rows into [`ComplaintRecord`]s.
//!
//! Every nested or encoded field is resolved eagerly: the `location` column
//! (either the legacy Socrata location object or a `GeoJSON` point) and its
//! JSON-encoded `human_address` blob are decoded here, once, at ingest time.

use noise_map_complaint_models::ComplaintRecord;
use serde::Deserialize;
use serde_json::Value;

use crate::SourceError;
use crate::parsing::{parse_coordinate, parse_socrata_date, parse_text};

#[derive(Debug, Deserialize)]
struct RawComplaint {
    #[serde(default)]
    unique_key: Option<Value>,
    #[serde(default)]
    created_date: Option<String>,
    #[serde(default)]
    complaint_type: Option<Value>,
    #[serde(default)]
    descriptor: Option<Value>,
    #[serde(default)]
    location_type: Option<Value>,
    #[serde(default)]
    incident_zip: Option<Value>,
    #[serde(default)]
    incident_address: Option<Value>,
    #[serde(default)]
    city: Option<Value>,
    #[serde(default)]
    borough: Option<Value>,
    #[serde(default)]
    latitude: Option<Value>,
    #[serde(default)]
    longitude: Option<Value>,
    #[serde(default)]
    location: Option<Value>,
}

/// Street address fields packed as a JSON string inside the legacy Socrata
/// location object.
#[derive(Debug, Default, Deserialize)]
struct HumanAddress {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    zip: Option<String>,
}

/// Coordinates and address recovered from the `location` column.
#[derive(Debug, Default)]
struct DecodedLocation {
    latitude: Option<f64>,
    longitude: Option<f64>,
    address: HumanAddress,
}

fn decode_location(location: Option<&Value>) -> DecodedLocation {
    let Some(Value::Object(obj)) = location else {
        return DecodedLocation::default();
    };

    // GeoJSON point: {"type": "Point", "coordinates": [lon, lat]}
    if let Some(Value::Array(coords)) = obj.get("coordinates") {
        return DecodedLocation {
            latitude: parse_coordinate(coords.get(1)),
            longitude: parse_coordinate(coords.first()),
            address: HumanAddress::default(),
        };
    }

    let address = match obj.get("human_address") {
        Some(Value::String(blob)) => serde_json::from_str(blob).unwrap_or_else(|e| {
            log::debug!("Ignoring undecodable human_address {blob:?}: {e}");
            HumanAddress::default()
        }),
        _ => HumanAddress::default(),
    };

    DecodedLocation {
        latitude: parse_coordinate(obj.get("latitude")),
        longitude: parse_coordinate(obj.get("longitude")),
        address,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Decodes one raw 311 row.
///
/// # Errors
///
/// Returns [`SourceError::Normalization`] if the row is not an object, has
/// no `unique_key`, or has a missing or unparseable `created_date`.
pub fn normalize_row(row: &Value) -> Result<ComplaintRecord, SourceError> {
    let raw = RawComplaint::deserialize(row).map_err(|e| SourceError::Normalization {
        message: format!("row is not a complaint object: {e}"),
    })?;

    let id = non_empty(parse_text(raw.unique_key.as_ref())).ok_or_else(|| {
        SourceError::Normalization {
            message: "missing unique_key".to_string(),
        }
    })?;

    let created_raw = raw.created_date.as_deref().unwrap_or_default();
    let created_at = parse_socrata_date(created_raw).ok_or_else(|| SourceError::Normalization {
        message: format!("complaint {id}: unparseable created_date {created_raw:?}"),
    })?;

    let location = decode_location(raw.location.as_ref());
    let latitude = parse_coordinate(raw.latitude.as_ref()).or(location.latitude);
    let longitude = parse_coordinate(raw.longitude.as_ref()).or(location.longitude);

    let incident_address =
        non_empty(parse_text(raw.incident_address.as_ref())).or(location.address.address);
    let city = non_empty(parse_text(raw.city.as_ref())).or(location.address.city);
    let incident_zip = non_empty(parse_text(raw.incident_zip.as_ref())).or(location.address.zip);

    Ok(ComplaintRecord::new(id, created_at)
        .with_complaint_type(parse_text(raw.complaint_type.as_ref()))
        .with_descriptor(parse_text(raw.descriptor.as_ref()))
        .with_location_type(parse_text(raw.location_type.as_ref()))
        .with_incident_zip(incident_zip)
        .with_incident_address(incident_address)
        .with_city(city)
        .with_borough(parse_text(raw.borough.as_ref()))
        .with_coordinates(latitude, longitude))
}

/// Decodes a batch of raw rows, logging and skipping the ones that fail.
#[must_use]
pub fn normalize_rows(rows: &[Value]) -> Vec<ComplaintRecord> {
    let mut skipped = 0_usize;
    let records: Vec<ComplaintRecord> = rows
        .iter()
        .filter_map(|row| match normalize_row(row) {
            Ok(record) => Some(record),
            Err(e) => {
                skipped += 1;
                log::warn!("Skipping 311 row: {e}");
                None
            }
        })
        .collect();

    if skipped > 0 {
        log::info!(
            "Decoded {} of {} rows ({skipped} skipped)",
            records.len(),
            rows.len()
        );
    }
    records
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_flat_row() {
        let row = json!({
            "unique_key": "61234567",
            "created_date": "2024-06-01T23:41:12.000",
            "complaint_type": "Noise - Residential",
            "descriptor": "Loud Music/Party",
            "location_type": "Residential Building/House",
            "incident_zip": "11211",
            "incident_address": "100 BEDFORD AVENUE",
            "city": "BROOKLYN",
            "borough": "BROOKLYN",
            "latitude": "40.7195",
            "longitude": "-73.9566"
        });

        let record = normalize_row(&row).unwrap();
        assert_eq!(record.id(), "61234567");
        assert_eq!(record.created_at().to_string(), "2024-06-01 23:41:12 UTC");
        assert_eq!(record.complaint_type(), Some("Noise - Residential"));
        assert_eq!(record.descriptor(), Some("Loud Music/Party"));
        assert_eq!(record.incident_zip(), Some("11211"));
        assert_eq!(record.borough(), Some("BROOKLYN"));
        let point = record.point().unwrap();
        assert!((point.latitude() - 40.7195).abs() < 1e-9);
        assert!((point.longitude() + 73.9566).abs() < 1e-9);
    }

    #[test]
    fn falls_back_to_legacy_location_object() {
        let row = json!({
            "unique_key": 61_234_568,
            "created_date": "2024-06-02T01:00:00",
            "location": {
                "latitude": "40.7306",
                "longitude": "-73.9866",
                "human_address": "{\"address\": \"1 E 14 STREET\", \"city\": \"NEW YORK\", \"state\": \"NY\", \"zip\": \"10003\"}"
            }
        });

        let record = normalize_row(&row).unwrap();
        assert_eq!(record.id(), "61234568");
        assert_eq!(record.incident_address(), Some("1 E 14 STREET"));
        assert_eq!(record.city(), Some("NEW YORK"));
        assert_eq!(record.incident_zip(), Some("10003"));
        assert!(record.is_indexable());
    }

    #[test]
    fn falls_back_to_geojson_point() {
        let row = json!({
            "unique_key": "61234569",
            "created_date": "2024-06-02T01:00:00.000",
            "location": {"type": "Point", "coordinates": [-73.9866, 40.7306]}
        });

        let point = normalize_row(&row).unwrap().point().unwrap();
        assert!((point.latitude() - 40.7306).abs() < 1e-9);
        assert!((point.longitude() + 73.9866).abs() < 1e-9);
    }

    #[test]
    fn flat_columns_win_over_location() {
        let row = json!({
            "unique_key": "1",
            "created_date": "2024-06-02T01:00:00",
            "incident_address": "2 AVENUE A",
            "latitude": "40.0",
            "longitude": "-74.0",
            "location": {
                "latitude": "41.0",
                "longitude": "-75.0",
                "human_address": "{\"address\": \"ELSEWHERE\"}"
            }
        });

        let record = normalize_row(&row).unwrap();
        assert_eq!(record.incident_address(), Some("2 AVENUE A"));
        assert_eq!(record.latitude(), Some(40.0));
    }

    #[test]
    fn row_without_coordinates_is_kept_unindexable() {
        let row = json!({
            "unique_key": "2",
            "created_date": "2024-06-02T01:00:00",
            "complaint_type": "Noise - Street/Sidewalk",
            "location": {"human_address": "not json"}
        });

        let record = normalize_row(&row).unwrap();
        assert!(!record.is_indexable());
        assert_eq!(record.incident_address(), None);
    }

    #[test]
    fn rejects_row_without_id_or_date() {
        let missing_id = json!({"created_date": "2024-06-02T01:00:00"});
        assert!(matches!(
            normalize_row(&missing_id),
            Err(SourceError::Normalization { .. })
        ));

        let bad_date = json!({"unique_key": "3", "created_date": "soon"});
        let err = normalize_row(&bad_date).unwrap_err();
        assert!(err.to_string().contains("complaint 3"));

        assert!(normalize_row(&json!("not an object")).is_err());
    }

    #[test]
    fn normalize_rows_skips_bad_rows() {
        let rows = vec![
            json!({"unique_key": "1", "created_date": "2024-06-02T01:00:00"}),
            json!({"unique_key": "2"}),
            json!({"unique_key": "3", "created_date": "2024-06-03T01:00:00"}),
        ];
        let records = normalize_rows(&rows);
        let ids: Vec<&str> = records.iter().map(ComplaintRecord::id).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }
}
