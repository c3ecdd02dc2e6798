#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the noise map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from [`ComplaintRecord`] so the API contract can evolve independently of
//! the stored shape.

use chrono::{DateTime, Utc};
use noise_map_complaint_models::ComplaintRecord;
use serde::{Deserialize, Serialize};

/// A noise complaint as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiComplaint {
    /// Unique complaint ID.
    pub id: String,
    /// When the complaint was created (ISO 8601).
    pub created_at: DateTime<Utc>,
    /// Complaint type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complaint_type: Option<String>,
    /// Descriptor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<String>,
    /// Location type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_type: Option<String>,
    /// Incident ZIP code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_zip: Option<String>,
    /// Incident street address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_address: Option<String>,
    /// City.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Borough.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borough: Option<String>,
    /// Latitude.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl From<&ComplaintRecord> for ApiComplaint {
    fn from(record: &ComplaintRecord) -> Self {
        Self {
            id: record.id().to_string(),
            created_at: record.created_at(),
            complaint_type: record.complaint_type().map(str::to_string),
            descriptor: record.descriptor().map(str::to_string),
            location_type: record.location_type().map(str::to_string),
            incident_zip: record.incident_zip().map(str::to_string),
            incident_address: record.incident_address().map(str::to_string),
            city: record.city().map(str::to_string),
            borough: record.borough().map(str::to_string),
            latitude: record.latitude(),
            longitude: record.longitude(),
        }
    }
}

/// Query parameters for the near endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearQueryParams {
    /// Center longitude.
    #[serde(alias = "longitude")]
    pub lon: f64,
    /// Center latitude.
    #[serde(alias = "latitude")]
    pub lat: f64,
    /// Search radius in kilometres.
    pub distance_in_km: f64,
    /// Maximum number of results.
    pub limit: Option<usize>,
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Store and index sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStats {
    /// Stored complaints.
    pub records: usize,
    /// Complaints reachable through proximity queries.
    pub indexed: usize,
    /// Non-empty grid cells.
    pub cells: usize,
}

/// Error body returned with 4xx/5xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable description.
    pub error: String,
}

impl ApiError {
    /// Creates an error body.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    #[test]
    fn api_complaint_omits_missing_fields() {
        let record = ComplaintRecord::new(
            "61234567",
            Utc.with_ymd_and_hms(2024, 6, 1, 23, 41, 12).unwrap(),
        )
        .with_descriptor(Some("Banging/Pounding".to_string()))
        .with_coordinates(Some(40.71), Some(-73.96));

        let json = serde_json::to_value(ApiComplaint::from(&record)).unwrap();
        assert_eq!(json["id"], "61234567");
        assert_eq!(json["createdAt"], "2024-06-01T23:41:12Z");
        assert_eq!(json["descriptor"], "Banging/Pounding");
        assert_eq!(json["latitude"], 40.71);
        assert!(json.get("borough").is_none());
    }
}
