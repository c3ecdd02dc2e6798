#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Noise complaint record types and coordinate validation.
//!
//! [`ComplaintRecord`] is the canonical, immutable shape of a 311 noise
//! complaint shared by every crate in the workspace. Records are built once
//! at ingest time and never mutated afterwards. A record only takes part in
//! proximity queries when its coordinates form a valid [`GeoPoint`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Smallest valid latitude in degrees.
pub const MIN_LATITUDE: f64 = -90.0;
/// Largest valid latitude in degrees.
pub const MAX_LATITUDE: f64 = 90.0;
/// Smallest valid longitude in degrees.
pub const MIN_LONGITUDE: f64 = -180.0;
/// Largest valid longitude in degrees.
pub const MAX_LONGITUDE: f64 = 180.0;

/// Which half of a coordinate pair failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Latitude, valid in `[-90, 90]`.
    Latitude,
    /// Longitude, valid in `[-180, 180]`.
    Longitude,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latitude => f.write_str("latitude"),
            Self::Longitude => f.write_str("longitude"),
        }
    }
}

/// Error returned when a latitude or longitude is non-finite or outside its
/// valid range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidCoordinateError {
    /// The axis that was out of range.
    pub axis: Axis,
    /// The rejected value.
    pub value: f64,
}

impl fmt::Display for InvalidCoordinateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (min, max) = match self.axis {
            Axis::Latitude => (MIN_LATITUDE, MAX_LATITUDE),
            Axis::Longitude => (MIN_LONGITUDE, MAX_LONGITUDE),
        };
        write!(
            f,
            "invalid {} {}: expected a value in [{min}, {max}]",
            self.axis, self.value
        )
    }
}

impl std::error::Error for InvalidCoordinateError {}

/// A validated WGS84 point.
///
/// Deserialization goes through [`GeoPoint::new`], so an out-of-range point
/// cannot be constructed from JSON either.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedPoint")]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct UncheckedPoint {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<UncheckedPoint> for GeoPoint {
    type Error = InvalidCoordinateError;

    fn try_from(point: UncheckedPoint) -> Result<Self, Self::Error> {
        Self::new(point.latitude, point.longitude)
    }
}

impl GeoPoint {
    /// Creates a point, validating both coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCoordinateError`] if either value is non-finite or
    /// outside its valid range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinateError> {
        validate_latitude(latitude)?;
        validate_longitude(longitude)?;
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(self) -> f64 {
        self.longitude
    }
}

/// Validates a latitude in degrees.
///
/// # Errors
///
/// Returns [`InvalidCoordinateError`] if the value is NaN, infinite, or
/// outside `[-90, 90]`.
pub fn validate_latitude(value: f64) -> Result<f64, InvalidCoordinateError> {
    if value.is_finite() && (MIN_LATITUDE..=MAX_LATITUDE).contains(&value) {
        Ok(value)
    } else {
        Err(InvalidCoordinateError {
            axis: Axis::Latitude,
            value,
        })
    }
}

/// Validates a longitude in degrees.
///
/// # Errors
///
/// Returns [`InvalidCoordinateError`] if the value is NaN, infinite, or
/// outside `[-180, 180]`.
pub fn validate_longitude(value: f64) -> Result<f64, InvalidCoordinateError> {
    if value.is_finite() && (MIN_LONGITUDE..=MAX_LONGITUDE).contains(&value) {
        Ok(value)
    } else {
        Err(InvalidCoordinateError {
            axis: Axis::Longitude,
            value,
        })
    }
}

/// A single 311 noise complaint.
///
/// Immutable once built: the `with_*` methods consume the record and are
/// only meant for the ingest step that constructs it. Classification and
/// address fields are passed through exactly as the source provided them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintRecord {
    id: String,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    complaint_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    descriptor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    incident_zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    incident_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    borough: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    longitude: Option<f64>,
}

impl ComplaintRecord {
    /// Creates a record with only its identity and creation time set.
    #[must_use]
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at,
            complaint_type: None,
            descriptor: None,
            location_type: None,
            incident_zip: None,
            incident_address: None,
            city: None,
            borough: None,
            latitude: None,
            longitude: None,
        }
    }

    /// Sets the raw coordinates. Out-of-range values are kept as-is; such a
    /// record simply has no [`Self::point`].
    #[must_use]
    pub fn with_coordinates(mut self, latitude: Option<f64>, longitude: Option<f64>) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }

    /// Sets the complaint type (e.g. `"Noise - Residential"`).
    #[must_use]
    pub fn with_complaint_type(mut self, value: Option<String>) -> Self {
        self.complaint_type = value;
        self
    }

    /// Sets the descriptor (e.g. `"Loud Music/Party"`).
    #[must_use]
    pub fn with_descriptor(mut self, value: Option<String>) -> Self {
        self.descriptor = value;
        self
    }

    /// Sets the location type (e.g. `"Residential Building/House"`).
    #[must_use]
    pub fn with_location_type(mut self, value: Option<String>) -> Self {
        self.location_type = value;
        self
    }

    /// Sets the incident ZIP code.
    #[must_use]
    pub fn with_incident_zip(mut self, value: Option<String>) -> Self {
        self.incident_zip = value;
        self
    }

    /// Sets the incident street address.
    #[must_use]
    pub fn with_incident_address(mut self, value: Option<String>) -> Self {
        self.incident_address = value;
        self
    }

    /// Sets the city.
    #[must_use]
    pub fn with_city(mut self, value: Option<String>) -> Self {
        self.city = value;
        self
    }

    /// Sets the borough.
    #[must_use]
    pub fn with_borough(mut self, value: Option<String>) -> Self {
        self.borough = value;
        self
    }

    /// Unique identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the complaint was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Complaint type.
    #[must_use]
    pub fn complaint_type(&self) -> Option<&str> {
        self.complaint_type.as_deref()
    }

    /// Descriptor.
    #[must_use]
    pub fn descriptor(&self) -> Option<&str> {
        self.descriptor.as_deref()
    }

    /// Location type.
    #[must_use]
    pub fn location_type(&self) -> Option<&str> {
        self.location_type.as_deref()
    }

    /// Incident ZIP code.
    #[must_use]
    pub fn incident_zip(&self) -> Option<&str> {
        self.incident_zip.as_deref()
    }

    /// Incident street address.
    #[must_use]
    pub fn incident_address(&self) -> Option<&str> {
        self.incident_address.as_deref()
    }

    /// City.
    #[must_use]
    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    /// Borough.
    #[must_use]
    pub fn borough(&self) -> Option<&str> {
        self.borough.as_deref()
    }

    /// Raw latitude, possibly out of range.
    #[must_use]
    pub const fn latitude(&self) -> Option<f64> {
        self.latitude
    }

    /// Raw longitude, possibly out of range.
    #[must_use]
    pub const fn longitude(&self) -> Option<f64> {
        self.longitude
    }

    /// The validated location, or `None` if this record is not indexable.
    #[must_use]
    pub fn point(&self) -> Option<GeoPoint> {
        GeoPoint::new(self.latitude?, self.longitude?).ok()
    }

    /// Whether this record can take part in proximity queries.
    #[must_use]
    pub fn is_indexable(&self) -> bool {
        self.point().is_some()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 22, 15, 0).unwrap()
    }

    #[test]
    fn accepts_range_endpoints() {
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
        assert!(GeoPoint::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        let err = GeoPoint::new(200.0, 0.0).unwrap_err();
        assert_eq!(err.axis, Axis::Latitude);
        assert!(err.to_string().contains("latitude 200"));
    }

    #[test]
    fn rejects_non_finite_longitude() {
        let err = GeoPoint::new(0.0, f64::NAN).unwrap_err();
        assert_eq!(err.axis, Axis::Longitude);
        assert!(GeoPoint::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn deserializing_a_point_validates_it() {
        let point: GeoPoint =
            serde_json::from_str(r#"{"latitude":40.73,"longitude":-73.99}"#).unwrap();
        assert_eq!(point, GeoPoint::new(40.73, -73.99).unwrap());

        let err = serde_json::from_str::<GeoPoint>(r#"{"latitude":999.0,"longitude":-73.99}"#)
            .unwrap_err();
        assert!(err.to_string().contains("latitude 999"));
    }

    #[test]
    fn record_without_coordinates_is_not_indexable() {
        let record = ComplaintRecord::new("1", created());
        assert!(!record.is_indexable());

        let half = ComplaintRecord::new("2", created()).with_coordinates(Some(40.7), None);
        assert!(half.point().is_none());
    }

    #[test]
    fn record_with_bogus_latitude_keeps_raw_value() {
        let record = ComplaintRecord::new("3", created()).with_coordinates(Some(999.0), Some(-73.9));
        assert_eq!(record.latitude(), Some(999.0));
        assert!(!record.is_indexable());
    }

    #[test]
    fn serializes_camel_case_and_omits_missing_fields() {
        let record = ComplaintRecord::new("61234567", created())
            .with_complaint_type(Some("Noise - Residential".to_string()))
            .with_borough(Some("BROOKLYN".to_string()))
            .with_coordinates(Some(40.65), Some(-73.95));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "61234567");
        assert_eq!(json["complaintType"], "Noise - Residential");
        assert_eq!(json["borough"], "BROOKLYN");
        assert!(json.get("descriptor").is_none());
        assert!(json.get("createdAt").is_some());

        let back: ComplaintRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
