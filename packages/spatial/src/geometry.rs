//! Great-circle distance and degree/kilometre conversions.
//!
//! All math is done in `f64` on a sphere of radius [`EARTH_RADIUS_KM`].

use std::f64::consts::FRAC_PI_2;

use noise_map_complaint_models::GeoPoint;

/// Mean Earth radius (IUGG) in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Haversine great-circle distance between two points, in kilometres.
#[must_use]
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude().to_radians();
    let lat_b = b.latitude().to_radians();
    let d_lat = (b.latitude() - a.latitude()).to_radians();
    let d_lon = (b.longitude() - a.longitude()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    // Rounding can push `h` a hair above 1 for antipodal points.
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Angular radius in radians of a circle of `radius_km` on the sphere.
#[must_use]
pub fn angular_radius(radius_km: f64) -> f64 {
    radius_km / EARTH_RADIUS_KM
}

/// Latitude half-span in degrees covered by a circle of `radius_km`.
///
/// Exact on a sphere: moving due north or south by `radius_km` changes the
/// latitude by the angular radius.
#[must_use]
pub fn latitude_span_deg(radius_km: f64) -> f64 {
    angular_radius(radius_km).to_degrees()
}

/// Longitude half-span in degrees of the smallest longitude band that
/// contains every point within `radius_km` of a center at `center_lat`.
///
/// The span widens roughly as `1 / cos(center_lat)`. Returns `None` when the
/// circle reaches or contains a pole, in which case every longitude must be
/// covered.
#[must_use]
pub fn longitude_span_deg(center_lat: f64, radius_km: f64) -> Option<f64> {
    let delta = angular_radius(radius_km);
    let phi = center_lat.to_radians();

    if phi.abs() + delta >= FRAC_PI_2 {
        return None;
    }

    let ratio = delta.sin() / phi.cos();
    if ratio >= 1.0 {
        return None;
    }

    Some(ratio.asin().to_degrees())
}
