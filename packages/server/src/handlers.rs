//! HTTP handler functions for the noise map API.

use actix_web::{HttpResponse, web};
use noise_map_complaint_models::{validate_latitude, validate_longitude};
use noise_map_server_models::{ApiComplaint, ApiError, ApiHealth, ApiStats, NearQueryParams};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/stats`
///
/// Returns the number of stored and indexed complaints.
pub async fn stats(state: web::Data<AppState>) -> HttpResponse {
    let stats = state.service.stats();
    HttpResponse::Ok().json(ApiStats {
        records: stats.records,
        indexed: stats.indexed,
        cells: stats.cells,
    })
}

/// `GET /api/near?lon=..&lat=..&distanceInKm=..[&limit=..]`
///
/// Returns complaints within the radius, newest first.
pub async fn near(state: web::Data<AppState>, params: web::Query<NearQueryParams>) -> HttpResponse {
    if let Err(message) = validate_near(&params) {
        return HttpResponse::BadRequest().json(ApiError::new(message));
    }

    let limit = match (params.limit, state.max_results) {
        (Some(requested), Some(max)) => Some(requested.min(max)),
        (requested, max) => requested.or(max),
    };

    match state
        .service
        .find_near(params.lat, params.lon, params.distance_in_km, limit)
    {
        Ok(records) => {
            let body: Vec<ApiComplaint> = records
                .iter()
                .map(|record| ApiComplaint::from(record.as_ref()))
                .collect();
            HttpResponse::Ok().json(body)
        }
        Err(e) => {
            log::warn!("Rejected near query {params:?}: {e}");
            HttpResponse::BadRequest().json(ApiError::new(e.to_string()))
        }
    }
}

/// Rejects out-of-range parameters before they reach the query service.
fn validate_near(params: &NearQueryParams) -> Result<(), String> {
    validate_latitude(params.lat).map_err(|e| e.to_string())?;
    validate_longitude(params.lon).map_err(|e| e.to_string())?;

    if !(params.distance_in_km.is_finite() && params.distance_in_km > 0.0) {
        return Err(format!(
            "invalid distanceInKm {}: expected a positive distance",
            params.distance_in_km
        ));
    }
    if params.limit == Some(0) {
        return Err("invalid limit 0: expected at least 1".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(lat: f64, lon: f64, distance_in_km: f64, limit: Option<usize>) -> NearQueryParams {
        NearQueryParams {
            lon,
            lat,
            distance_in_km,
            limit,
        }
    }

    #[test]
    fn accepts_valid_parameters() {
        assert!(validate_near(&params(40.73, -73.99, 1.0, None)).is_ok());
        assert!(validate_near(&params(-90.0, 180.0, 0.001, Some(1))).is_ok());
    }

    #[test]
    fn rejects_out_of_range_center() {
        let err = validate_near(&params(200.0, -73.99, 1.0, None)).unwrap_err();
        assert!(err.contains("latitude"));
        let err = validate_near(&params(40.0, -200.0, 1.0, None)).unwrap_err();
        assert!(err.contains("longitude"));
    }

    #[test]
    fn rejects_non_positive_distance_and_zero_limit() {
        assert!(validate_near(&params(40.0, -73.0, 0.0, None)).is_err());
        assert!(validate_near(&params(40.0, -73.0, -2.0, None)).is_err());
        assert!(validate_near(&params(40.0, -73.0, 1.0, Some(0))).is_err());
    }
}
