#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for noise complaint proximity queries.
//!
//! On startup the raw 311 download is decoded, loaded into the in-memory
//! record store and proximity index, and served from `GET /api/near`. The
//! index is rebuilt from scratch on every start; nothing is persisted.

pub mod config;
mod handlers;

use std::path::Path;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, error, middleware, web};
use noise_map_server_models::ApiError;
use noise_map_source::registry::{DEFAULT_SOURCE_ID, find_source};
use noise_map_source::{ComplaintSource, SourceError};
use noise_map_spatial::SpatialError;
use noise_map_store::service::ComplaintService;

use crate::config::{ConfigError, ServerConfig};

/// Shared application state.
pub struct AppState {
    /// Record store and proximity index.
    pub service: ComplaintService,
    /// Upper bound applied to every query's result count.
    pub max_results: Option<usize>,
}

/// Errors that can stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Invalid environment configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Invalid grid settings.
    #[error(transparent)]
    Spatial(#[from] SpatialError),

    /// The data file could not be read.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The default source definition is missing.
    #[error("No source definition registered as {0}")]
    MissingSource(&'static str),
}

/// Builds the query service and loads `data_path` into it if it exists.
///
/// A missing data file is not an error: the server starts empty and logs a
/// warning.
///
/// # Errors
///
/// Returns [`StartupError`] if the grid config is invalid or the data file
/// exists but cannot be decoded.
pub fn load_service(config: &ServerConfig) -> Result<ComplaintService, StartupError> {
    let service = ComplaintService::new(config.grid)?;
    load_into(&service, &config.data_path)?;
    Ok(service)
}

fn load_into(service: &ComplaintService, data_path: &Path) -> Result<(), StartupError> {
    if !data_path.exists() {
        log::warn!(
            "Data file {} not found; starting with an empty index (run `noise_map_ingest fetch` first)",
            data_path.display()
        );
        return Ok(());
    }

    let source =
        find_source(DEFAULT_SOURCE_ID).ok_or(StartupError::MissingSource(DEFAULT_SOURCE_ID))?;
    log::info!("Loading {} from {}", source.name(), data_path.display());
    let records = source.load(data_path)?;
    service.load(records);
    Ok(())
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        error::InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(ApiError::new(message)),
        )
        .into()
    }))
    .service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/stats", web::get().to(handlers::stats))
            .route("/near", web::get().to(handlers::near)),
    );
}

/// Starts the noise map API server.
///
/// Reads [`ServerConfig`] from the environment, loads the data file, and
/// starts the Actix-Web HTTP server. The caller is responsible for
/// providing the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if configuration or loading fails, or
/// if the HTTP server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = ServerConfig::from_env().map_err(std::io::Error::other)?;

    log::info!("Building complaint index...");
    let service = load_service(&config).map_err(std::io::Error::other)?;
    let stats = service.stats();
    log::info!(
        "Serving {} complaints ({} indexed in {} cells)",
        stats.records,
        stats.indexed,
        stats.cells
    );

    let state = web::Data::new(AppState {
        service,
        max_results: config.max_results,
    });

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use chrono::{TimeZone as _, Utc};
    use noise_map_complaint_models::ComplaintRecord;
    use noise_map_server_models::{ApiComplaint, ApiStats};

    use super::*;

    fn state(max_results: Option<usize>) -> web::Data<AppState> {
        let service = ComplaintService::default();
        let day = |d| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap();
        service.load(vec![
            ComplaintRecord::new("A", day(2)).with_coordinates(Some(40.73), Some(-73.99)),
            ComplaintRecord::new("B", day(1)).with_coordinates(Some(40.731), Some(-73.991)),
            ComplaintRecord::new("C", day(3)).with_coordinates(Some(41.90), Some(-87.62)),
            ComplaintRecord::new("X", day(4)).with_coordinates(Some(999.0), Some(-73.99)),
        ]);
        web::Data::new(AppState {
            service,
            max_results,
        })
    }

    fn ids(body: &[ApiComplaint]) -> Vec<&str> {
        body.iter().map(|c| c.id.as_str()).collect()
    }

    #[actix_web::test]
    async fn near_returns_newest_first() {
        let app =
            test::init_service(App::new().app_data(state(None)).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/api/near?lon=-73.99&lat=40.73&distanceInKm=2000")
            .to_request();
        let body: Vec<ApiComplaint> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(ids(&body), vec!["C", "A", "B"]);

        let req = test::TestRequest::get()
            .uri("/api/near?lon=-73.99&lat=40.73&distanceInKm=1")
            .to_request();
        let body: Vec<ApiComplaint> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(ids(&body), vec!["A", "B"]);

        let req = test::TestRequest::get()
            .uri("/api/near?longitude=-73.99&latitude=40.73&distanceInKm=1")
            .to_request();
        let body: Vec<ApiComplaint> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(ids(&body), vec!["A", "B"]);
    }

    #[actix_web::test]
    async fn near_applies_requested_and_server_limits() {
        let app =
            test::init_service(App::new().app_data(state(Some(2))).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/api/near?lon=-73.99&lat=40.73&distanceInKm=2000")
            .to_request();
        let body: Vec<ApiComplaint> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(ids(&body), vec!["C", "A"]);

        let req = test::TestRequest::get()
            .uri("/api/near?lon=-73.99&lat=40.73&distanceInKm=2000&limit=1")
            .to_request();
        let body: Vec<ApiComplaint> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(ids(&body), vec!["C"]);
    }

    #[actix_web::test]
    async fn near_with_no_matches_is_an_empty_array() {
        let app =
            test::init_service(App::new().app_data(state(None)).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/api/near?lon=-40&lat=30&distanceInKm=1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Vec<ApiComplaint> = test::read_body_json(resp).await;
        assert!(body.is_empty());
    }

    #[actix_web::test]
    async fn near_rejects_bad_parameters() {
        let app =
            test::init_service(App::new().app_data(state(None)).configure(configure)).await;

        for uri in [
            "/api/near?lon=-73.99&lat=200&distanceInKm=1",
            "/api/near?lon=-73.99&lat=40.73&distanceInKm=0",
            "/api/near?lon=-73.99&lat=40.73&distanceInKm=-3",
            "/api/near?lon=-73.99&lat=40.73&distanceInKm=1&limit=0",
            "/api/near?lon=-73.99&lat=40.73",
            "/api/near?lon=west&lat=40.73&distanceInKm=1",
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
            let body: ApiError = test::read_body_json(resp).await;
            assert!(!body.error.is_empty(), "{uri}");
        }
    }

    #[actix_web::test]
    async fn stats_and_health() {
        let app =
            test::init_service(App::new().app_data(state(None)).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/stats").to_request();
        let stats: ApiStats = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stats.records, 4);
        assert_eq!(stats.indexed, 3);

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[::core::prelude::v1::test]
    fn missing_data_file_starts_empty() {
        let config = ServerConfig {
            data_path: std::env::temp_dir().join("noise_map_server_missing.json"),
            ..ServerConfig::default()
        };
        let service = load_service(&config).unwrap();
        assert_eq!(service.stats().records, 0);
    }

    #[::core::prelude::v1::test]
    fn loads_existing_data_file() {
        let dir = std::env::temp_dir().join("noise_map_server_load");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rows.json");
        std::fs::write(
            &path,
            r#"[{"unique_key": "1", "created_date": "2024-06-01T10:00:00.000", "latitude": "40.7", "longitude": "-73.9"}]"#,
        )
        .unwrap();

        let config = ServerConfig {
            data_path: path,
            ..ServerConfig::default()
        };
        let service = load_service(&config).unwrap();
        assert_eq!(service.stats().indexed, 1);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
