#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for dealer feed.
//!
//! Serves per-branch sheet data (sales, stock, service, enquiry, bookings)
//! straight from the branch spreadsheets, and accepts technician
//! productivity report PDFs whose rows are stored in `DuckDB`.

mod handlers;

use actix_web::{App, HttpServer, middleware, web};
use dealer_feed_ingest::IngestService;

/// Largest accepted report upload body.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Registers the `/api` routes on an app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
        .service(
            web::scope("/api")
                .route("/health", web::get().to(handlers::health))
                .route("/sheets/branches", web::get().to(handlers::branches))
                .route("/sheets/{resource}", web::get().to(handlers::domain_data))
                .route(
                    "/sheets/{resource}/values",
                    web::get().to(handlers::distinct_field_values),
                )
                .route("/service/reports", web::post().to(handlers::upload_report))
                .route("/service/reports", web::get().to(handlers::reports)),
        );
}

/// Starts the dealer feed API server.
///
/// Loads the branch registry, opens the report database, runs one
/// connectivity probe for logging, and starts the Actix-Web HTTP server.
/// The caller is responsible for providing the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the service cannot be built, or
/// the HTTP server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let service = IngestService::from_env().map_err(std::io::Error::other)?;

    if service.probe().await {
        log::info!("Spreadsheet host reachable");
    } else {
        log::warn!("Spreadsheet host unreachable at startup; reads will still be attempted");
    }

    let service = web::Data::new(service);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(service.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
