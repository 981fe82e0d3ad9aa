#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for accident forecasts.
//!
//! The forecast is built once before the server starts and moved into
//! shared, read-only application state. Handlers only ever read it, so no
//! locking is needed and requests never touch disk.

mod handlers;
pub mod query;

use accident_forecast_forecast::Forecast;
use accident_forecast_server_models::{ApiError, MISSING_FIELD_MESSAGE};
use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, error, middleware, web};

/// Default address to bind to when `BIND_ADDR` is unset.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
/// Default port when `PORT` is unset or unparseable.
pub const DEFAULT_PORT: u16 = 8080;

/// Shared application state.
pub struct AppState {
    /// The fitted forecast, including the history and model summary.
    pub forecast: Forecast,
}

/// Where the HTTP server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface address.
    pub bind_addr: String,
    /// TCP port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Reads `BIND_ADDR` and `PORT` from the environment, falling back to
    /// the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        Self { bind_addr, port }
    }
}

fn missing_field_response() -> HttpResponse {
    HttpResponse::BadRequest().json(ApiError::new(MISSING_FIELD_MESSAGE))
}

/// Registers every route along with the extractor settings they rely on.
///
/// Request bodies and query strings that fail to deserialize are answered
/// like a request with missing fields.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .content_type_required(false)
            .error_handler(|err, _req| {
                log::debug!("Malformed prediction body: {err}");
                error::InternalError::from_response(err, missing_field_response()).into()
            }),
    )
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        log::debug!("Malformed prediction query: {err}");
        error::InternalError::from_response(err, missing_field_response()).into()
    }))
    .route("/", web::get().to(handlers::index))
    .route("/predict", web::post().to(handlers::predict_json))
    .route("/predict", web::get().to(handlers::predict_query))
    .service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/forecast", web::get().to(handlers::forecast))
            .route("/history", web::get().to(handlers::history))
            .route("/model", web::get().to(handlers::model)),
    );
}

/// Serves `forecast` until the server is shut down.
///
/// This is a regular async function; the caller provides the runtime (e.g.
/// via `#[actix_web::main]`) and initializes logging.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(forecast: Forecast, config: &ServerConfig) -> std::io::Result<()> {
    let state = web::Data::new(AppState { forecast });

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
