//! HTTP handler functions for the accident forecast API.

use accident_forecast_server_models::{
    ApiError, ApiForecastPoint, ApiHealth, ApiHistoryPoint, ApiPrediction, PredictionRequest,
};
use actix_web::{HttpResponse, web};

use crate::AppState;
use crate::query::query;

const USAGE: &str = "Accident forecast service.\n\
\n\
POST /predict with a JSON body {\"year\": 2021, \"month\": 1}\n\
GET  /predict?year=2021&month=1\n\
GET  /api/forecast, /api/history, /api/model, /api/health\n";

/// `GET /`
///
/// Liveness probe with a short usage note.
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(USAGE)
}

/// `POST /predict`
pub async fn predict_json(
    state: web::Data<AppState>,
    body: web::Json<PredictionRequest>,
) -> HttpResponse {
    predict(&state, &body)
}

/// `GET /predict`
pub async fn predict_query(
    state: web::Data<AppState>,
    params: web::Query<PredictionRequest>,
) -> HttpResponse {
    predict(&state, &params)
}

fn predict(state: &AppState, request: &PredictionRequest) -> HttpResponse {
    match query(&state.forecast.index, request) {
        Ok(prediction) => HttpResponse::Ok().json(ApiPrediction { prediction }),
        Err(e) => {
            log::debug!("Rejected prediction request {request:?}: {e}");
            HttpResponse::BadRequest().json(ApiError::new(e.to_string()))
        }
    }
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/forecast`
///
/// Every forecast month, oldest first.
pub async fn forecast(state: web::Data<AppState>) -> HttpResponse {
    let points: Vec<ApiForecastPoint> = state
        .forecast
        .index
        .points()
        .iter()
        .copied()
        .map(ApiForecastPoint::from)
        .collect();
    HttpResponse::Ok().json(points)
}

/// `GET /api/history`
///
/// The observed series the model was fitted to.
pub async fn history(state: web::Data<AppState>) -> HttpResponse {
    let points: Vec<ApiHistoryPoint> = state
        .forecast
        .series
        .points()
        .iter()
        .copied()
        .map(ApiHistoryPoint::from)
        .collect();
    HttpResponse::Ok().json(points)
}

/// `GET /api/model`
pub async fn model(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(&state.forecast.model)
}
