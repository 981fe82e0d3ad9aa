#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the accident forecast server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the pipeline types to allow independent evolution of the API
//! contract.

use accident_forecast_accident_models::{ForecastPoint, TimeSeriesPoint};
use chrono::{Datelike as _, NaiveDate};
use serde::{Deserialize, Serialize};

/// Message returned when `year` or `month` is missing or malformed.
pub const MISSING_FIELD_MESSAGE: &str = "Please provide 'year' and 'month'";
/// Message returned when the requested month has no prediction.
pub const OUT_OF_RANGE_MESSAGE: &str = "Date not in forecast range";

/// Body of `POST /predict` and query of `GET /predict`.
///
/// Both fields are optional at the wire level so that a missing field can
/// be reported with a specific error instead of a generic parse failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Calendar year.
    #[serde(default)]
    pub year: Option<i64>,
    /// Calendar month, 1-12.
    #[serde(default)]
    pub month: Option<i64>,
}

impl PredictionRequest {
    /// A request with both fields present.
    #[must_use]
    pub const fn new(year: i64, month: i64) -> Self {
        Self {
            year: Some(year),
            month: Some(month),
        }
    }
}

/// Successful prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiPrediction {
    /// Predicted accident count, rounded to the nearest integer.
    pub prediction: i64,
}

/// Error body for client and server errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    /// Creates an error body with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// One month of the forecast as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiForecastPoint {
    /// Calendar year.
    pub year: i32,
    /// Calendar month, 1-12.
    pub month: u32,
    /// First day of the month.
    pub timestamp: NaiveDate,
    /// Unrounded model prediction.
    pub predicted_value: f64,
}

impl From<ForecastPoint> for ApiForecastPoint {
    fn from(point: ForecastPoint) -> Self {
        Self {
            year: point.timestamp.year(),
            month: point.timestamp.month(),
            timestamp: point.timestamp,
            predicted_value: point.predicted_value,
        }
    }
}

/// One observed month as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHistoryPoint {
    /// Calendar year.
    pub year: i32,
    /// Calendar month, 1-12.
    pub month: u32,
    /// First day of the month.
    pub timestamp: NaiveDate,
    /// Observed accident count.
    pub value: f64,
}

impl From<TimeSeriesPoint> for ApiHistoryPoint {
    fn from(point: TimeSeriesPoint) -> Self {
        Self {
            year: point.timestamp.year(),
            month: point.timestamp.month(),
            timestamp: point.timestamp,
            value: point.value,
        }
    }
}
