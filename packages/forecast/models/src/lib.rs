#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Forecast pipeline configuration and fitted model summary types.
//!
//! [`ForecastConfig`] is the single configuration document for the whole
//! pipeline: how raw rows are normalized, which series is modelled, and how
//! the ARIMA model is fitted. Every section defaults to the values used for
//! the monthly alcohol-related accident series, so an empty TOML file is a
//! valid configuration.

use std::fmt;

use accident_forecast_source_models::NormalizeConfig;
use serde::{Deserialize, Serialize};

/// Default accident category to model.
pub const DEFAULT_CATEGORY: &str = "Alkoholunfälle";
/// Default subtype to model.
pub const DEFAULT_SUBTYPE: &str = "insgesamt";
/// Default number of months to forecast.
pub const DEFAULT_HORIZON: usize = 60;

/// ARIMA model order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ArimaOrder {
    /// Number of autoregressive lags.
    pub p: usize,
    /// Number of differencing passes.
    pub d: usize,
    /// Number of moving-average lags.
    pub q: usize,
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self { p: 1, d: 1, q: 1 }
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

impl ArimaOrder {
    /// Shortest series this order can be fitted to.
    ///
    /// One observation per differencing pass and per coefficient, plus one
    /// for the innovation variance, and never fewer than three.
    #[must_use]
    pub const fn min_observations(&self) -> usize {
        let required = self.d + self.p + self.q + 1;
        if required < 3 { 3 } else { required }
    }
}

/// Which category/subtype pair to model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesSelector {
    /// Exact category label.
    pub category: String,
    /// Exact subtype label.
    pub subtype: String,
}

impl Default for SeriesSelector {
    fn default() -> Self {
        Self {
            category: DEFAULT_CATEGORY.to_string(),
            subtype: DEFAULT_SUBTYPE.to_string(),
        }
    }
}

/// Model fitting and forecasting settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// ARIMA order.
    pub order: ArimaOrder,
    /// Number of months to forecast.
    pub horizon: usize,
    /// Iteration budget for the likelihood optimizer.
    pub max_iterations: usize,
    /// Convergence tolerance on the spread of objective values across the
    /// optimizer's simplex.
    pub tolerance: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            order: ArimaOrder::default(),
            horizon: DEFAULT_HORIZON,
            max_iterations: 5_000,
            tolerance: 1e-9,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Raw row normalization.
    pub source: NormalizeConfig,
    /// Series selection.
    pub series: SeriesSelector,
    /// Model settings.
    pub model: ModelConfig,
}

/// Summary of a fitted ARIMA model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    /// Fitted order.
    pub order: ArimaOrder,
    /// Autoregressive coefficients, lag 1 first.
    pub ar_coefficients: Vec<f64>,
    /// Moving-average coefficients, lag 1 first.
    pub ma_coefficients: Vec<f64>,
    /// Mean of the (undifferenced) series, only estimated when `d == 0`.
    pub mean: Option<f64>,
    /// Innovation variance.
    pub sigma2: f64,
    /// Maximised log-likelihood.
    pub log_likelihood: f64,
    /// Akaike information criterion.
    pub aic: f64,
    /// Bayesian information criterion.
    pub bic: f64,
    /// Observations used after differencing.
    pub observations: usize,
    /// Optimizer iterations taken.
    pub iterations: usize,
}
