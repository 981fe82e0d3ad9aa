#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Forecast pipeline for monthly accident counts.
//!
//! Turns normalized [`AccidentRecord`]s into a queryable [`ForecastIndex`]:
//!
//! 1. [`series::build_series`] isolates one category/subtype series.
//! 2. [`arima::ArimaModel`] fits an ARIMA model to its values.
//! 3. The fitted model forecasts the configured horizon, timestamped with
//!    the months following the last observation.
//! 4. [`index::ForecastIndex`] indexes those predictions by month.
//!
//! [`build_forecast`] runs all four steps and also keeps the series and the
//! model summary for reporting.

pub mod arima;
pub mod config;
pub mod index;
pub mod optimize;
pub mod series;

use accident_forecast_accident_models::{AccidentRecord, ForecastPoint, YearMonth};
use accident_forecast_forecast_models::{ForecastConfig, ModelConfig, ModelSummary};
use accident_forecast_source::normalize::normalize_records;
use accident_forecast_source::{RecordSource, SourceError};

use crate::arima::ArimaModel;
pub use crate::index::ForecastIndex;
use crate::series::{HistoricalSeries, build_series};

/// Problems with the data itself that make a forecast impossible.
#[derive(Debug, thiserror::Error)]
pub enum DataQualityError {
    /// No record matched the requested series.
    #[error("No records for category {category:?} / subtype {subtype:?}")]
    EmptySeries {
        /// Requested category.
        category: String,
        /// Requested subtype.
        subtype: String,
    },

    /// Two records of the series fall in the same month.
    #[error("Duplicate observation for {month} in {category:?} / {subtype:?}")]
    DuplicateTimestamp {
        /// Requested category.
        category: String,
        /// Requested subtype.
        subtype: String,
        /// Month that occurs more than once.
        month: YearMonth,
    },

    /// A record's year cannot be represented as a calendar date.
    #[error("Cannot represent {year}-{month:02} as a date")]
    UnrepresentableDate {
        /// Record year.
        year: i32,
        /// Record month.
        month: u32,
    },
}

/// Reasons an ARIMA model could not be fitted.
#[derive(Debug, thiserror::Error)]
pub enum ModelFitError {
    /// Too few observations for the requested order.
    #[error("Series has {observations} observations, at least {required} required")]
    InsufficientData {
        /// Observations supplied.
        observations: usize,
        /// Minimum for the order.
        required: usize,
    },

    /// The series contains NaN or infinity.
    #[error("Series value at position {index} is not finite")]
    NonFiniteValue {
        /// Position of the first offending value.
        index: usize,
    },

    /// The likelihood is undefined for this series.
    #[error("Degenerate series: {reason}")]
    Degenerate {
        /// Details.
        reason: String,
    },

    /// The optimizer ran out of iterations.
    #[error("Likelihood optimization did not converge after {iterations} iterations")]
    DidNotConverge {
        /// Iterations performed.
        iterations: usize,
    },
}

/// Any failure while building a forecast.
#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    /// Reading raw rows failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The data cannot be modelled.
    #[error(transparent)]
    DataQuality(#[from] DataQualityError),

    /// Model fitting failed.
    #[error(transparent)]
    ModelFit(#[from] ModelFitError),

    /// The forecast runs past the end of the representable calendar.
    #[error("Forecast horizon runs past the representable calendar after {last}")]
    CalendarOverflow {
        /// Last month that could be represented.
        last: YearMonth,
    },
}

/// Everything produced by one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    /// The modelled historical series.
    pub series: HistoricalSeries,
    /// The fitted model.
    pub model: ModelSummary,
    /// Predictions indexed by month.
    pub index: ForecastIndex,
}

/// Returns `count` consecutive months starting the month after `last`.
///
/// # Errors
///
/// Returns [`ForecastError::CalendarOverflow`] if a month cannot be
/// represented.
pub fn forecast_months(last: YearMonth, count: usize) -> Result<Vec<YearMonth>, ForecastError> {
    let mut months = Vec::new();
    let mut current = last;
    for _ in 0..count {
        current = current
            .succ()
            .ok_or(ForecastError::CalendarOverflow { last: current })?;
        months.push(current);
    }
    Ok(months)
}

/// Fits `model` to `series` and returns the timestamped forecast along with
/// the model summary.
///
/// Forecast months continue monthly from the last observation, whether or
/// not the history has gaps.
///
/// # Errors
///
/// Returns [`ForecastError`] if the model cannot be fitted or the horizon
/// overflows the calendar.
pub fn forecast_series(
    series: &HistoricalSeries,
    model: &ModelConfig,
) -> Result<(Vec<ForecastPoint>, ModelSummary), ForecastError> {
    let fitted = ArimaModel::new(model).fit(&series.values())?;
    let summary = fitted.summary();

    log::info!(
        "Fitted {} on {} observations: ar={:?} ma={:?} sigma2={:.4} aic={:.2} bic={:.2} ({} iterations)",
        summary.order,
        summary.observations,
        summary.ar_coefficients,
        summary.ma_coefficients,
        summary.sigma2,
        summary.aic,
        summary.bic,
        summary.iterations,
    );

    let months = forecast_months(series.last_month(), model.horizon)?;
    let points = months
        .into_iter()
        .zip(fitted.forecast(model.horizon))
        .map(|(month, predicted_value)| ForecastPoint {
            timestamp: month.first_day(),
            predicted_value,
        })
        .collect();

    Ok((points, summary))
}

/// Runs the pipeline from normalized records to a [`Forecast`].
///
/// # Errors
///
/// Returns [`ForecastError`] if the series is empty or has duplicate months,
/// or if the model cannot be fitted.
pub fn build_forecast(
    records: &[AccidentRecord],
    config: &ForecastConfig,
) -> Result<Forecast, ForecastError> {
    let selector = &config.series;
    let series = build_series(records, &selector.category, &selector.subtype)?;

    log::info!(
        "Series {} / {}: {} observations from {} to {}",
        selector.category,
        selector.subtype,
        series.len(),
        series.first_month(),
        series.last_month(),
    );
    for gap in series.gaps() {
        log::warn!(
            "Series has {} missing month(s) between {} and {}",
            gap.missing_months(),
            gap.after,
            gap.before,
        );
    }

    let (points, model) = forecast_series(&series, &config.model)?;
    let index = ForecastIndex::new(points);

    if let (Some(first), Some(last)) = (index.points().first(), index.points().last()) {
        log::info!(
            "Forecast {} months from {} to {}",
            index.len(),
            first.year_month(),
            last.year_month(),
        );
    }

    Ok(Forecast {
        series,
        model,
        index,
    })
}

/// Runs the pipeline and returns only the index.
///
/// # Errors
///
/// See [`build_forecast`].
pub fn build_forecast_index(
    records: &[AccidentRecord],
    config: &ForecastConfig,
) -> Result<ForecastIndex, ForecastError> {
    build_forecast(records, config).map(|forecast| forecast.index)
}

/// Reads `source`, normalizes its rows, and runs the pipeline.
///
/// # Errors
///
/// Returns [`ForecastError`] if the source cannot be read or any pipeline
/// step fails.
pub fn load_forecast(
    source: &dyn RecordSource,
    config: &ForecastConfig,
) -> Result<Forecast, ForecastError> {
    let rows = source.rows()?;
    log::info!("Read {} rows from {}", rows.len(), source.id());

    let report = normalize_records(&rows, &config.source);
    if report.dropped() > 0 {
        log::info!(
            "Dropped {} rows ({} yearly totals, {} after cutoff, {} malformed)",
            report.dropped(),
            report.dropped_aggregate,
            report.dropped_after_cutoff,
            report.dropped_malformed,
        );
    }
    if report.dropped_malformed > 0 {
        log::warn!(
            "{} rows from {} could not be parsed",
            report.dropped_malformed,
            source.id()
        );
    }

    build_forecast(&report.records, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use accident_forecast_source::InMemorySource;
    use serde_json::{Value, json};

    /// A deterministic, wiggly monthly series for 2000-01..=2020-12.
    fn monthly_records() -> Vec<AccidentRecord> {
        let mut records = Vec::new();
        let mut level = 40.0;
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        for year in 2000..=2020 {
            for month in 1..=12 {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                #[allow(clippy::cast_precision_loss)]
                let shock = (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5;
                level += 4.0 * shock;
                records.push(AccidentRecord {
                    category: "Alkoholunfälle".to_string(),
                    subtype: "insgesamt".to_string(),
                    year,
                    month,
                    value: level,
                });
            }
        }
        records
    }

    fn raw_rows() -> Vec<Value> {
        let mut rows: Vec<Value> = monthly_records()
            .into_iter()
            .map(|r| {
                json!({
                    "MONATSZAHL": r.category,
                    "AUSPRAEGUNG": r.subtype,
                    "JAHR": r.year.to_string(),
                    "MONAT": format!("{}{:02}", r.year, r.month),
                    "WERT": r.value.to_string(),
                })
            })
            .collect();
        rows.push(json!({
            "MONATSZAHL": "Alkoholunfälle",
            "AUSPRAEGUNG": "insgesamt",
            "JAHR": "2020",
            "MONAT": "Summe",
            "WERT": "500",
        }));
        rows.push(json!({
            "MONATSZAHL": "Alkoholunfälle",
            "AUSPRAEGUNG": "insgesamt",
            "JAHR": "2021",
            "MONAT": "202101",
            "WERT": "40",
        }));
        rows.push(json!({
            "MONATSZAHL": "Fluchtunfälle",
            "AUSPRAEGUNG": "insgesamt",
            "JAHR": "2020",
            "MONAT": "202001",
            "WERT": "800",
        }));
        rows
    }

    #[test]
    fn forecast_months_continue_after_last() {
        let months = forecast_months(YearMonth::new(2020, 11).unwrap(), 3).unwrap();
        assert_eq!(
            months,
            vec![
                YearMonth::new(2020, 12).unwrap(),
                YearMonth::new(2021, 1).unwrap(),
                YearMonth::new(2021, 2).unwrap(),
            ]
        );
    }

    #[test]
    fn calendar_overflow_is_an_error() {
        let err = forecast_months(YearMonth::new(2020, 12).unwrap(), usize::MAX / 2).unwrap_err();
        assert!(matches!(err, ForecastError::CalendarOverflow { .. }));
    }

    #[test]
    fn forecast_continues_from_last_month_despite_gaps() {
        let records: Vec<AccidentRecord> = monthly_records()
            .into_iter()
            .filter(|r| !(r.year == 2015 && (3..=8).contains(&r.month)))
            .collect();
        let forecast = build_forecast(&records, &ForecastConfig::default()).unwrap();

        assert_eq!(forecast.series.len(), 246);
        assert_eq!(forecast.series.gaps().len(), 1);
        let keys = forecast.index.keys();
        assert_eq!(keys.len(), 60);
        assert_eq!(keys.first(), Some(&YearMonth::new(2021, 1).unwrap()));
        assert_eq!(keys.last(), Some(&YearMonth::new(2025, 12).unwrap()));
    }

    #[test]
    fn index_covers_sixty_months_after_december_2020() {
        let index =
            build_forecast_index(&monthly_records(), &ForecastConfig::default()).unwrap();

        assert_eq!(index.len(), 60);
        assert!(index.lookup(2021, 1).is_some());
        assert!(index.lookup(2025, 12).is_some());
        assert!(index.lookup(2026, 1).is_none());
        assert!(index.lookup(2020, 12).is_none());
        assert!(index.lookup(2021, 13).is_none());
    }

    #[test]
    fn forecast_timestamps_are_contiguous_and_unique() {
        let index =
            build_forecast_index(&monthly_records(), &ForecastConfig::default()).unwrap();
        let keys = index.keys();
        assert_eq!(keys.len(), 60);
        for pair in keys.windows(2) {
            assert_eq!(pair[0].succ(), Some(pair[1]));
        }
        let stamps: Vec<_> = index.points().iter().map(|p| p.timestamp).collect();
        let from_keys: Vec<_> = keys.iter().map(|k| k.first_day()).collect();
        assert_eq!(stamps, from_keys);
    }

    #[test]
    fn rebuilding_is_bit_identical() {
        let records = monthly_records();
        let config = ForecastConfig::default();
        let a = build_forecast(&records, &config).unwrap();
        let b = build_forecast(&records, &config).unwrap();
        let bits = |f: &Forecast| {
            f.index
                .points()
                .iter()
                .map(|p| p.predicted_value.to_bits())
                .collect::<Vec<_>>()
        };
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn loads_from_raw_rows() {
        let source = InMemorySource::new("fixture", raw_rows());
        let forecast = load_forecast(&source, &ForecastConfig::default()).unwrap();

        assert_eq!(forecast.series.len(), 252);
        assert_eq!(forecast.series.last_month(), YearMonth::new(2020, 12).unwrap());
        assert_eq!(forecast.model.order.to_string(), "ARIMA(1,1,1)");
        assert!(forecast.index.lookup(2021, 1).is_some());
    }

    #[test]
    fn horizon_follows_config() {
        let mut config = ForecastConfig::default();
        config.model.horizon = 12;
        let index = build_forecast_index(&monthly_records(), &config).unwrap();
        assert_eq!(index.len(), 12);
        assert!(index.lookup(2021, 12).is_some());
        assert!(index.lookup(2022, 1).is_none());
    }

    #[test]
    fn unknown_series_is_a_data_quality_error() {
        let mut config = ForecastConfig::default();
        config.series.category = "Verkehrsunfälle".to_string();
        let err = build_forecast(&monthly_records(), &config).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::DataQuality(DataQualityError::EmptySeries { .. })
        ));
    }

    #[test]
    fn duplicate_months_are_fatal() {
        let mut records = monthly_records();
        records.push(records[0].clone());
        let err = build_forecast(&records, &ForecastConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::DataQuality(DataQualityError::DuplicateTimestamp { .. })
        ));
    }

    #[test]
    fn too_short_series_is_a_fit_error() {
        let records: Vec<AccidentRecord> = monthly_records().into_iter().take(3).collect();
        let err = build_forecast(&records, &ForecastConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::ModelFit(ModelFitError::InsufficientData { .. })
        ));
    }
}
