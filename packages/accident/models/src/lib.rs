#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Accident record, time series, and forecast point types.
//!
//! This crate defines the canonical shapes that flow through the forecasting
//! pipeline. Raw source rows are normalized into [`AccidentRecord`]s, one
//! category/subtype slice of those becomes a sequence of
//! [`TimeSeriesPoint`]s, and the fitted model produces [`ForecastPoint`]s.
//! All three are keyed on the calendar month via [`YearMonth`].

use std::fmt;

use chrono::{Datelike as _, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// A calendar month, stored as the first day of that month.
///
/// Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth(NaiveDate);

impl YearMonth {
    /// Creates a `YearMonth` from a year and a 1-based month.
    ///
    /// Returns `None` if `month` is not in `1..=12` or the year is outside
    /// the range `chrono` can represent.
    #[must_use]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    /// Returns the month containing `date`.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date - Days::new(u64::from(date.day0())))
    }

    /// The calendar year.
    #[must_use]
    pub fn year(self) -> i32 {
        self.0.year()
    }

    /// The 1-based calendar month.
    #[must_use]
    pub fn month(self) -> u32 {
        self.0.month()
    }

    /// The first day of this month.
    #[must_use]
    pub const fn first_day(self) -> NaiveDate {
        self.0
    }

    /// Returns the following month, or `None` past the end of the
    /// representable calendar.
    #[must_use]
    pub fn succ(self) -> Option<Self> {
        self.0.checked_add_months(Months::new(1)).map(Self)
    }

    /// Number of months from `self` to `later`. Negative when `later` is
    /// earlier.
    #[must_use]
    pub fn months_until(self, later: Self) -> i64 {
        (i64::from(later.year()) - i64::from(self.year())) * 12
            + (i64::from(later.month()) - i64::from(self.month()))
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl From<YearMonth> for NaiveDate {
    fn from(value: YearMonth) -> Self {
        value.first_day()
    }
}

/// One monthly accident count, normalized to the canonical schema.
///
/// Produced by the record normalizer. `month` is always a valid calendar
/// month; yearly-total rows never become records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccidentRecord {
    /// Accident category (e.g. `"Alkoholunfälle"`).
    pub category: String,
    /// Category subtype (e.g. `"insgesamt"`).
    pub subtype: String,
    /// Four-digit calendar year.
    pub year: i32,
    /// Calendar month, 1-12.
    pub month: u32,
    /// Number of accidents.
    pub value: f64,
}

impl AccidentRecord {
    /// The calendar month this record counts, or `None` if the year cannot
    /// be represented.
    #[must_use]
    pub fn year_month(&self) -> Option<YearMonth> {
        YearMonth::new(self.year, self.month)
    }
}

/// A single observation of the historical series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    /// First day of the observed month.
    pub timestamp: NaiveDate,
    /// Observed accident count.
    pub value: f64,
}

impl TimeSeriesPoint {
    /// The calendar month of this observation.
    #[must_use]
    pub fn year_month(&self) -> YearMonth {
        YearMonth::from_date(self.timestamp)
    }
}

/// A single predicted month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    /// First day of the predicted month.
    pub timestamp: NaiveDate,
    /// Unrounded model prediction.
    pub predicted_value: f64,
}

impl ForecastPoint {
    /// The calendar month of this prediction.
    #[must_use]
    pub fn year_month(&self) -> YearMonth {
        YearMonth::from_date(self.timestamp)
    }
}
