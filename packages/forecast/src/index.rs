//! Constant-time lookup of forecast values by calendar month.

use std::collections::HashMap;

use accident_forecast_accident_models::{ForecastPoint, YearMonth};

/// Immutable map from month to predicted value.
///
/// Built once from a forecast and only read afterwards, so it can be shared
/// freely between request handlers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastIndex {
    by_month: HashMap<YearMonth, f64>,
    points: Vec<ForecastPoint>,
}

impl ForecastIndex {
    /// Indexes `points` by month. If two points fall in the same month the
    /// first one wins.
    #[must_use]
    pub fn new(points: Vec<ForecastPoint>) -> Self {
        let mut by_month = HashMap::with_capacity(points.len());
        for point in &points {
            by_month
                .entry(point.year_month())
                .or_insert(point.predicted_value);
        }
        Self { by_month, points }
    }

    /// Looks up a prediction by raw year and month.
    ///
    /// Any integers are accepted. Months outside `1..=12` and years outside
    /// the supported calendar are simply absent.
    #[must_use]
    pub fn lookup(&self, year: i64, month: i64) -> Option<f64> {
        let year = i32::try_from(year).ok()?;
        let month = u32::try_from(month).ok()?;
        self.get(YearMonth::new(year, month)?)
    }

    /// Looks up a prediction by month.
    #[must_use]
    pub fn get(&self, month: YearMonth) -> Option<f64> {
        self.by_month.get(&month).copied()
    }

    /// Whether `month` has a prediction.
    #[must_use]
    pub fn contains(&self, month: YearMonth) -> bool {
        self.by_month.contains_key(&month)
    }

    /// Indexed months in chronological order.
    #[must_use]
    pub fn keys(&self) -> Vec<YearMonth> {
        let mut keys: Vec<YearMonth> = self.by_month.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// The forecast points the index was built from.
    #[must_use]
    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    /// Number of indexed months.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_month.len()
    }

    /// Whether the index has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_month.is_empty()
    }
}
