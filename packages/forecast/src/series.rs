//! Builds the historical series for one category/subtype pair.

use accident_forecast_accident_models::{AccidentRecord, TimeSeriesPoint, YearMonth};

use crate::DataQualityError;

/// Chronologically ordered, duplicate-free monthly observations.
///
/// Never empty: [`build_series`] refuses to construct an empty series.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalSeries {
    points: Vec<TimeSeriesPoint>,
    first: YearMonth,
    last: YearMonth,
}

/// A run of missing months between two consecutive observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesGap {
    /// Last observed month before the gap.
    pub after: YearMonth,
    /// First observed month after the gap.
    pub before: YearMonth,
}

impl SeriesGap {
    /// Number of months with no observation.
    #[must_use]
    pub fn missing_months(&self) -> i64 {
        self.after.months_until(self.before) - 1
    }
}

impl HistoricalSeries {
    /// All observations, oldest first.
    #[must_use]
    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    /// Observed values in time order. Timestamps play no part in the model.
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether there are no observations. A series returned by
    /// [`build_series`] always has at least one.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Month of the oldest observation.
    #[must_use]
    pub const fn first_month(&self) -> YearMonth {
        self.first
    }

    /// Month of the newest observation.
    #[must_use]
    pub const fn last_month(&self) -> YearMonth {
        self.last
    }

    /// Places where consecutive observations are more than one month apart.
    #[must_use]
    pub fn gaps(&self) -> Vec<SeriesGap> {
        self.points
            .windows(2)
            .filter_map(|w| {
                let after = w[0].year_month();
                let before = w[1].year_month();
                (after.months_until(before) > 1).then_some(SeriesGap { after, before })
            })
            .collect()
    }
}

/// Filters `records` to an exact `category`/`subtype` match and orders them
/// into a [`HistoricalSeries`].
///
/// # Errors
///
/// * [`DataQualityError::EmptySeries`] if no record matches.
/// * [`DataQualityError::DuplicateTimestamp`] if two matching records fall
///   in the same month.
/// * [`DataQualityError::UnrepresentableDate`] if a record's year is outside
///   the supported calendar.
pub fn build_series(
    records: &[AccidentRecord],
    category: &str,
    subtype: &str,
) -> Result<HistoricalSeries, DataQualityError> {
    let mut points = Vec::new();

    for record in records
        .iter()
        .filter(|r| r.category == category && r.subtype == subtype)
    {
        let month = record
            .year_month()
            .ok_or(DataQualityError::UnrepresentableDate {
                year: record.year,
                month: record.month,
            })?;
        points.push(TimeSeriesPoint {
            timestamp: month.first_day(),
            value: record.value,
        });
    }

    points.sort_by_key(|p| p.timestamp);

    if let Some(dup) = points.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
        return Err(DataQualityError::DuplicateTimestamp {
            category: category.to_owned(),
            subtype: subtype.to_owned(),
            month: dup[0].year_month(),
        });
    }

    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Err(DataQualityError::EmptySeries {
            category: category.to_owned(),
            subtype: subtype.to_owned(),
        });
    };
    let (first, last) = (first.year_month(), last.year_month());

    Ok(HistoricalSeries {
        points,
        first,
        last,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(category: &str, subtype: &str, year: i32, month: u32, value: f64) -> AccidentRecord {
        AccidentRecord {
            category: category.to_string(),
            subtype: subtype.to_string(),
            year,
            month,
            value,
        }
    }

    #[test]
    fn filters_exact_category_and_subtype() {
        let records = vec![
            record("Alkoholunfälle", "insgesamt", 2020, 1, 28.0),
            record("Alkoholunfälle", "Verletzte und Getötete", 2020, 1, 10.0),
            record("alkoholunfälle", "insgesamt", 2020, 2, 99.0),
            record("Fluchtunfälle", "insgesamt", 2020, 1, 800.0),
        ];
        let series = build_series(&records, "Alkoholunfälle", "insgesamt").unwrap();
        assert_eq!(series.values(), vec![28.0]);
    }

    #[test]
    fn sorts_ascending_by_month() {
        let records = vec![
            record("A", "x", 2020, 3, 3.0),
            record("A", "x", 2019, 12, 0.0),
            record("A", "x", 2020, 1, 1.0),
            record("A", "x", 2020, 2, 2.0),
        ];
        let series = build_series(&records, "A", "x").unwrap();
        assert_eq!(series.values(), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(series.first_month(), YearMonth::new(2019, 12).unwrap());
        assert_eq!(series.last_month(), YearMonth::new(2020, 3).unwrap());
        assert!(series.points().iter().all(|p| p.timestamp.to_string().ends_with("-01")));
    }

    #[test]
    fn empty_selection_is_an_error() {
        let records = vec![record("A", "x", 2020, 1, 1.0)];
        let err = build_series(&records, "B", "x").unwrap_err();
        assert!(matches!(err, DataQualityError::EmptySeries { .. }));
    }

    #[test]
    fn duplicate_month_is_an_error() {
        let records = vec![
            record("A", "x", 2020, 1, 1.0),
            record("A", "x", 2020, 2, 2.0),
            record("A", "x", 2020, 1, 5.0),
        ];
        let err = build_series(&records, "A", "x").unwrap_err();
        match err {
            DataQualityError::DuplicateTimestamp { month, .. } => {
                assert_eq!(month, YearMonth::new(2020, 1).unwrap());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reports_gaps() {
        let records = vec![
            record("A", "x", 2020, 1, 1.0),
            record("A", "x", 2020, 2, 2.0),
            record("A", "x", 2020, 5, 5.0),
        ];
        let series = build_series(&records, "A", "x").unwrap();
        let gaps = series.gaps();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].after, YearMonth::new(2020, 2).unwrap());
        assert_eq!(gaps[0].missing_months(), 2);
    }

    #[test]
    fn contiguous_series_has_no_gaps() {
        let records: Vec<AccidentRecord> = (1..=12)
            .map(|m| record("A", "x", 2019, m, f64::from(m)))
            .collect();
        assert!(build_series(&records, "A", "x").unwrap().gaps().is_empty());
    }
}
