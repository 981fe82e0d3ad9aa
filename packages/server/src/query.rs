//! Point queries against the forecast index.

use accident_forecast_forecast::ForecastIndex;
use accident_forecast_server_models::{
    MISSING_FIELD_MESSAGE, OUT_OF_RANGE_MESSAGE, PredictionRequest,
};

/// Why a prediction request could not be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// `year` or `month` was not supplied.
    #[error("{}", MISSING_FIELD_MESSAGE)]
    MissingField,

    /// No prediction exists for the requested month. Covers months outside
    /// `1..=12` as well as months before or after the horizon.
    #[error("{}", OUT_OF_RANGE_MESSAGE)]
    OutOfRange,
}

/// Answers `request` from `index`, rounding the prediction to the nearest
/// integer with ties to even.
///
/// # Errors
///
/// * [`QueryError::MissingField`] if either field is absent. No lookup is
///   attempted.
/// * [`QueryError::OutOfRange`] if the month has no prediction.
pub fn query(index: &ForecastIndex, request: &PredictionRequest) -> Result<i64, QueryError> {
    let (Some(year), Some(month)) = (request.year, request.month) else {
        return Err(QueryError::MissingField);
    };

    let value = index.lookup(year, month).ok_or(QueryError::OutOfRange)?;

    #[allow(clippy::cast_possible_truncation)]
    let rounded = value.round_ties_even() as i64;
    Ok(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use accident_forecast_accident_models::{ForecastPoint, YearMonth};

    fn index(values: &[f64]) -> ForecastIndex {
        let mut month = YearMonth::new(2021, 1).unwrap();
        let mut points = Vec::new();
        for &predicted_value in values {
            points.push(ForecastPoint {
                timestamp: month.first_day(),
                predicted_value,
            });
            month = month.succ().unwrap();
        }
        ForecastIndex::new(points)
    }

    #[test]
    fn rounds_to_nearest_integer() {
        let index = index(&[30.4, 30.6, -2.7]);
        assert_eq!(query(&index, &PredictionRequest::new(2021, 1)), Ok(30));
        assert_eq!(query(&index, &PredictionRequest::new(2021, 2)), Ok(31));
        assert_eq!(query(&index, &PredictionRequest::new(2021, 3)), Ok(-3));
    }

    #[test]
    fn rounds_halves_to_even() {
        let index = index(&[30.5, 31.5]);
        assert_eq!(query(&index, &PredictionRequest::new(2021, 1)), Ok(30));
        assert_eq!(query(&index, &PredictionRequest::new(2021, 2)), Ok(32));
    }

    #[test]
    fn missing_field_wins_over_lookup() {
        let index = index(&[30.0]);
        let request = PredictionRequest {
            year: Some(2021),
            month: None,
        };
        assert_eq!(query(&index, &request), Err(QueryError::MissingField));
        assert_eq!(
            query(&index, &PredictionRequest::default()),
            Err(QueryError::MissingField)
        );
    }

    #[test]
    fn invalid_month_is_out_of_range() {
        let index = index(&[30.0; 12]);
        assert_eq!(
            query(&index, &PredictionRequest::new(2021, 13)),
            Err(QueryError::OutOfRange)
        );
        assert_eq!(
            query(&index, &PredictionRequest::new(2020, 12)),
            Err(QueryError::OutOfRange)
        );
    }

    #[test]
    fn error_messages_match_api_contract() {
        assert_eq!(
            QueryError::MissingField.to_string(),
            "Please provide 'year' and 'month'"
        );
        assert_eq!(QueryError::OutOfRange.to_string(), "Date not in forecast range");
    }
}
