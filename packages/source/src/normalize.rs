//! Maps raw rows onto [`AccidentRecord`]s.

use accident_forecast_accident_models::AccidentRecord;
use accident_forecast_source_models::NormalizeConfig;
use serde_json::Value;

use crate::parsing::{MonthField, parse_count, parse_month, parse_year, value_as_text};

/// Normalized records plus a tally of what was dropped and why.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeReport {
    /// Records that survived normalization, in input order.
    pub records: Vec<AccidentRecord>,
    /// Yearly-total rows.
    pub dropped_aggregate: usize,
    /// Rows with a year past the cutoff.
    pub dropped_after_cutoff: usize,
    /// Rows with missing or uncoercible fields.
    pub dropped_malformed: usize,
}

impl NormalizeReport {
    /// Total number of rows dropped for any reason.
    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.dropped_aggregate + self.dropped_after_cutoff + self.dropped_malformed
    }
}

/// Why a single row did not become a record.
enum Rejection {
    Aggregate,
    AfterCutoff,
    Malformed,
}

/// Normalizes every row, returning the surviving records and drop counts.
#[must_use]
pub fn normalize_records(rows: &[Value], config: &NormalizeConfig) -> NormalizeReport {
    let mut report = NormalizeReport::default();

    for row in rows {
        match normalize_row(row, config) {
            Ok(record) => report.records.push(record),
            Err(Rejection::Aggregate) => report.dropped_aggregate += 1,
            Err(Rejection::AfterCutoff) => report.dropped_after_cutoff += 1,
            Err(Rejection::Malformed) => {
                log::trace!("Dropping malformed row: {row}");
                report.dropped_malformed += 1;
            }
        }
    }

    log::debug!(
        "Normalized {} of {} rows ({} totals, {} past cutoff, {} malformed)",
        report.records.len(),
        rows.len(),
        report.dropped_aggregate,
        report.dropped_after_cutoff,
        report.dropped_malformed,
    );

    report
}

fn normalize_row(row: &Value, config: &NormalizeConfig) -> Result<AccidentRecord, Rejection> {
    let fields = &config.fields;
    let field = |name: &str| row.get(name).filter(|v| !v.is_null());

    // The month check runs first so that total rows are counted as totals
    // even when their other fields are incomplete.
    let month_text = field(&fields.month)
        .and_then(value_as_text)
        .ok_or(Rejection::Malformed)?;
    let month = match parse_month(&month_text, &config.aggregate_token) {
        MonthField::Aggregate => return Err(Rejection::Aggregate),
        MonthField::Invalid => return Err(Rejection::Malformed),
        MonthField::Month(month) => month,
    };

    let year = field(&fields.year)
        .and_then(parse_year)
        .ok_or(Rejection::Malformed)?;
    if !config.accepts_year(year) {
        return Err(Rejection::AfterCutoff);
    }

    let value = field(&fields.value)
        .and_then(parse_count)
        .ok_or(Rejection::Malformed)?;

    let category = field(&fields.category)
        .and_then(value_as_text)
        .ok_or(Rejection::Malformed)?;
    let subtype = field(&fields.subtype)
        .and_then(value_as_text)
        .ok_or(Rejection::Malformed)?;

    Ok(AccidentRecord {
        category,
        subtype,
        year,
        month,
        value,
    })
}
