//! Rendering of forecast and history listings.

use std::io::Write;

use accident_forecast_server_models::{ApiForecastPoint, ApiHistoryPoint};
use serde::Serialize;
use strum_macros::{Display, EnumString};

/// How listings are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    /// Aligned columns for reading in a terminal.
    #[default]
    Table,
    /// A pretty-printed JSON array.
    Json,
    /// Comma-separated values with a header row.
    Csv,
}

/// A listing row that can be rendered as a table line.
pub trait TableRow: Serialize {
    /// Column headers.
    const HEADERS: [&'static str; 3];

    /// Cell values in header order.
    fn cells(&self) -> [String; 3];
}

impl TableRow for ApiForecastPoint {
    const HEADERS: [&'static str; 3] = ["MONTH", "PREDICTED", "ROUNDED"];

    fn cells(&self) -> [String; 3] {
        [
            format!("{:04}-{:02}", self.year, self.month),
            format!("{:.3}", self.predicted_value),
            format!("{}", self.predicted_value.round_ties_even()),
        ]
    }
}

impl TableRow for ApiHistoryPoint {
    const HEADERS: [&'static str; 3] = ["MONTH", "VALUE", ""];

    fn cells(&self) -> [String; 3] {
        [
            format!("{:04}-{:02}", self.year, self.month),
            format!("{}", self.value),
            String::new(),
        ]
    }
}

/// Writes `rows` to `out` in `format`.
///
/// # Errors
///
/// Returns an error if writing or serialization fails.
pub fn write_rows<T: TableRow, W: Write>(
    mut out: W,
    rows: &[T],
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Table => write_table(out, rows)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, rows)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}

fn write_table<T: TableRow, W: Write>(mut out: W, rows: &[T]) -> std::io::Result<()> {
    let [a, b, c] = T::HEADERS;
    writeln!(out, "{a:<10} {b:>12} {c:>8}")?;
    writeln!(out, "{}", "-".repeat(32))?;
    for row in rows {
        let [a, b, c] = row.cells();
        writeln!(out, "{a:<10} {b:>12} {c:>8}")?;
    }
    writeln!(out, "\n{} month(s)", rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rows() -> Vec<ApiForecastPoint> {
        vec![
            ApiForecastPoint {
                year: 2021,
                month: 1,
                timestamp: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
                predicted_value: 30.5,
            },
            ApiForecastPoint {
                year: 2021,
                month: 2,
                timestamp: NaiveDate::from_ymd_opt(2021, 2, 1).unwrap(),
                predicted_value: 31.25,
            },
        ]
    }

    fn render(format: OutputFormat) -> String {
        let mut buf = Vec::new();
        write_rows(&mut buf, &rows(), format).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn parses_format_names() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!("yaml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::default().to_string(), "table");
    }

    #[test]
    fn table_shows_rounded_predictions() {
        let text = render(OutputFormat::Table);
        assert!(text.starts_with("MONTH"));
        assert!(text.contains("2021-01"));
        assert!(text.contains("30.500"));
        assert!(text.contains("2 month(s)"));
    }

    #[test]
    fn csv_has_header_and_one_line_per_row() {
        let text = render(OutputFormat::Csv);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "year,month,timestamp,predictedValue");
        assert_eq!(lines[1], "2021,1,2021-01-01,30.5");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn json_is_an_array() {
        let value: serde_json::Value = serde_json::from_str(&render(OutputFormat::Json)).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
        assert_eq!(value[1]["predictedValue"], 31.25);
    }
}
