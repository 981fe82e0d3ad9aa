#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Accident record sources and normalization logic.
//!
//! A [`RecordSource`] hands out raw rows as JSON objects keyed by source
//! column name. [`normalize::normalize_records`] maps those rows onto the
//! canonical [`AccidentRecord`](accident_forecast_accident_models::AccidentRecord)
//! shape, dropping yearly totals, rows past the year cutoff, and rows that
//! fail numeric coercion.

pub mod csv_file;
pub mod normalize;
pub mod parsing;

/// Errors that can occur while reading raw rows.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The file has no header row.
    #[error("Source {source_id} has no header row")]
    MissingHeader {
        /// Identifier of the offending source.
        source_id: String,
    },
}

/// Anything that can produce raw accident rows.
///
/// Each row is a JSON object mapping source column names to raw values.
/// Values may be strings or numbers; the normalizer coerces both.
pub trait RecordSource {
    /// Returns a short identifier for log messages (e.g. a file path).
    fn id(&self) -> &str;

    /// Reads every row from the source.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the underlying data cannot be read.
    fn rows(&self) -> Result<Vec<serde_json::Value>, SourceError>;
}

/// A source backed by rows that are already in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    id: String,
    rows: Vec<serde_json::Value>,
}

impl InMemorySource {
    /// Wraps pre-built rows.
    #[must_use]
    pub fn new(id: &str, rows: Vec<serde_json::Value>) -> Self {
        Self {
            id: id.to_owned(),
            rows,
        }
    }
}

impl RecordSource for InMemorySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn rows(&self) -> Result<Vec<serde_json::Value>, SourceError> {
        Ok(self.rows.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_source_returns_rows() {
        let source = InMemorySource::new("fixture", vec![serde_json::json!({"JAHR": 2020})]);
        assert_eq!(source.id(), "fixture");
        assert_eq!(source.rows().unwrap().len(), 1);
    }
}
