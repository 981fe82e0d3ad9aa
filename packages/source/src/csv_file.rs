//! CSV file reader.
//!
//! Reads a CSV export (from disk or from memory), and returns every row as a
//! [`serde_json::Value`] object keyed by the column headers in the first
//! row.

use std::path::{Path, PathBuf};

use crate::{RecordSource, SourceError};

/// Where the CSV bytes come from.
#[derive(Debug, Clone)]
enum CsvOrigin {
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// Source that parses a CSV file into raw rows.
#[derive(Debug, Clone)]
pub struct CsvRecordSource {
    /// Identifier used in log messages.
    id: String,
    /// File path or in-memory contents.
    origin: CsvOrigin,
    /// Field delimiter byte (defaults to `,`).
    delimiter: u8,
    /// Optional cap on the number of records to parse.
    max_records: Option<u64>,
}

impl CsvRecordSource {
    /// Creates a source reading the CSV file at `path` with default settings
    /// (comma-delimited, no record limit).
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        Self {
            id: path.display().to_string(),
            origin: CsvOrigin::File(path.to_path_buf()),
            delimiter: b',',
            max_records: None,
        }
    }

    /// Creates a source over CSV contents that are already in memory.
    #[must_use]
    pub fn from_bytes(id: &str, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.to_owned(),
            origin: CsvOrigin::Bytes(bytes.into()),
            delimiter: b',',
            max_records: None,
        }
    }

    /// Sets the field delimiter (e.g. `b';'` for semicolon exports).
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Limits the number of records that will be parsed from the file.
    #[must_use]
    pub const fn with_max_records(mut self, max: u64) -> Self {
        self.max_records = Some(max);
        self
    }

    fn read_bytes(&self) -> Result<Vec<u8>, SourceError> {
        match &self.origin {
            CsvOrigin::File(path) => {
                let bytes = std::fs::read(path)?;
                log::debug!("Read {} bytes from {}", bytes.len(), path.display());
                Ok(bytes)
            }
            CsvOrigin::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Parses a single-byte field delimiter such as `,`, `;` or `\t`.
///
/// # Errors
///
/// Returns a message if `value` is not exactly one ASCII character.
pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    let value = if value == "\\t" { "\t" } else { value };
    match value.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(format!("delimiter must be a single ASCII character, got {value:?}")),
    }
}

impl RecordSource for CsvRecordSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn rows(&self) -> Result<Vec<serde_json::Value>, SourceError> {
        let bytes = self.read_bytes()?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(bytes.as_slice());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_owned())
            .collect();

        if headers.iter().all(String::is_empty) {
            return Err(SourceError::MissingHeader {
                source_id: self.id.clone(),
            });
        }

        let mut rows: Vec<serde_json::Value> = Vec::new();

        for result in reader.records() {
            if let Some(max) = self.max_records
                && rows.len() as u64 >= max
            {
                log::info!("[{}] Reached max_records limit ({max}), stopping CSV parse", self.id);
                break;
            }

            let record = result?;

            let mut map = serde_json::Map::new();
            for (i, header) in headers.iter().enumerate() {
                if let Some(value) = record.get(i) {
                    map.insert(
                        header.clone(),
                        serde_json::Value::String(value.trim().to_owned()),
                    );
                }
            }
            rows.push(serde_json::Value::Object(map));
        }

        log::info!("[{}] Parsed {} rows", self.id, rows.len());

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
MONATSZAHL,AUSPRAEGUNG,JAHR,MONAT,WERT
Alkoholunfälle,insgesamt,2020,Summe,430
Alkoholunfälle,insgesamt,2020,202001,28
Alkoholunfälle,insgesamt,2020,202002,40
";

    #[test]
    fn parses_rows_keyed_by_header() {
        let source = CsvRecordSource::from_bytes("sample", SAMPLE);
        let rows = source.rows().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1]["MONAT"], "202001");
        assert_eq!(rows[1]["MONATSZAHL"], "Alkoholunfälle");
        assert_eq!(rows[2]["WERT"], "40");
    }

    #[test]
    fn strips_byte_order_mark_from_first_header() {
        let source = CsvRecordSource::from_bytes("bom", format!("\u{feff}{SAMPLE}"));
        let rows = source.rows().unwrap();
        assert!(rows[0].get("MONATSZAHL").is_some());
    }

    #[test]
    fn respects_custom_delimiter() {
        let source = CsvRecordSource::from_bytes("semi", "JAHR;MONAT\n2019;201901\n")
            .with_delimiter(b';');
        let rows = source.rows().unwrap();
        assert_eq!(rows[0]["JAHR"], "2019");
        assert_eq!(rows[0]["MONAT"], "201901");
    }

    #[test]
    fn stops_at_max_records() {
        let source = CsvRecordSource::from_bytes("capped", SAMPLE).with_max_records(2);
        assert_eq!(source.rows().unwrap().len(), 2);
    }

    #[test]
    fn zero_record_cap_reads_nothing() {
        let source = CsvRecordSource::from_bytes("empty", SAMPLE).with_max_records(0);
        assert!(source.rows().unwrap().is_empty());
    }

    #[test]
    fn parses_delimiter_arguments() {
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert_eq!(parse_delimiter("\\t"), Ok(b'\t'));
        assert!(parse_delimiter(";;").is_err());
        assert!(parse_delimiter("§").is_err());
        assert!(parse_delimiter("").is_err());
    }

    #[test]
    fn short_rows_omit_missing_columns() {
        let source = CsvRecordSource::from_bytes("short", "JAHR,MONAT,WERT\n2019,201901\n");
        let rows = source.rows().unwrap();
        assert!(rows[0].get("WERT").is_none());
    }

    #[test]
    fn missing_file_is_io_error() {
        let source = CsvRecordSource::from_path(Path::new("/nonexistent/accidents.csv"));
        assert!(matches!(source.rows(), Err(SourceError::Io(_))));
    }
}
