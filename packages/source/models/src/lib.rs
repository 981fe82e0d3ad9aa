#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Raw source column mapping and normalization settings.
//!
//! The monthly accident export uses German column names and marks yearly
//! totals with a `Summe` month. [`NormalizeConfig`] captures those
//! source-specific details so the normalizer itself stays generic.

use serde::{Deserialize, Serialize};

/// Default source column holding the accident category.
pub const DEFAULT_CATEGORY_FIELD: &str = "MONATSZAHL";
/// Default source column holding the category subtype.
pub const DEFAULT_SUBTYPE_FIELD: &str = "AUSPRAEGUNG";
/// Default source column holding the year.
pub const DEFAULT_YEAR_FIELD: &str = "JAHR";
/// Default source column holding the month.
pub const DEFAULT_MONTH_FIELD: &str = "MONAT";
/// Default source column holding the accident count.
pub const DEFAULT_VALUE_FIELD: &str = "WERT";
/// Default month token marking a yearly-total row.
pub const DEFAULT_AGGREGATE_TOKEN: &str = "Summe";
/// Last year whose figures the provider treats as final.
pub const DEFAULT_YEAR_CUTOFF: i32 = 2020;

/// Source column names for each canonical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMapping {
    /// Column for [`category`](FieldMapping::category).
    pub category: String,
    /// Column for the subtype.
    pub subtype: String,
    /// Column for the year.
    pub year: String,
    /// Column for the month (numeric, `YYYYMM`, or the aggregate token).
    pub month: String,
    /// Column for the count.
    pub value: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            category: DEFAULT_CATEGORY_FIELD.to_string(),
            subtype: DEFAULT_SUBTYPE_FIELD.to_string(),
            year: DEFAULT_YEAR_FIELD.to_string(),
            month: DEFAULT_MONTH_FIELD.to_string(),
            value: DEFAULT_VALUE_FIELD.to_string(),
        }
    }
}

/// Settings for turning raw rows into accident records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Column name mapping.
    pub fields: FieldMapping,
    /// Month token that marks a yearly-total row. Matched after trimming,
    /// ignoring case.
    pub aggregate_token: String,
    /// Rows with a year greater than this are dropped. `None` keeps every
    /// year.
    pub year_cutoff: Option<i32>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            fields: FieldMapping::default(),
            aggregate_token: DEFAULT_AGGREGATE_TOKEN.to_string(),
            year_cutoff: Some(DEFAULT_YEAR_CUTOFF),
        }
    }
}

impl NormalizeConfig {
    /// Whether a row from `year` is within the configured cutoff.
    #[must_use]
    pub fn accepts_year(&self, year: i32) -> bool {
        self.year_cutoff.is_none_or(|cutoff| year <= cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_monthly_export() {
        let config = NormalizeConfig::default();
        assert_eq!(config.fields.category, "MONATSZAHL");
        assert_eq!(config.fields.month, "MONAT");
        assert_eq!(config.aggregate_token, "Summe");
        assert_eq!(config.year_cutoff, Some(2020));
    }

    #[test]
    fn cutoff_is_inclusive() {
        let config = NormalizeConfig::default();
        assert!(config.accepts_year(2020));
        assert!(!config.accepts_year(2021));
    }

    #[test]
    fn missing_cutoff_accepts_everything() {
        let config = NormalizeConfig {
            year_cutoff: None,
            ..NormalizeConfig::default()
        };
        assert!(config.accepts_year(2_100));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: NormalizeConfig = toml::from_str(
            r#"
            year_cutoff = 2019

            [fields]
            value = "COUNT"
            "#,
        )
        .unwrap();
        assert_eq!(config.year_cutoff, Some(2019));
        assert_eq!(config.fields.value, "COUNT");
        assert_eq!(config.fields.year, "JAHR");
        assert_eq!(config.aggregate_token, "Summe");
    }
}
