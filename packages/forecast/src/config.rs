//! Loading and validating [`ForecastConfig`] from TOML.
//!
//! The annotated default configuration is embedded at compile time so the
//! binaries can print it and the tests can check that it parses back to
//! [`ForecastConfig::default`].

use std::path::Path;

use accident_forecast_forecast_models::ForecastConfig;

/// The annotated default configuration file.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../configs/default.toml");

/// Largest supported differencing order.
pub const MAX_DIFFERENCING: usize = 2;
/// Largest supported AR or MA order.
pub const MAX_LAGS: usize = 10;
/// Largest supported forecast horizon, in months.
pub const MAX_HORIZON: usize = 1_200;

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has fields of the wrong type.
    #[error("Invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value parsed but is out of range.
    #[error("Invalid config: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        message: message.into(),
    }
}

/// Parses and validates a TOML configuration document.
///
/// # Errors
///
/// Returns [`ConfigError`] if the document is malformed or a value is out of
/// range.
pub fn parse_config(toml_str: &str) -> Result<ForecastConfig, ConfigError> {
    let config: ForecastConfig = toml::de::from_str(toml_str)?;
    validate(&config)?;
    Ok(config)
}

/// Reads, parses, and validates a TOML configuration file.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read, is malformed, or a
/// value is out of range.
pub fn load_config(path: &Path) -> Result<ForecastConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    log::debug!("Loaded config from {}", path.display());
    parse_config(&contents)
}

/// Checks that every value is usable by the pipeline.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] describing the first offending value.
pub fn validate(config: &ForecastConfig) -> Result<(), ConfigError> {
    let fields = &config.source.fields;
    for (name, column) in [
        ("category", &fields.category),
        ("subtype", &fields.subtype),
        ("year", &fields.year),
        ("month", &fields.month),
        ("value", &fields.value),
    ] {
        if column.trim().is_empty() {
            return Err(invalid(format!("source.fields.{name} must not be empty")));
        }
    }
    if config.source.aggregate_token.trim().is_empty() {
        return Err(invalid("source.aggregate_token must not be empty"));
    }

    if config.series.category.is_empty() || config.series.subtype.is_empty() {
        return Err(invalid("series.category and series.subtype must not be empty"));
    }

    let model = &config.model;
    if model.horizon == 0 {
        return Err(invalid("model.horizon must be at least 1"));
    }
    if model.horizon > MAX_HORIZON {
        return Err(invalid(format!(
            "model.horizon must be at most {MAX_HORIZON}, got {}",
            model.horizon
        )));
    }
    if model.max_iterations == 0 {
        return Err(invalid("model.max_iterations must be at least 1"));
    }
    if !model.tolerance.is_finite() || model.tolerance <= 0.0 {
        return Err(invalid(format!(
            "model.tolerance must be a positive number, got {}",
            model.tolerance
        )));
    }

    let order = model.order;
    if order.d > MAX_DIFFERENCING {
        return Err(invalid(format!(
            "model.order.d must be at most {MAX_DIFFERENCING}, got {}",
            order.d
        )));
    }
    if order.p > MAX_LAGS || order.q > MAX_LAGS {
        return Err(invalid(format!(
            "model.order.p and model.order.q must be at most {MAX_LAGS}, got {order}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_default_matches_built_in_defaults() {
        let config = parse_config(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(config, ForecastConfig::default());
    }

    #[test]
    fn empty_document_is_valid() {
        assert_eq!(parse_config("").unwrap(), ForecastConfig::default());
    }

    #[test]
    fn overrides_selected_values() {
        let config = parse_config(
            r#"
            [source]
            year_cutoff = 2022

            [model]
            horizon = 12
            "#,
        )
        .unwrap();
        assert_eq!(config.source.year_cutoff, Some(2022));
        assert_eq!(config.model.horizon, 12);
        assert_eq!(config.series.subtype, "insgesamt");
    }

    #[test]
    fn rejects_zero_horizon() {
        let err = parse_config("[model]\nhorizon = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("horizon"));
    }

    #[test]
    fn rejects_unbounded_horizon() {
        let mut config = ForecastConfig::default();
        config.model.horizon = usize::MAX / 2;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("at most"));

        config.model.horizon = MAX_HORIZON;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn rejects_bad_tolerance() {
        assert!(parse_config("[model]\ntolerance = -1.0\n").is_err());
        assert!(parse_config("[model]\ntolerance = nan\n").is_err());
    }

    #[test]
    fn rejects_excessive_order() {
        assert!(parse_config("[model.order]\nd = 3\n").is_err());
        assert!(parse_config("[model.order]\np = 11\n").is_err());
    }

    #[test]
    fn rejects_empty_series_selector() {
        assert!(parse_config("[series]\ncategory = \"\"\n").is_err());
    }

    #[test]
    fn rejects_wrong_types() {
        let err = parse_config("[model]\nhorizon = \"sixty\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
