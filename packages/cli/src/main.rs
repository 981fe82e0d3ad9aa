#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the accident forecast.
//!
//! ```text
//! accident_forecast_cli --data accidents.csv serve [--bind 0.0.0.0] [--port 8080]
//! accident_forecast_cli --data accidents.csv forecast [--format table|json|csv]
//! accident_forecast_cli --data accidents.csv predict --year 2021 --month 1
//! accident_forecast_cli --data accidents.csv history [--format table|json|csv]
//! accident_forecast_cli --data accidents.csv model
//! accident_forecast_cli default-config
//! ```
//!
//! Every command except `default-config` reads the CSV and fits the model
//! before doing anything else.

mod output;

use std::path::PathBuf;

use accident_forecast_forecast::config::{DEFAULT_CONFIG_TOML, load_config, validate};
use accident_forecast_forecast::{Forecast, load_forecast};
use accident_forecast_forecast_models::ForecastConfig;
use accident_forecast_server::query::query;
use accident_forecast_server::{ServerConfig, run_server};
use accident_forecast_server_models::{
    ApiError, ApiForecastPoint, ApiHistoryPoint, ApiPrediction, PredictionRequest,
};
use accident_forecast_source::csv_file::{CsvRecordSource, parse_delimiter};
use clap::{Parser, Subcommand};

use crate::output::{OutputFormat, write_rows};

#[derive(Parser)]
#[command(
    name = "accident_forecast_cli",
    about = "Forecast monthly accident counts with an ARIMA model"
)]
struct Cli {
    /// Accident count CSV export.
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// TOML pipeline configuration. Built-in defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the last year kept from the source.
    #[arg(long, global = true, conflicts_with = "all_years")]
    year_cutoff: Option<i32>,

    /// Keep every year, ignoring the configured cutoff.
    #[arg(long, global = true)]
    all_years: bool,

    /// Override the number of months to forecast.
    #[arg(long, global = true)]
    horizon: Option<usize>,

    /// CSV field delimiter (use `\t` for tab-separated exports).
    #[arg(long, global = true, default_value = ",", value_parser = parse_delimiter)]
    delimiter: u8,

    /// Stop reading the CSV after this many records.
    #[arg(long, global = true)]
    max_records: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit the model and serve predictions over HTTP
    Serve {
        /// Address to bind (defaults to `BIND_ADDR` or 127.0.0.1)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (defaults to `PORT` or 8080)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print every forecast month
    Forecast {
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Print the prediction for one month
    Predict {
        /// Calendar year
        #[arg(long)]
        year: Option<i64>,
        /// Calendar month (1-12)
        #[arg(long, allow_negative_numbers = true)]
        month: Option<i64>,
    },
    /// Print the historical series the model is fitted to
    History {
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Print the fitted model summary as JSON
    Model,
    /// Print the annotated default configuration
    DefaultConfig,
}

impl Cli {
    fn forecast_config(&self) -> Result<ForecastConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ForecastConfig::default(),
        };
        if self.all_years {
            config.source.year_cutoff = None;
        } else if let Some(year) = self.year_cutoff {
            config.source.year_cutoff = Some(year);
        }
        if let Some(horizon) = self.horizon {
            config.model.horizon = horizon;
        }
        validate(&config)?;
        Ok(config)
    }

    fn build(&self) -> Result<Forecast, Box<dyn std::error::Error>> {
        let Some(data) = &self.data else {
            return Err("--data <CSV> is required for this command".into());
        };
        let config = self.forecast_config()?;
        let mut source = CsvRecordSource::from_path(data).with_delimiter(self.delimiter);
        if let Some(max) = self.max_records {
            source = source.with_max_records(max);
        }
        Ok(load_forecast(&source, &config)?)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    if matches!(cli.command, Commands::DefaultConfig) {
        print!("{DEFAULT_CONFIG_TOML}");
        return Ok(());
    }

    let forecast = cli.build()?;

    match cli.command {
        Commands::Serve { bind, port } => {
            let env = ServerConfig::from_env();
            let server = ServerConfig {
                bind_addr: bind.unwrap_or(env.bind_addr),
                port: port.unwrap_or(env.port),
            };
            actix_web::rt::System::new().block_on(run_server(forecast, &server))?;
        }
        Commands::Forecast { format } => {
            let rows: Vec<ApiForecastPoint> = forecast
                .index
                .points()
                .iter()
                .copied()
                .map(ApiForecastPoint::from)
                .collect();
            write_rows(std::io::stdout().lock(), &rows, format)?;
        }
        Commands::History { format } => {
            let rows: Vec<ApiHistoryPoint> = forecast
                .series
                .points()
                .iter()
                .copied()
                .map(ApiHistoryPoint::from)
                .collect();
            write_rows(std::io::stdout().lock(), &rows, format)?;
        }
        Commands::Predict { year, month } => {
            let request = PredictionRequest { year, month };
            match query(&forecast.index, &request) {
                Ok(prediction) => {
                    println!("{}", serde_json::to_string(&ApiPrediction { prediction })?);
                }
                Err(e) => {
                    eprintln!("{}", serde_json::to_string(&ApiError::new(e.to_string()))?);
                    std::process::exit(1);
                }
            }
        }
        Commands::Model => {
            println!("{}", serde_json::to_string_pretty(&forecast.model)?);
        }
        Commands::DefaultConfig => {}
    }

    Ok(())
}
