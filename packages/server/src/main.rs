#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Accident forecast API server.
//!
//! Reads the accident CSV, fits the forecast, then serves predictions.
//! `BIND_ADDR` and `PORT` choose the listening socket.

use std::path::PathBuf;

use accident_forecast_forecast::config::load_config;
use accident_forecast_forecast::load_forecast;
use accident_forecast_forecast_models::ForecastConfig;
use accident_forecast_server::{ServerConfig, run_server};
use accident_forecast_source::csv_file::{CsvRecordSource, parse_delimiter};
use clap::Parser;

#[derive(Parser)]
#[command(name = "accident_forecast_server", about = "Serve accident forecasts over HTTP")]
struct Args {
    /// Accident count CSV export.
    #[arg(long)]
    data: PathBuf,

    /// TOML pipeline configuration. Built-in defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV field delimiter (use `\t` for tab-separated exports).
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    delimiter: u8,

    /// Stop reading the CSV after this many records.
    #[arg(long)]
    max_records: Option<u64>,
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ForecastConfig::default(),
    };

    log::info!("Building forecast from {}...", args.data.display());
    let mut source = CsvRecordSource::from_path(&args.data).with_delimiter(args.delimiter);
    if let Some(max) = args.max_records {
        source = source.with_max_records(max);
    }
    let forecast = load_forecast(&source, &config)?;

    run_server(forecast, &ServerConfig::from_env()).await?;
    Ok(())
}
