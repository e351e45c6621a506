//! Command-line parsing for the station ridership tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the statistics/modeling code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::domain::RobustKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "ridership",
    version,
    about = "Station ridership summaries and bounded growth forecasts"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Summarize one station, fit the forecast model, backtest it, and optionally export.
    Run(RunArgs),
    /// Write a synthetic ride file with realistic gaps and duplicates.
    Simulate(SimulateArgs),
}

/// Options for a station run.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Ride file (`station_id,stationname,date,daytype,rides`).
    #[arg(long, value_name = "CSV")]
    pub data: PathBuf,

    /// Station name, matched exactly.
    #[arg(short = 's', long)]
    pub station: String,

    /// The series must end on this date for a forecast (YYYY-MM-DD or MM/DD/YYYY).
    /// Required unless given by `--config`.
    #[arg(long, value_parser = parse_date)]
    pub cutoff: Option<NaiveDate>,

    /// Last year of the trend window. Required unless given by `--config`.
    #[arg(long)]
    pub trend_end_year: Option<i32>,

    /// Station map (`STATION_NAME`, `Location`) for coordinates.
    #[arg(long, value_name = "CSV")]
    pub map: Option<PathBuf>,

    /// JSON run configuration; flags override it.
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Date format of the ride file (chrono syntax).
    #[arg(long)]
    pub date_format: Option<String>,

    /// Fixed capacity (upper bound) of the forecast.
    #[arg(long, conflicts_with = "cap_multiplier", allow_negative_numbers = true)]
    pub cap: Option<f64>,

    /// Capacity as a multiple of the largest observed daily count.
    #[arg(long, default_value_t = 1.5)]
    pub cap_multiplier: f64,

    /// Lower bound of the forecast.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub floor: f64,

    /// Forecast horizon in years.
    #[arg(long)]
    pub horizon_years: Option<u32>,

    /// Robust fitting mode.
    #[arg(long, value_enum)]
    pub robust: Option<RobustKind>,

    /// Skip model fitting (statistics only).
    #[arg(long)]
    pub no_forecast: bool,

    /// Skip backtesting.
    #[arg(long)]
    pub no_backtest: bool,

    /// Show top-N days above and below the fit.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Export daily forecast values to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_forecast: Option<PathBuf>,

    /// Export backtest rows to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_backtest: Option<PathBuf>,

    /// Export the summary and flattened metrics to JSON.
    #[arg(long, value_name = "JSON")]
    pub export_summary: Option<PathBuf>,
}

/// Options for synthetic data generation.
#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    #[arg(short = 's', long)]
    pub station: String,

    #[arg(long, value_parser = parse_date)]
    pub start: NaiveDate,

    #[arg(long, value_parser = parse_date)]
    pub end: NaiveDate,

    /// Random seed (combined with station and dates for reproducibility).
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Weekday ridership at the start date.
    #[arg(long, default_value_t = 4000.0)]
    pub weekday_level: f64,

    /// Relative growth per year.
    #[arg(long, default_value_t = 0.03)]
    pub growth: f64,

    /// Probability that a day is not logged.
    #[arg(long, default_value_t = 0.01)]
    pub missing_prob: f64,

    /// Probability that a day is logged twice.
    #[arg(long, default_value_t = 0.01)]
    pub duplicate_prob: f64,

    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,
}

/// Accept ISO dates and the ride file's `MM/DD/YYYY`.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const FMTS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s.trim(), fmt) {
            return Ok(d);
        }
    }
    Err(format!("Invalid date '{s}' (expected YYYY-MM-DD or MM/DD/YYYY)"))
}
