//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - builds the run configuration (JSON file, then flag overrides)
//! - ingests ride files and the station map
//! - runs the station pipeline
//! - prints reports
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, RunArgs, SimulateArgs};
use crate::data::{LocationLookup, SyntheticSpec, generate_records};
use crate::domain::{Bounds, PipelineConfig};
use crate::error::AppError;

pub mod pipeline;

use pipeline::{BoundsPolicy, run_station};

/// Entry point for the `ridership` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args)?;
    let policy = bounds_policy_from_args(&args)?;

    let ingest = crate::io::ingest::load_ride_records(&args.data)?;
    for e in &ingest.row_errors {
        log::warn!("line {}: {}", e.line, e.message);
    }

    let lookup = match &args.map {
        Some(path) => LocationLookup::new(crate::io::ingest::load_station_map(path)?),
        None => LocationLookup::default(),
    };

    let run = run_station(&args.station, &ingest.records, &lookup, &config, policy)?;

    println!(
        "{}",
        crate::report::format_summary(&run.summary, run.location.as_ref())
    );

    match &run.forecast {
        None => {}
        Some(Err(e)) => println!("Forecast unavailable: {e}\n"),
        Some(Ok(branch)) => {
            let out = &branch.output;
            println!(
                "{}",
                crate::report::format_selection(&out.selection, out.model.bounds)
            );
            println!("{}", crate::report::format_forecast_table(&out.series));

            if args.top > 0 {
                let residuals = crate::report::compute_residuals(&run.series, &out.model);
                let rankings = crate::report::rank_outlier_days(&residuals, args.top);
                println!("{}", crate::report::format_rankings(&rankings));
            }

            match &branch.backtest {
                None => {}
                Some(Ok(report)) => println!("{}", crate::report::format_backtest(report)),
                Some(Err(e)) => println!("Backtest unavailable: {e}\n"),
            }

            if let Some(path) = &args.export_forecast {
                crate::io::export::write_forecast_csv(path, &out.series)?;
            }
            if let (Some(path), Some(Ok(report))) = (&args.export_backtest, &branch.backtest) {
                crate::io::export::write_backtest_csv(path, report)?;
            }
        }
    }

    if let Some(path) = &args.export_summary {
        crate::io::export::write_summary_json(path, &run.summary, run.location.as_ref())?;
    }

    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let mut spec = SyntheticSpec::new(&args.station, args.start, args.end, args.seed);
    spec.weekday_level = args.weekday_level;
    spec.growth_per_year = args.growth;
    spec.missing_prob = args.missing_prob;
    spec.duplicate_prob = args.duplicate_prob;

    let records = generate_records(&spec)?;
    crate::io::export::write_records_csv(&args.out, &records)?;
    println!(
        "Wrote {} records for {} ({} .. {}) to {}",
        records.len(),
        args.station,
        args.start,
        args.end,
        args.out.display()
    );
    Ok(())
}

/// Start from `--config` (if any) and apply flag overrides.
pub fn pipeline_config_from_args(args: &RunArgs) -> Result<PipelineConfig, AppError> {
    let mut config = match &args.config {
        Some(path) => crate::io::config::read_config_json(path)?,
        None => {
            let (Some(cutoff), Some(year)) = (args.cutoff, args.trend_end_year) else {
                return Err(AppError::new(
                    2,
                    "`--cutoff` and `--trend-end-year` are required without `--config`.",
                ));
            };
            PipelineConfig::new(cutoff, year)
        }
    };

    if let Some(cutoff) = args.cutoff {
        config.forecast.expected_cutoff = cutoff;
    }
    if let Some(year) = args.trend_end_year {
        config.summary.trend_end_year = year;
    }
    if let Some(fmt) = &args.date_format {
        config.normalize.date_format = fmt.clone();
    }
    if let Some(years) = args.horizon_years {
        config.forecast.horizon_years = years;
    }
    if let Some(robust) = args.robust {
        config.forecast.robust = robust;
    }
    if args.no_backtest {
        config.backtest = None;
    }

    config.forecast.validate()?;
    if let Some(bt) = &config.backtest {
        bt.validate()?;
    }
    Ok(config)
}

/// `None` when forecasting is disabled.
pub fn bounds_policy_from_args(args: &RunArgs) -> Result<Option<BoundsPolicy>, AppError> {
    if args.no_forecast {
        return Ok(None);
    }
    let policy = match args.cap {
        Some(cap) => BoundsPolicy::Fixed(Bounds::new(args.floor, cap)?),
        None => {
            if !(args.cap_multiplier.is_finite() && args.cap_multiplier > 0.0) {
                return Err(AppError::new(2, "`--cap-multiplier` must be > 0."));
            }
            BoundsPolicy::Multiplier {
                floor: args.floor,
                multiplier: args.cap_multiplier,
            }
        }
    };
    Ok(Some(policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["ridership", "run", "--data", "rides.csv", "-s", "Morse"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Run(args) => args,
            Command::Simulate(_) => panic!("expected run"),
        }
    }

    #[test]
    fn flags_build_config() {
        let args = run_args(&["--cutoff", "2019-12-31", "--trend-end-year", "2019", "--no-backtest", "--horizon-years", "2"]);
        let config = pipeline_config_from_args(&args).unwrap();
        assert_eq!(config.summary.trend_end_year, 2019);
        assert_eq!(config.forecast.horizon_days(), 730);
        assert!(config.backtest.is_none());
    }

    #[test]
    fn missing_cutoff_without_config_is_an_input_error() {
        let err = pipeline_config_from_args(&run_args(&["--trend-end-year", "2019"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn fixed_cap_is_validated() {
        let err = bounds_policy_from_args(&run_args(&["--cap", "-5"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(bounds_policy_from_args(&run_args(&["--no-forecast"])).unwrap(), None);
        assert_eq!(
            bounds_policy_from_args(&run_args(&[])).unwrap(),
            Some(BoundsPolicy::Multiplier { floor: 0.0, multiplier: 1.5 })
        );
    }
}
