//! Shared per-station pipeline.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! filter -> normalize -> { enrich -> summarize } and { forecast -> backtest }
//!
//! The two branches share only the normalized series. Statistics failures fail
//! the run; a forecast/backtest failure is kept next to the statistics instead.

use crate::data::{LocationLookup, ResolvedLocation, enrich, filter_station, normalize};
use crate::domain::{
    BacktestReport, Bounds, DailySeries, EnrichedSeries, PipelineConfig, RawRecord, StationSummary,
};
use crate::error::RidershipError;
use crate::fit::{ForecastOutput, backtest, forecast};
use crate::stats::summarize;

/// How the forecast bounds of a station are chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundsPolicy {
    Fixed(Bounds),
    /// `cap = multiplier × max observed count`.
    Multiplier { floor: f64, multiplier: f64 },
}

impl BoundsPolicy {
    /// Resolve against a series. Validation happens in the forecast stage.
    pub fn resolve(&self, series: &DailySeries) -> Bounds {
        match *self {
            BoundsPolicy::Fixed(bounds) => bounds,
            BoundsPolicy::Multiplier { floor, multiplier } => Bounds {
                floor,
                cap: multiplier * series.max_rides().unwrap_or(0.0),
            },
        }
    }
}

/// Forecast-side outputs of a station run.
#[derive(Debug, Clone)]
pub struct ForecastBranch {
    pub output: ForecastOutput,
    /// `None` when backtesting is disabled.
    pub backtest: Option<Result<BacktestReport, RidershipError>>,
}

/// All computed outputs of a single station run.
#[derive(Debug, Clone)]
pub struct StationRun {
    pub station: String,
    pub location: Option<ResolvedLocation>,
    pub series: DailySeries,
    pub enriched: EnrichedSeries,
    /// Includes `{year}_predicted_*` statistics when the forecast succeeded.
    pub summary: StationSummary,
    /// `None` when forecasting is disabled.
    pub forecast: Option<Result<ForecastBranch, RidershipError>>,
}

/// Execute the full pipeline for one station.
///
/// `bounds = None` skips the forecast branch.
pub fn run_station(
    station: &str,
    records: &[RawRecord],
    lookup: &LocationLookup,
    config: &PipelineConfig,
    bounds: Option<BoundsPolicy>,
) -> Result<StationRun, RidershipError> {
    // 1) Filter + normalize (shared by both branches).
    let filtered = filter_station(records, station);
    let series = normalize(station, &filtered, &config.normalize)?;
    log::info!(
        "{station}: {} records -> {} days ({} .. {})",
        filtered.len(),
        series.len(),
        series.first_date(),
        series.last_date()
    );

    // 2) Statistics branch.
    let enriched = enrich(&series)?;
    let mut summary = summarize(&enriched, &config.summary);

    // 3) Forecast branch.
    let forecast = bounds.map(|policy| run_forecast(&series, policy, config));
    match &forecast {
        Some(Ok(branch)) => summary = summary.with_forecast(&branch.output.series),
        Some(Err(e)) => log::info!("{station}: no forecast: {e}"),
        None => {}
    }

    let location = resolve_location(station, lookup, config);

    Ok(StationRun {
        station: station.to_string(),
        location,
        series,
        enriched,
        summary,
        forecast,
    })
}

fn run_forecast(
    series: &DailySeries,
    policy: BoundsPolicy,
    config: &PipelineConfig,
) -> Result<ForecastBranch, RidershipError> {
    let bounds = policy.resolve(series);
    let output = forecast(series, bounds, &config.forecast)?;
    log::info!(
        "{}: selected {} (rmse={:.1})",
        series.station(),
        output.model.layout().display_name(),
        output.selection.best.quality.rmse
    );

    let backtest = config
        .backtest
        .as_ref()
        .map(|bt| backtest(series, &output.model, &config.forecast, bt));

    Ok(ForecastBranch { output, backtest })
}

fn resolve_location(station: &str, lookup: &LocationLookup, config: &PipelineConfig) -> Option<ResolvedLocation> {
    lookup
        .clone()
        .with_overrides(config.location_overrides.clone())
        .resolve(station)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Coordinate, LocationSource};
    use crate::domain::{DayObservation, DayType};
    use chrono::NaiveDate;

    fn rec(date: &str, rides: f64) -> RawRecord {
        RawRecord {
            station_id: "1".into(),
            station_name: "Morse".into(),
            date: date.into(),
            day_type: "W".into(),
            rides,
        }
    }

    #[test]
    fn forecast_failure_keeps_statistics() {
        let records = vec![rec("01/01/2019", 100.0), rec("01/02/2019", 120.0), rec("01/03/2019", 80.0)];
        let config = PipelineConfig::new(NaiveDate::from_ymd_opt(2019, 12, 31).unwrap(), 2019);
        let policy = BoundsPolicy::Multiplier { floor: 0.0, multiplier: 1.5 };

        let run = run_station("Morse", &records, &LocationLookup::default(), &config, Some(policy)).unwrap();
        assert!((run.summary.daily.mean - 100.0).abs() < 1e-12);
        assert!(matches!(
            run.forecast,
            Some(Err(RidershipError::DataVersionMismatch { .. }))
        ));
        assert!(run.summary.predicted.is_empty());
    }

    #[test]
    fn statistics_errors_fail_the_run() {
        let config = PipelineConfig::new(NaiveDate::from_ymd_opt(2019, 12, 31).unwrap(), 2019);
        let err = run_station("Nowhere", &[rec("01/01/2019", 1.0)], &LocationLookup::default(), &config, None)
            .unwrap_err();
        assert!(matches!(err, RidershipError::EmptyInput { .. }));
    }

    #[test]
    fn config_override_wins_location() {
        let mut config = PipelineConfig::new(NaiveDate::from_ymd_opt(2019, 12, 31).unwrap(), 2019);
        let pin = Coordinate { latitude: 42.0, longitude: -87.6 };
        config.location_overrides.insert("Morse".into(), pin);

        let run = run_station("Morse", &[rec("01/01/2019", 5.0)], &LocationLookup::default(), &config, None).unwrap();
        assert_eq!(run.location.map(|l| l.source), Some(LocationSource::Override));
        assert!(run.forecast.is_none());
    }

    #[test]
    fn synthetic_station_end_to_end() {
        use crate::data::{SyntheticSpec, generate_records};

        let start = NaiveDate::from_ymd_opt(2017, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2019, 12, 31).unwrap();
        let records = generate_records(&SyntheticSpec::new("Morse", start, end, 11)).unwrap();
        let config = PipelineConfig::new(end, 2019);
        let policy = BoundsPolicy::Multiplier { floor: 0.0, multiplier: 1.5 };

        let run = run_station("Morse", &records, &LocationLookup::default(), &config, Some(policy)).unwrap();
        assert_eq!(run.series.len(), 1095);

        let metrics = run.summary.to_metrics();
        for key in [
            "daily_mean",
            "daily_std",
            "Weekday_mean",
            "Weekday_std",
            "Sat_mean",
            "Sat_std",
            "Sun/Hol_mean",
            "Sun/Hol_std",
            "Winter_mean",
            "Summer_mean",
            "2018_mean",
            "2019_mean",
            "num_na",
            "5_yr_num_diff",
            "num_yrs_from_past_5",
            "2020_predicted_mean",
        ] {
            assert!(metrics.contains_key(key), "missing {key}");
        }
        assert_eq!(metrics["num_yrs_from_past_5"], 3.0);
        assert!(metrics["Weekday_mean"] > metrics["Sun/Hol_mean"]);

        // Exactly one mean/std pair per observed day type.
        assert_eq!(run.summary.by_day_type.len(), 3);
        for label in DayType::ALL.map(DayType::label) {
            let keys: Vec<&String> = metrics.keys().filter(|k| k.starts_with(&format!("{label}_"))).collect();
            assert_eq!(keys.len(), 2, "{label}: {keys:?}");
            assert!(metrics[&format!("{label}_std")].is_finite());
        }

        let branch = match run.forecast {
            Some(Ok(branch)) => branch,
            other => panic!("expected a forecast, got {other:?}"),
        };
        let bounds = branch.output.series.bounds;
        assert_eq!(branch.output.series.points.len(), 5 * 365);
        assert!(branch
            .output
            .series
            .points
            .iter()
            .all(|p| p.value >= bounds.floor && p.value <= bounds.cap));

        let report = match branch.backtest {
            Some(Ok(report)) => report,
            other => panic!("expected a backtest, got {other:?}"),
        };
        assert_eq!(report.folds.len(), config.backtest.unwrap().fold_count(1095));
        assert!(!report.by_horizon().is_empty());
    }

    #[test]
    fn multiplier_scales_observed_max() {
        let days = vec![
            DayObservation { date: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(), rides: Some(200.0), day_type: None },
            DayObservation::missing(NaiveDate::from_ymd_opt(2019, 1, 2).unwrap()),
        ];
        let series = DailySeries::from_contiguous("Morse", days);
        let bounds = BoundsPolicy::Multiplier { floor: 10.0, multiplier: 1.5 }.resolve(&series);
        assert_eq!(bounds, Bounds { floor: 10.0, cap: 300.0 });
    }
}
