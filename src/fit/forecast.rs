//! Station forecast: guards, model selection, horizon projection.

use chrono::{Datelike, Duration, NaiveDate};

use crate::domain::{Bounds, DailySeries, ForecastConfig, ForecastPoint, ForecastSeries};
use crate::error::RidershipError;
use crate::fit::fitter::Observations;
use crate::fit::selection::{FitSelection, fit_and_select};
use crate::models::LogisticModel;

/// Everything the forecast stage produces.
#[derive(Debug, Clone)]
pub struct ForecastOutput {
    pub model: LogisticModel,
    pub selection: FitSelection,
    pub series: ForecastSeries,
}

/// Fit the station model and project `config.horizon_days()` days past the last date.
///
/// Checks run in order and the first failure is returned:
/// bounds/config → cutoff date → observed history → fitting.
pub fn forecast(
    series: &DailySeries,
    bounds: Bounds,
    config: &ForecastConfig,
) -> Result<ForecastOutput, RidershipError> {
    bounds.validate()?;
    config.validate()?;

    if series.last_date() != config.expected_cutoff {
        return Err(RidershipError::DataVersionMismatch {
            expected: config.expected_cutoff,
            actual: series.last_date(),
        });
    }

    let observed = series.observed_days();
    if observed < config.min_history_days {
        return Err(RidershipError::InsufficientHistory {
            required: config.min_history_days,
            actual: observed,
        });
    }

    let obs = Observations::from_series(series);
    let selection = fit_and_select(&obs, bounds, config)?;
    let model = LogisticModel {
        scale: obs.scale,
        bounds,
        fit: selection.best.clone(),
    };

    let points = project(&model, series.last_date(), config.horizon_days());
    log::debug!(
        "forecast {}: {} days after {} with {}",
        series.station(),
        points.len(),
        series.last_date(),
        model.layout().display_name()
    );

    Ok(ForecastOutput {
        series: ForecastSeries {
            station: series.station().to_string(),
            bounds,
            points,
        },
        model,
        selection,
    })
}

/// Daily predictions for the `days` dates strictly after `last`.
pub fn project(model: &LogisticModel, last: NaiveDate, days: usize) -> Vec<ForecastPoint> {
    (1..=days as i64)
        .map(|offset| {
            let date = last + Duration::days(offset);
            ForecastPoint {
                date,
                year: date.year(),
                value: model.predict(date),
            }
        })
        .collect()
}
