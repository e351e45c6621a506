//! Rolling-origin backtesting.
//!
//! Time series validation has to respect temporal order, so folds use an
//! expanding window: fold `k` trains on days `[0, initial + k·period)` and is
//! scored on the next `horizon` days. Each fold refits the *selected* layout
//! once on its training prefix; errors are grouped by distance from the cutoff.

use std::ops::Range;

use chrono::NaiveDate;

use crate::domain::{BacktestConfig, BacktestFold, BacktestReport, BacktestRow, DailySeries, ForecastConfig};
use crate::error::RidershipError;
use crate::fit::fitter::{FitOptions, Observations, fit_layout};
use crate::fit::selection::to_fit_result;
use crate::models::LogisticModel;

/// `(train, test)` index ranges for an expanding window.
///
/// Trains on `[0, i)` and tests on `[i, i + horizon)` for
/// `i = min_train, min_train + step, ...` while the test range fits.
pub fn expanding_window_split(
    data_len: usize,
    min_train: usize,
    horizon: usize,
    step: usize,
) -> Vec<(Range<usize>, Range<usize>)> {
    let mut splits = Vec::new();
    let step = step.max(1);

    let mut train_end = min_train;
    while train_end + horizon <= data_len {
        splits.push((0..train_end, train_end..train_end + horizon));
        train_end += step;
    }

    splits
}

/// Backtest `model`'s layout over `series`.
///
/// A series shorter than `initial_days + horizon_days` yields a report with no folds.
pub fn backtest(
    series: &DailySeries,
    model: &LogisticModel,
    config: &ForecastConfig,
    bt: &BacktestConfig,
) -> Result<BacktestReport, RidershipError> {
    bt.validate()?;
    let opts = FitOptions::from(config);
    let splits = expanding_window_split(series.len(), bt.initial_days, bt.horizon_days, bt.period_days);

    let mut folds = Vec::with_capacity(splits.len());
    for (train, test) in splits {
        let Some(train_series) = series.truncate_to(train.end) else {
            continue;
        };
        let obs = Observations::from_series(&train_series);
        let fit = fit_layout(model.layout(), &obs, model.bounds, &opts)?;
        let fold_model = LogisticModel {
            scale: obs.scale,
            bounds: model.bounds,
            fit: to_fit_result(fit),
        };

        let rows = score_fold(series, &fold_model, train_series.last_date(), test, bt.bucket_days);
        folds.push(BacktestFold {
            cutoff: train_series.last_date(),
            train_days: train.end,
            rows,
        });
    }

    log::debug!(
        "backtest {}: {} folds (initial={} horizon={} period={})",
        series.station(),
        folds.len(),
        bt.initial_days,
        bt.horizon_days,
        bt.period_days
    );

    Ok(BacktestReport {
        initial_days: bt.initial_days,
        horizon_days: bt.horizon_days,
        period_days: bt.period_days,
        bucket_days: bt.bucket_days,
        folds,
    })
}

#[derive(Default)]
struct BucketErrors {
    n: usize,
    abs: f64,
    sq: f64,
    pct: f64,
    pct_n: usize,
}

fn score_fold(
    series: &DailySeries,
    model: &LogisticModel,
    cutoff: NaiveDate,
    test: Range<usize>,
    bucket_days: usize,
) -> Vec<BacktestRow> {
    let horizon = test.len();
    let n_buckets = horizon.div_ceil(bucket_days);
    let mut buckets: Vec<BucketErrors> = (0..n_buckets).map(|_| BucketErrors::default()).collect();

    for (idx, day) in series.days()[test].iter().enumerate() {
        // Missing actuals have nothing to score.
        let Some(actual) = day.rides else {
            continue;
        };
        let err = model.predict(day.date) - actual;
        let b = &mut buckets[idx / bucket_days];
        b.n += 1;
        b.abs += err.abs();
        b.sq += err * err;
        if actual != 0.0 {
            b.pct += (err / actual).abs();
            b.pct_n += 1;
        }
    }

    buckets
        .into_iter()
        .enumerate()
        .filter(|(_, b)| b.n > 0)
        .map(|(i, b)| {
            let n = b.n as f64;
            BacktestRow {
                cutoff,
                bucket_start: (i * bucket_days + 1) as u32,
                bucket_end: ((i + 1) * bucket_days).min(horizon) as u32,
                n: b.n,
                mae: b.abs / n,
                rmse: (b.sq / n).sqrt(),
                mape: (b.pct_n > 0).then(|| b.pct / b.pct_n as f64),
                mape_n: b.pct_n,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bounds, DayObservation, FitQuality, FitResult, ModelLayout};
    use crate::models::{TimeScale, predict_unit};

    fn layout() -> ModelLayout {
        ModelLayout {
            changepoints: vec![],
            yearly_order: 1,
            weekly_order: 1,
        }
    }

    const PARAMS: [f64; 6] = [-0.3, 0.4, 0.2, 0.1, 0.25, -0.1];

    /// `days` days of data generated exactly by the model, with every 10th day missing.
    fn series(days: usize) -> (DailySeries, LogisticModel) {
        let origin = NaiveDate::from_ymd_opt(2017, 1, 1).unwrap();
        let last = origin + chrono::Duration::days(days as i64 - 1);
        let scale = TimeScale::new(origin, last);
        let bounds = Bounds::new(0.0, 1000.0).unwrap();
        let obs = origin
            .iter_days()
            .take(days)
            .enumerate()
            .map(|(i, date)| {
                let (t, day) = scale.coordinates(date);
                let rides = bounds.denormalize(predict_unit(&layout(), t, day, &PARAMS));
                DayObservation {
                    date,
                    rides: (i % 10 != 5).then_some(rides),
                    day_type: Some("W".to_string()),
                }
            })
            .collect();
        let model = LogisticModel {
            scale,
            bounds,
            fit: FitResult {
                layout: layout(),
                params: PARAMS.to_vec(),
                quality: FitQuality {
                    sse: 0.0,
                    rmse: 0.0,
                    bic: 0.0,
                    n: days,
                    iterations: 0,
                },
            },
        };
        (DailySeries::from_contiguous("Morse", obs), model)
    }

    fn config() -> ForecastConfig {
        let mut config = ForecastConfig::new(NaiveDate::from_ymd_opt(2019, 12, 31).unwrap());
        config.changepoint_penalty = 0.0;
        config.seasonality_penalty = 0.0;
        config
    }

    #[test]
    fn split_count_matches_config_formula() {
        let bt = BacktestConfig::default();
        for total in [100, 544, 545, 724, 725, 1095] {
            let splits = expanding_window_split(total, bt.initial_days, bt.horizon_days, bt.period_days);
            assert_eq!(splits.len(), bt.fold_count(total), "total = {total}");
        }
        let splits = expanding_window_split(725, 365, 180, 180);
        assert_eq!(splits[1], (0..545, 545..725));
    }

    #[test]
    fn too_short_history_gives_no_folds() {
        let (s, model) = series(400);
        let report = backtest(&s, &model, &config(), &BacktestConfig::default()).unwrap();
        assert!(report.folds.is_empty());
        assert!(report.by_horizon().is_empty());
    }

    #[test]
    fn folds_are_ordered_and_bucketed() {
        let (s, model) = series(1095);
        let bt = BacktestConfig::default();
        let report = backtest(&s, &model, &config(), &bt).unwrap();

        assert_eq!(report.folds.len(), bt.fold_count(1095));
        assert!(report.folds.windows(2).all(|w| w[0].cutoff < w[1].cutoff));
        assert_eq!(report.folds[0].train_days, 365);
        assert_eq!(report.folds[0].cutoff, NaiveDate::from_ymd_opt(2017, 12, 31).unwrap());

        let rows = &report.folds[0].rows;
        assert_eq!(rows.len(), 6);
        assert_eq!((rows[0].bucket_start, rows[0].bucket_end), (1, 30));
        assert_eq!((rows[5].bucket_start, rows[5].bucket_end), (151, 180));
        assert_eq!(rows.iter().map(|r| r.n).sum::<usize>(), 162);

        // Exact data: the refit reproduces it.
        assert!(report.rows().all(|r| r.mae < 1e-3 && r.mape.unwrap() < 1e-5));
    }

    #[test]
    fn rejects_zero_bucket_width() {
        let (s, model) = series(400);
        let bt = BacktestConfig {
            bucket_days: 0,
            ..BacktestConfig::default()
        };
        assert!(backtest(&s, &model, &config(), &bt).is_err());
    }
}
