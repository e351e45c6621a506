//! Forecast-side domain types: bounds, model layouts, fit diagnostics,
//! forecast points and backtest reports.

use std::collections::BTreeMap;
use std::ops::Range;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::MeanStd;
use crate::error::RidershipError;

/// Physical limits of the forecast: ridership can't drop below `floor` or exceed `cap`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub floor: f64,
    pub cap: f64,
}

impl Bounds {
    pub fn new(floor: f64, cap: f64) -> Result<Self, RidershipError> {
        let bounds = Self { floor, cap };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn validate(&self) -> Result<(), RidershipError> {
        if !(self.floor.is_finite() && self.cap.is_finite()) {
            return Err(RidershipError::InvalidConfig(format!(
                "bounds must be finite (floor={}, cap={})",
                self.floor, self.cap
            )));
        }
        if self.cap <= self.floor {
            return Err(RidershipError::InvalidConfig(format!(
                "capacity {} must exceed floor {}",
                self.cap, self.floor
            )));
        }
        Ok(())
    }

    pub fn span(&self) -> f64 {
        self.cap - self.floor
    }

    /// Map a ride count onto the unit interval (values outside the bounds map outside `[0, 1]`).
    pub fn normalize(&self, y: f64) -> f64 {
        (y - self.floor) / self.span()
    }

    pub fn denormalize(&self, u: f64) -> f64 {
        self.clamp(self.floor + u * self.span())
    }

    pub fn clamp(&self, y: f64) -> f64 {
        y.clamp(self.floor, self.cap)
    }
}

/// Outlier handling during fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum RobustKind {
    #[default]
    None,
    /// Huber IRLS reweighting with a MAD scale.
    Huber,
}

/// Regressor set of one candidate model.
///
/// Parameter order: intercept, slope, one hinge per changepoint, yearly
/// Fourier pairs, weekly Fourier pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelLayout {
    /// Changepoint positions on the scaled time axis (`0..=1` spans the training history).
    pub changepoints: Vec<f64>,
    pub yearly_order: usize,
    pub weekly_order: usize,
}

impl ModelLayout {
    pub fn param_len(&self) -> usize {
        2 + self.changepoints.len() + 2 * self.yearly_order + 2 * self.weekly_order
    }

    pub fn changepoint_params(&self) -> Range<usize> {
        2..2 + self.changepoints.len()
    }

    pub fn seasonal_params(&self) -> Range<usize> {
        2 + self.changepoints.len()..self.param_len()
    }

    pub fn display_name(&self) -> String {
        format!(
            "logistic cp={} yearly={} weekly={}",
            self.changepoints.len(),
            self.yearly_order,
            self.weekly_order
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    /// Sum of squared errors in ride units.
    pub sse: f64,
    pub rmse: f64,
    pub bic: f64,
    pub n: usize,
    pub iterations: usize,
}

/// Parameters and diagnostics of one fitted layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub layout: ModelLayout,
    pub params: Vec<f64>,
    pub quality: FitQuality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub year: i32,
    pub value: f64,
}

/// Projected daily ridership strictly after the last observed date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub station: String,
    pub bounds: Bounds,
    pub points: Vec<ForecastPoint>,
}

impl ForecastSeries {
    pub fn yearly_stats(&self) -> BTreeMap<i32, MeanStd> {
        let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
        for p in &self.points {
            by_year.entry(p.year).or_default().push(p.value);
        }
        by_year
            .into_iter()
            .filter_map(|(year, values)| MeanStd::from_values(&values).map(|s| (year, s)))
            .collect()
    }
}

/// Errors for one fold, restricted to one horizon-distance bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRow {
    pub cutoff: NaiveDate,
    /// First horizon day in the bucket (1 = the day after the cutoff).
    pub bucket_start: u32,
    pub bucket_end: u32,
    pub n: usize,
    pub mae: f64,
    pub rmse: f64,
    /// Mean absolute percentage error as a fraction; `None` if every actual was zero.
    pub mape: Option<f64>,
    /// Number of points that entered `mape`.
    pub mape_n: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestFold {
    pub cutoff: NaiveDate,
    pub train_days: usize,
    pub rows: Vec<BacktestRow>,
}

/// Accuracy per horizon bucket, pooled over all folds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonAccuracy {
    pub bucket_start: u32,
    pub bucket_end: u32,
    pub n: usize,
    pub mae: f64,
    pub rmse: f64,
    pub mape: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub initial_days: usize,
    pub horizon_days: usize,
    pub period_days: usize,
    pub bucket_days: usize,
    /// Ordered by cutoff; rows inside each fold ordered by bucket.
    pub folds: Vec<BacktestFold>,
}

impl BacktestReport {
    pub fn rows(&self) -> impl Iterator<Item = &BacktestRow> {
        self.folds.iter().flat_map(|f| f.rows.iter())
    }

    pub fn by_horizon(&self) -> Vec<HorizonAccuracy> {
        #[derive(Default)]
        struct Acc {
            end: u32,
            n: usize,
            abs: f64,
            sq: f64,
            pct: f64,
            pct_n: usize,
        }

        let mut buckets: BTreeMap<u32, Acc> = BTreeMap::new();
        for row in self.rows() {
            let acc = buckets.entry(row.bucket_start).or_default();
            acc.end = row.bucket_end;
            acc.n += row.n;
            acc.abs += row.mae * row.n as f64;
            acc.sq += row.rmse * row.rmse * row.n as f64;
            if let Some(mape) = row.mape {
                acc.pct += mape * row.mape_n as f64;
                acc.pct_n += row.mape_n;
            }
        }

        buckets
            .into_iter()
            .filter(|(_, acc)| acc.n > 0)
            .map(|(start, acc)| {
                let n = acc.n as f64;
                HorizonAccuracy {
                    bucket_start: start,
                    bucket_end: acc.end,
                    n: acc.n,
                    mae: acc.abs / n,
                    rmse: (acc.sq / n).sqrt(),
                    mape: (acc.pct_n > 0).then(|| acc.pct / acc.pct_n as f64),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_reject_inverted_limits() {
        assert!(Bounds::new(100.0, 10.0).is_err());
        assert!(Bounds::new(0.0, f64::INFINITY).is_err());
        let b = Bounds::new(0.0, 200.0).unwrap();
        assert!((b.normalize(50.0) - 0.25).abs() < 1e-12);
        assert_eq!(b.denormalize(1.5), 200.0);
    }

    #[test]
    fn layout_parameter_ranges() {
        let layout = ModelLayout {
            changepoints: vec![0.25, 0.5],
            yearly_order: 3,
            weekly_order: 2,
        };
        assert_eq!(layout.param_len(), 2 + 2 + 6 + 4);
        assert_eq!(layout.changepoint_params(), 2..4);
        assert_eq!(layout.seasonal_params(), 4..14);
    }

    #[test]
    fn by_horizon_pools_folds_weighted_by_count() {
        let d = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        let row = |n: usize, mae: f64| BacktestRow {
            cutoff: d,
            bucket_start: 1,
            bucket_end: 30,
            n,
            mae,
            rmse: mae,
            mape: Some(0.1),
            mape_n: n,
        };
        let report = BacktestReport {
            initial_days: 365,
            horizon_days: 30,
            period_days: 30,
            bucket_days: 30,
            folds: vec![
                BacktestFold { cutoff: d, train_days: 365, rows: vec![row(10, 1.0)] },
                BacktestFold { cutoff: d, train_days: 395, rows: vec![row(30, 3.0)] },
            ],
        };
        let pooled = report.by_horizon();
        assert_eq!(pooled.len(), 1);
        assert_eq!(pooled[0].n, 40);
        assert!((pooled[0].mae - 2.5).abs() < 1e-12);
        assert!((pooled[0].mape.unwrap() - 0.1).abs() < 1e-12);
    }
}
