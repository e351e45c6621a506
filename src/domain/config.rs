//! Run configuration.
//!
//! Everything here is plain data with serde support so a run can be described by
//! a JSON file and then overridden by CLI flags.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::location::Coordinate;
use crate::domain::RobustKind;
use crate::error::RidershipError;

/// Date format of the CTA export (`01/31/2019`).
pub const DEFAULT_DATE_FORMAT: &str = "%m/%d/%Y";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// `chrono` format string used to parse `RawRecord::date`.
    pub date_format: String,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Last calendar year of the trend window (a fixed analysis epoch, not "this year").
    pub trend_end_year: i32,
    #[serde(default = "default_trend_window")]
    pub trend_window: u32,
}

fn default_trend_window() -> u32 {
    5
}

impl SummaryConfig {
    pub fn new(trend_end_year: i32) -> Self {
        Self {
            trend_end_year,
            trend_window: default_trend_window(),
        }
    }

    pub fn trend_years(&self) -> std::ops::RangeInclusive<i32> {
        let window = self.trend_window.max(1) as i32;
        (self.trend_end_year - window + 1)..=self.trend_end_year
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// The series must end exactly on this date or no model is fitted.
    pub expected_cutoff: NaiveDate,
    #[serde(default = "defaults::horizon_years")]
    pub horizon_years: u32,
    /// Minimum number of observed days (about two seasonal cycles).
    #[serde(default = "defaults::min_history_days")]
    pub min_history_days: usize,

    /// Candidate yearly Fourier orders.
    #[serde(default = "defaults::yearly_orders")]
    pub yearly_orders: Vec<usize>,
    #[serde(default = "defaults::weekly_order")]
    pub weekly_order: usize,
    /// Candidate changepoint counts.
    #[serde(default = "defaults::changepoint_counts")]
    pub changepoint_counts: Vec<usize>,
    /// Fraction of the history in which changepoints may be placed.
    #[serde(default = "defaults::changepoint_range")]
    pub changepoint_range: f64,

    /// Ridge weight on changepoint slope adjustments.
    #[serde(default = "defaults::changepoint_penalty")]
    pub changepoint_penalty: f64,
    /// Ridge weight on Fourier coefficients.
    #[serde(default = "defaults::seasonality_penalty")]
    pub seasonality_penalty: f64,

    #[serde(default = "defaults::max_iters")]
    pub max_iters: usize,
    /// Relative objective change below which Gauss-Newton stops.
    #[serde(default = "defaults::tolerance")]
    pub tolerance: f64,

    #[serde(default)]
    pub robust: RobustKind,
    #[serde(default = "defaults::robust_iters")]
    pub robust_iters: usize,
    #[serde(default = "defaults::robust_k")]
    pub robust_k: f64,
}

mod defaults {
    pub fn horizon_years() -> u32 {
        5
    }
    pub fn min_history_days() -> usize {
        730
    }
    pub fn yearly_orders() -> Vec<usize> {
        vec![4, 10]
    }
    pub fn weekly_order() -> usize {
        3
    }
    pub fn changepoint_counts() -> Vec<usize> {
        vec![0, 8]
    }
    pub fn changepoint_range() -> f64 {
        0.8
    }
    pub fn changepoint_penalty() -> f64 {
        1.0
    }
    pub fn seasonality_penalty() -> f64 {
        0.01
    }
    pub fn max_iters() -> usize {
        200
    }
    pub fn tolerance() -> f64 {
        1e-9
    }
    pub fn robust_iters() -> usize {
        2
    }
    pub fn robust_k() -> f64 {
        1.5
    }
}

impl ForecastConfig {
    pub fn new(expected_cutoff: NaiveDate) -> Self {
        Self {
            expected_cutoff,
            horizon_years: defaults::horizon_years(),
            min_history_days: defaults::min_history_days(),
            yearly_orders: defaults::yearly_orders(),
            weekly_order: defaults::weekly_order(),
            changepoint_counts: defaults::changepoint_counts(),
            changepoint_range: defaults::changepoint_range(),
            changepoint_penalty: defaults::changepoint_penalty(),
            seasonality_penalty: defaults::seasonality_penalty(),
            max_iters: defaults::max_iters(),
            tolerance: defaults::tolerance(),
            robust: RobustKind::None,
            robust_iters: defaults::robust_iters(),
            robust_k: defaults::robust_k(),
        }
    }

    pub fn horizon_days(&self) -> usize {
        self.horizon_years as usize * 365
    }

    pub fn validate(&self) -> Result<(), RidershipError> {
        let invalid = |msg: &str| Err(RidershipError::InvalidConfig(msg.to_string()));
        if self.horizon_years == 0 {
            return invalid("horizon_years must be > 0");
        }
        if self.yearly_orders.is_empty() || self.changepoint_counts.is_empty() {
            return invalid("yearly_orders and changepoint_counts must not be empty");
        }
        if !(self.changepoint_range.is_finite()
            && self.changepoint_range > 0.0
            && self.changepoint_range <= 1.0)
        {
            return invalid("changepoint_range must be in (0, 1]");
        }
        if !(self.changepoint_penalty.is_finite()
            && self.changepoint_penalty >= 0.0
            && self.seasonality_penalty.is_finite()
            && self.seasonality_penalty >= 0.0)
        {
            return invalid("penalties must be finite and >= 0");
        }
        if self.max_iters == 0 || !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return invalid("max_iters must be > 0 and tolerance > 0");
        }
        if !(self.robust_k.is_finite() && self.robust_k > 0.0) {
            return invalid("robust_k must be > 0");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub initial_days: usize,
    pub horizon_days: usize,
    pub period_days: usize,
    /// Width of the horizon-distance buckets errors are aggregated over.
    pub bucket_days: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_days: 365,
            horizon_days: 180,
            period_days: 180,
            bucket_days: 30,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), RidershipError> {
        if self.initial_days == 0
            || self.horizon_days == 0
            || self.period_days == 0
            || self.bucket_days == 0
        {
            return Err(RidershipError::InvalidConfig(
                "backtest initial/horizon/period/bucket days must all be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// `floor((total - initial - horizon) / period) + 1`, or 0 if the history is too short.
    pub fn fold_count(&self, total_days: usize) -> usize {
        let needed = self.initial_days + self.horizon_days;
        if total_days < needed || self.period_days == 0 {
            return 0;
        }
        (total_days - needed) / self.period_days + 1
    }
}

/// Configuration of a full station run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub normalize: NormalizeConfig,
    pub summary: SummaryConfig,
    pub forecast: ForecastConfig,
    /// `None` skips backtesting.
    #[serde(default = "default_backtest")]
    pub backtest: Option<BacktestConfig>,
    /// Per-station coordinates that win over the station map.
    #[serde(default)]
    pub location_overrides: BTreeMap<String, Coordinate>,
}

fn default_backtest() -> Option<BacktestConfig> {
    Some(BacktestConfig::default())
}

impl PipelineConfig {
    pub fn new(expected_cutoff: NaiveDate, trend_end_year: i32) -> Self {
        Self {
            normalize: NormalizeConfig::default(),
            summary: SummaryConfig::new(trend_end_year),
            forecast: ForecastConfig::new(expected_cutoff),
            backtest: default_backtest(),
            location_overrides: BTreeMap::new(),
        }
    }
}
