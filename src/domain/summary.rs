//! Station summary: the typed record of every scalar metric the pipeline computes.
//!
//! Undefined statistics are `None`, never zero. `to_metrics` flattens the record
//! into the named-key form reporting code expects (`daily_mean`, `Sat_std`,
//! `2019_predicted_mean`, ...), writing `NaN` for anything undefined.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{DayType, ForecastSeries, Season};

/// Count, mean and sample standard deviation of a group of values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanStd {
    pub count: usize,
    pub mean: f64,
    /// Sample (N-1) standard deviation; `None` with fewer than two values.
    pub std: Option<f64>,
}

impl MeanStd {
    /// Returns `None` for an empty slice.
    pub fn from_values(values: &[f64]) -> Option<MeanStd> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = if values.len() < 2 {
            None
        } else {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            Some((ss / (n - 1.0)).sqrt())
        };
        Some(MeanStd {
            count: values.len(),
            mean,
            std,
        })
    }
}

/// Year-over-year trend over a fixed window of calendar years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiveYearTrend {
    pub first_year: i32,
    pub last_year: i32,
    /// Mean ride count of every window year that has data.
    pub yearly_means: BTreeMap<i32, f64>,
    /// How many window years have any data.
    pub num_years: usize,
    /// Mean of `curr - prev` over consecutive years with data.
    pub mean_num_diff: Option<f64>,
    /// Mean of `(curr - prev) / prev` over consecutive years with data.
    pub mean_pct_diff: Option<f64>,
}

impl FiveYearTrend {
    pub fn window_len(&self) -> i32 {
        self.last_year - self.first_year + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSummary {
    pub station: String,
    pub num_na: usize,
    pub daily: MeanStd,
    pub by_day_type: BTreeMap<DayType, MeanStd>,
    pub by_season: BTreeMap<Season, MeanStd>,
    /// The two most recent fully observed calendar years present in the data.
    pub recent_years: BTreeMap<i32, MeanStd>,
    pub trend: FiveYearTrend,
    /// Per-year statistics of forecast values; empty until a forecast is folded in.
    pub predicted: BTreeMap<i32, MeanStd>,
}

impl StationSummary {
    /// Extend the summary with per-year forecast statistics.
    pub fn with_forecast(mut self, forecast: &ForecastSeries) -> StationSummary {
        for (year, stats) in forecast.yearly_stats() {
            self.predicted.insert(year, stats);
        }
        self
    }

    /// Flatten into named scalar metrics.
    pub fn to_metrics(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        insert_pair(&mut out, "daily", Some(&self.daily));
        for (day_type, stats) in &self.by_day_type {
            insert_pair(&mut out, day_type.label(), Some(stats));
        }
        for (season, stats) in &self.by_season {
            insert_pair(&mut out, season.label(), Some(stats));
        }
        for (year, stats) in &self.recent_years {
            insert_pair(&mut out, &year.to_string(), Some(stats));
        }

        out.insert("num_na".to_string(), self.num_na as f64);

        let n = self.trend.window_len();
        out.insert(
            format!("{n}_yr_num_diff"),
            self.trend.mean_num_diff.unwrap_or(f64::NAN),
        );
        out.insert(
            format!("{n}_yr_pct_diff"),
            self.trend.mean_pct_diff.unwrap_or(f64::NAN),
        );
        out.insert(format!("num_yrs_from_past_{n}"), self.trend.num_years as f64);

        for (year, stats) in &self.predicted {
            insert_pair(&mut out, &format!("{year}_predicted"), Some(stats));
        }
        out
    }
}

fn insert_pair(out: &mut BTreeMap<String, f64>, prefix: &str, stats: Option<&MeanStd>) {
    let mean = stats.map_or(f64::NAN, |s| s.mean);
    let std = stats.and_then(|s| s.std).unwrap_or(f64::NAN);
    out.insert(format!("{prefix}_mean"), mean);
    out.insert(format!("{prefix}_std"), std);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_std_uses_sample_denominator() {
        let s = MeanStd::from_values(&[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(s.count, 3);
        assert!((s.mean - 20.0).abs() < 1e-12);
        assert!((s.std.unwrap() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn mean_std_single_value_has_no_std() {
        let s = MeanStd::from_values(&[5.0]).unwrap();
        assert_eq!(s.std, None);
        assert!(MeanStd::from_values(&[]).is_none());
    }

    #[test]
    fn metrics_use_nan_for_undefined_trend() {
        let daily = MeanStd::from_values(&[1.0, 2.0]).unwrap();
        let summary = StationSummary {
            station: "Morse".to_string(),
            num_na: 3,
            daily,
            by_day_type: BTreeMap::from([(DayType::SunHol, daily)]),
            by_season: BTreeMap::new(),
            recent_years: BTreeMap::new(),
            trend: FiveYearTrend {
                first_year: 2015,
                last_year: 2019,
                yearly_means: BTreeMap::from([(2019, 1.5)]),
                num_years: 1,
                mean_num_diff: None,
                mean_pct_diff: None,
            },
            predicted: BTreeMap::new(),
        };

        let m = summary.to_metrics();
        assert_eq!(m["num_na"], 3.0);
        assert_eq!(m["num_yrs_from_past_5"], 1.0);
        assert!(m["5_yr_num_diff"].is_nan());
        assert!(m["5_yr_pct_diff"].is_nan());
        assert!(m.contains_key("Sun/Hol_mean"));
        assert!((m["daily_mean"] - 1.5).abs() < 1e-12);
    }
}
