//! Multi-year trend over a fixed window of calendar years.

use std::collections::BTreeMap;

use crate::domain::{FiveYearTrend, MeanStd, SummaryConfig};

/// Trend over `config.trend_years()` given per-year statistics.
///
/// Years without observations are left out (not treated as zero), so the
/// year-over-year steps run between consecutive years *that have data*.
/// With fewer than two such years both averages are `None`.
pub fn five_year_trend(by_year: &BTreeMap<i32, MeanStd>, config: &SummaryConfig) -> FiveYearTrend {
    let window = config.trend_years();
    let yearly_means: BTreeMap<i32, f64> = window
        .clone()
        .filter_map(|year| by_year.get(&year).map(|s| (year, s.mean)))
        .collect();

    let means: Vec<f64> = yearly_means.values().copied().collect();
    let (mean_num_diff, mean_pct_diff) = if means.len() < 2 {
        (None, None)
    } else {
        let diffs: Vec<f64> = means.windows(2).map(|w| w[1] - w[0]).collect();
        // A zero-ridership year has no defined relative change.
        let pcts: Vec<f64> = means
            .windows(2)
            .filter(|w| w[0] != 0.0)
            .map(|w| (w[1] - w[0]) / w[0])
            .collect();
        (mean(&diffs), mean(&pcts))
    };

    FiveYearTrend {
        first_year: *window.start(),
        last_year: *window.end(),
        num_years: yearly_means.len(),
        yearly_means,
        mean_num_diff,
        mean_pct_diff,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
