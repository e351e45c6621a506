//! Reporting utilities: in-sample residuals, outlier-day rankings, and
//! formatted terminal output.

pub mod format;

pub use format::*;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::DailySeries;
use crate::models::LogisticModel;

/// One observed day against the fitted model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayResidual {
    pub date: NaiveDate,
    pub actual: f64,
    pub fitted: f64,
    pub residual: f64,
}

/// Days furthest above / below the fitted curve (top-N each side).
#[derive(Debug, Clone)]
pub struct Rankings {
    pub above: Vec<DayResidual>,
    pub below: Vec<DayResidual>,
}

/// Fitted values and residuals for every observed day.
pub fn compute_residuals(series: &DailySeries, model: &LogisticModel) -> Vec<DayResidual> {
    series
        .days()
        .iter()
        .filter_map(|d| {
            let actual = d.rides?;
            let fitted = model.predict(d.date);
            Some(DayResidual {
                date: d.date,
                actual,
                fitted,
                residual: actual - fitted,
            })
        })
        .collect()
}

/// Rank the top days above and below the fit by residual.
pub fn rank_outlier_days(residuals: &[DayResidual], top_n: usize) -> Rankings {
    let mut sorted: Vec<DayResidual> = residuals
        .iter()
        .filter(|r| r.residual.is_finite())
        .cloned()
        .collect();
    sorted.sort_by(|a, b| b.residual.partial_cmp(&a.residual).unwrap_or(std::cmp::Ordering::Equal));
    let above = sorted.iter().take(top_n).cloned().collect();

    sorted.reverse();
    let below = sorted.iter().take(top_n).cloned().collect();

    Rankings { above, below }
}
