//! Candidate layout grid.
//!
//! The model is linear in its parameters only inside the sigmoid, and the
//! structural choices (how many changepoints, which yearly Fourier order) are
//! discrete. We search those choices over a small deterministic grid and let
//! BIC pick.

use crate::domain::{ForecastConfig, ModelLayout};

/// `n` evenly spaced changepoints inside `(0, range]` on the scaled time axis.
///
/// Position `j` (1-based) is `j · range / n`.
pub fn changepoint_positions(n: usize, range: f64) -> Vec<f64> {
    (1..=n).map(|j| j as f64 * range / n as f64).collect()
}

/// Every combination of changepoint count and yearly order, in config order
/// (changepoint count outer, yearly order inner). Duplicates are dropped.
pub fn candidate_layouts(config: &ForecastConfig) -> Vec<ModelLayout> {
    let mut out: Vec<ModelLayout> = Vec::new();
    for &cps in &config.changepoint_counts {
        for &yearly_order in &config.yearly_orders {
            let layout = ModelLayout {
                changepoints: changepoint_positions(cps, config.changepoint_range),
                yearly_order,
                weekly_order: config.weekly_order,
            };
            if !out.contains(&layout) {
                out.push(layout);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn changepoints_end_at_range() {
        let v = changepoint_positions(4, 0.8);
        assert_eq!(v.len(), 4);
        assert!((v[0] - 0.2).abs() < 1e-12);
        assert!((v[3] - 0.8).abs() < 1e-12);
        assert!(changepoint_positions(0, 0.8).is_empty());
    }

    #[test]
    fn grid_covers_cross_product_without_duplicates() {
        let mut config = ForecastConfig::new(NaiveDate::from_ymd_opt(2019, 12, 31).unwrap());
        config.changepoint_counts = vec![0, 3, 3];
        config.yearly_orders = vec![2, 5];
        let grid = candidate_layouts(&config);
        assert_eq!(grid.len(), 4);
        assert!(grid[0].changepoints.is_empty());
        assert_eq!(grid[1].yearly_order, 5);
        assert_eq!(grid[3].changepoints.len(), 3);
        assert!(grid.iter().all(|l| l.weekly_order == config.weekly_order));
    }
}
