//! Stable scalar functions for the logistic growth model.
//!
//! - `sigmoid(x) = 1 / (1 + exp(-x))`, evaluated without overflow for large `|x|`
//! - `logit(u) = ln(u / (1 - u))`, the inverse on `(0, 1)`
//! - `hinge(t, c) = max(t - c, 0)`, one piecewise-linear trend change
//! - Fourier pairs `sin(2πkd/P), cos(2πkd/P)` for `k = 1..=order`

use std::f64::consts::PI;

/// Yearly period in days.
pub const YEAR_DAYS: f64 = 365.25;
/// Weekly period in days.
pub const WEEK_DAYS: f64 = 7.0;

/// Logistic sigmoid.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        // exp(x) underflows to 0 instead of exp(-x) overflowing.
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Inverse of [`sigmoid`]. Caller keeps `u` strictly inside `(0, 1)`.
pub fn logit(u: f64) -> f64 {
    (u / (1.0 - u)).ln()
}

pub fn hinge(t: f64, c: f64) -> f64 {
    (t - c).max(0.0)
}

/// Write `order` sine/cosine pairs for `day` into `out` (length `2 * order`).
///
/// Layout is `[sin(1), cos(1), sin(2), cos(2), ...]`.
pub fn fourier_terms(day: f64, period: f64, order: usize, out: &mut [f64]) {
    for k in 0..order {
        let angle = 2.0 * PI * (k + 1) as f64 * day / period;
        out[2 * k] = angle.sin();
        out[2 * k + 1] = angle.cos();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_is_finite_at_extremes() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!((sigmoid(800.0) - 1.0).abs() < 1e-15);
        assert!(sigmoid(-800.0) >= 0.0 && sigmoid(-800.0) < 1e-300);
        assert!(sigmoid(-800.0).is_finite());
    }

    #[test]
    fn logit_inverts_sigmoid() {
        for &x in &[-6.0, -1.0, 0.0, 0.3, 4.0] {
            assert!((logit(sigmoid(x)) - x).abs() < 1e-9);
        }
    }

    #[test]
    fn fourier_terms_repeat_every_period() {
        let mut a = [0.0; 6];
        let mut b = [0.0; 6];
        fourier_terms(3.0, WEEK_DAYS, 3, &mut a);
        fourier_terms(3.0 + WEEK_DAYS, WEEK_DAYS, 3, &mut b);
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-9);
        }
        // Day 0: every sine is 0, every cosine is 1.
        fourier_terms(0.0, YEAR_DAYS, 3, &mut a);
        assert_eq!(a, [0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn hinge_is_zero_before_changepoint() {
        assert_eq!(hinge(0.2, 0.5), 0.0);
        assert!((hinge(0.75, 0.5) - 0.25).abs() < 1e-15);
    }
}
