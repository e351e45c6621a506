//! Model evaluation for the bounded logistic growth model.
//!
//! ```text
//! y(date) = floor + (cap - floor) · σ(η)
//! η = β0 + β1·t + Σ δ_j (t - c_j)+ + yearly Fourier(day) + weekly Fourier(day)
//! ```
//!
//! `t` is time on the scaled axis (0 at the first training day, 1 at the last),
//! `day` is the raw day offset used by the Fourier terms.
//!
//! The fitter relies on two primitive operations:
//! - build a design row for a given time (the Jacobian of η is that row)
//! - evaluate η / the unit-interval prediction given parameters

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Bounds, FitResult, ModelLayout};
use crate::math::{WEEK_DAYS, YEAR_DAYS, fourier_terms, hinge, sigmoid};

/// Fill a design row for `layout`.
///
/// # Panics
/// Debug builds panic if `out.len() != layout.param_len()`. Callers size the row from the layout.
pub fn fill_design_row(layout: &ModelLayout, t: f64, day: f64, out: &mut [f64]) {
    debug_assert_eq!(out.len(), layout.param_len());
    out[0] = 1.0;
    out[1] = t;

    let cps = layout.changepoints.len();
    for (j, &c) in layout.changepoints.iter().enumerate() {
        out[2 + j] = hinge(t, c);
    }

    let yearly_start = 2 + cps;
    let weekly_start = yearly_start + 2 * layout.yearly_order;
    fourier_terms(day, YEAR_DAYS, layout.yearly_order, &mut out[yearly_start..weekly_start]);
    fourier_terms(day, WEEK_DAYS, layout.weekly_order, &mut out[weekly_start..]);
}

/// Linear predictor η.
pub fn linear_predictor(layout: &ModelLayout, t: f64, day: f64, params: &[f64]) -> f64 {
    let mut row = vec![0.0; layout.param_len()];
    fill_design_row(layout, t, day, &mut row);
    row.iter().zip(params).map(|(x, b)| x * b).sum()
}

/// Prediction on the unit interval (`σ(η)`).
pub fn predict_unit(layout: &ModelLayout, t: f64, day: f64, params: &[f64]) -> f64 {
    sigmoid(linear_predictor(layout, t, day, params))
}

/// Maps calendar dates onto the model's time axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeScale {
    pub origin: NaiveDate,
    /// Training span in days (last training day minus `origin`, at least 1).
    pub span_days: f64,
}

impl TimeScale {
    pub fn new(origin: NaiveDate, last: NaiveDate) -> Self {
        let span = (last - origin).num_days().max(1) as f64;
        Self {
            origin,
            span_days: span,
        }
    }

    /// `(t, day)` for `date`.
    pub fn coordinates(&self, date: NaiveDate) -> (f64, f64) {
        let day = (date - self.origin).num_days() as f64;
        (day / self.span_days, day)
    }
}

/// A fitted model ready to project ridership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub scale: TimeScale,
    pub bounds: Bounds,
    pub fit: FitResult,
}

impl LogisticModel {
    /// Ridership for `date`, always inside the bounds.
    pub fn predict(&self, date: NaiveDate) -> f64 {
        let (t, day) = self.scale.coordinates(date);
        let u = predict_unit(&self.fit.layout, t, day, &self.fit.params);
        self.bounds.denormalize(u)
    }

    pub fn layout(&self) -> &ModelLayout {
        &self.fit.layout
    }
}
