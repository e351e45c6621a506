//! Low-level fitting routine for a single model layout.
//!
//! Given:
//! - observed days (scaled time `t`, day offset, ride count `y`)
//! - bounds `[floor, cap]`
//! - a layout (changepoints + Fourier orders)
//!
//! we fit the parameters of
//!
//! ```text
//! u = (y - floor) / (cap - floor) ≈ σ(X β)
//! ```
//!
//! by minimizing `Σ w_i (u_i - σ(x_i β))² + Σ λ_j β_j²`:
//!
//! 1. initialise with a ridge least squares fit of `logit(u)` on `X`
//! 2. damped Gauss–Newton (Jacobian `σ(1-σ) x_i`, step halving on no decrease)
//! 3. optionally repeat 2 with Huber weights from the unit-scale residuals

use nalgebra::{DMatrix, DVector};

use crate::domain::{Bounds, DailySeries, ForecastConfig, ModelLayout, RobustKind};
use crate::error::RidershipError;
use crate::math::{logit, sigmoid, solve_least_squares, with_ridge_rows};
use crate::models::{TimeScale, fill_design_row};

/// Unit-scale targets are clamped this far inside `(0, 1)` before `logit`.
const LOGIT_EPS: f64 = 1e-4;

/// Step halvings tried before an iteration is declared stalled.
const MAX_HALVINGS: usize = 30;

/// Relative parameter step below which Gauss–Newton stops.
const MIN_REL_STEP: f64 = 1e-10;

/// Observed days of one training window on the model's time axes.
#[derive(Debug, Clone)]
pub struct Observations {
    pub scale: TimeScale,
    pub t: Vec<f64>,
    pub day: Vec<f64>,
    pub y: Vec<f64>,
}

impl Observations {
    /// Non-null days of `series`. The time axis spans the full series, gaps included.
    pub fn from_series(series: &DailySeries) -> Self {
        let scale = TimeScale::new(series.first_date(), series.last_date());
        let mut out = Self {
            scale,
            t: Vec::with_capacity(series.len()),
            day: Vec::with_capacity(series.len()),
            y: Vec::with_capacity(series.len()),
        };
        for obs in series.days() {
            let Some(rides) = obs.rides.filter(|r| r.is_finite()) else {
                continue;
            };
            let (t, day) = scale.coordinates(obs.date);
            out.t.push(t);
            out.day.push(day);
            out.y.push(rides);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// Fitting options that affect how each layout is calibrated.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Ridge weight on changepoint slope adjustments.
    pub changepoint_penalty: f64,
    /// Ridge weight on Fourier coefficients.
    pub seasonality_penalty: f64,
    pub max_iters: usize,
    pub tolerance: f64,

    /// Robust fitting mode (outlier downweighting).
    pub robust: RobustKind,
    /// Number of IRLS reweight iterations.
    pub robust_iters: usize,
    /// Huber tuning constant.
    pub robust_k: f64,
}

impl From<&ForecastConfig> for FitOptions {
    fn from(config: &ForecastConfig) -> Self {
        Self {
            changepoint_penalty: config.changepoint_penalty,
            seasonality_penalty: config.seasonality_penalty,
            max_iters: config.max_iters,
            tolerance: config.tolerance,
            robust: config.robust,
            robust_iters: config.robust_iters,
            robust_k: config.robust_k,
        }
    }
}

/// Best fit for a single layout.
#[derive(Debug, Clone)]
pub struct LayoutFit {
    pub layout: ModelLayout,
    pub params: Vec<f64>,
    /// Unweighted SSE in ride units.
    pub sse: f64,
    pub rmse: f64,
    pub n: usize,
    /// Gauss–Newton iterations over all robust passes.
    pub iterations: usize,
}

/// Fit a single layout.
pub fn fit_layout(
    layout: &ModelLayout,
    obs: &Observations,
    bounds: Bounds,
    opts: &FitOptions,
) -> Result<LayoutFit, RidershipError> {
    let n = obs.len();
    let p = layout.param_len();
    if n < p {
        return Err(convergence(
            0,
            format!("{} has {p} parameters but only {n} observations", layout.display_name()),
        ));
    }

    let x = design_matrix(layout, obs);
    let u: Vec<f64> = obs.y.iter().map(|&y| bounds.normalize(y)).collect();
    let penalties = penalty_vector(layout, opts);

    let w_base = vec![1.0; n];
    let mut w = w_base.clone();
    let mut params = initial_params(&x, &u, &w, &penalties)?;

    // Robust fitting is a small number of outer passes: fit, compute
    // residuals, update Huber weights, refit from the previous solution.
    let n_passes = match opts.robust {
        RobustKind::None => 1,
        RobustKind::Huber => opts.robust_iters.saturating_add(1).max(1),
    };

    let mut iterations = 0;
    for pass in 0..n_passes {
        let (next, iters) = gauss_newton(&x, &u, &w, &penalties, params, opts, iterations)?;
        params = next;
        iterations += iters;

        if pass + 1 == n_passes {
            break;
        }
        let residuals = unit_residuals(&x, &u, &params);
        w = huber_reweight(&w_base, &residuals, opts.robust_k);
    }

    let fitted = &x * &params;
    let sse: f64 = obs
        .y
        .iter()
        .zip(fitted.iter())
        .map(|(&y, &eta)| {
            let r = y - bounds.denormalize(sigmoid(eta));
            r * r
        })
        .sum();

    if !sse.is_finite() {
        return Err(convergence(iterations, "non-finite SSE".to_string()));
    }

    log::debug!(
        "fit {}: sse={sse:.3e} iterations={iterations}",
        layout.display_name()
    );

    Ok(LayoutFit {
        layout: layout.clone(),
        params: params.iter().copied().collect(),
        sse,
        rmse: (sse / n as f64).sqrt(),
        n,
        iterations,
    })
}

fn design_matrix(layout: &ModelLayout, obs: &Observations) -> DMatrix<f64> {
    let p = layout.param_len();
    let mut x = DMatrix::<f64>::zeros(obs.len(), p);
    let mut row = vec![0.0; p];
    for i in 0..obs.len() {
        fill_design_row(layout, obs.t[i], obs.day[i], &mut row);
        for (j, &v) in row.iter().enumerate() {
            x[(i, j)] = v;
        }
    }
    x
}

fn penalty_vector(layout: &ModelLayout, opts: &FitOptions) -> Vec<f64> {
    let mut penalties = vec![0.0; layout.param_len()];
    for j in layout.changepoint_params() {
        penalties[j] = opts.changepoint_penalty;
    }
    for j in layout.seasonal_params() {
        penalties[j] = opts.seasonality_penalty;
    }
    penalties
}

fn initial_params(
    x: &DMatrix<f64>,
    u: &[f64],
    w: &[f64],
    penalties: &[f64],
) -> Result<DVector<f64>, RidershipError> {
    let (n, p) = x.shape();
    let mut xw = x.clone();
    let mut zw = DVector::<f64>::zeros(n);
    for i in 0..n {
        let sw = w[i].sqrt();
        for j in 0..p {
            xw[(i, j)] *= sw;
        }
        zw[i] = logit(u[i].clamp(LOGIT_EPS, 1.0 - LOGIT_EPS)) * sw;
    }

    let (xa, za) = with_ridge_rows(&xw, &zw, penalties, &vec![0.0; p]);
    solve_least_squares(&xa, &za)
        .ok_or_else(|| convergence(0, "singular logit-space initial fit".to_string()))
}

fn objective(x: &DMatrix<f64>, u: &[f64], w: &[f64], penalties: &[f64], beta: &DVector<f64>) -> f64 {
    let eta = x * beta;
    let data: f64 = eta
        .iter()
        .zip(u.iter().zip(w))
        .map(|(&e, (&ui, &wi))| {
            let r = ui - sigmoid(e);
            wi * r * r
        })
        .sum();
    let ridge: f64 = penalties.iter().zip(beta.iter()).map(|(l, b)| l * b * b).sum();
    data + ridge
}

/// Damped Gauss–Newton from `start`. Returns the parameters and iterations used.
///
/// `done` is the iteration count of earlier passes (only used in error reports).
fn gauss_newton(
    x: &DMatrix<f64>,
    u: &[f64],
    w: &[f64],
    penalties: &[f64],
    start: DVector<f64>,
    opts: &FitOptions,
    done: usize,
) -> Result<(DVector<f64>, usize), RidershipError> {
    let (n, p) = x.shape();
    let mut beta = start;
    let mut obj = objective(x, u, w, penalties, &beta);
    if !obj.is_finite() {
        return Err(convergence(done, "non-finite objective at start".to_string()));
    }

    for iter in 1..=opts.max_iters {
        let eta = x * &beta;
        let mut jac = x.clone();
        let mut r = DVector::<f64>::zeros(n);
        for i in 0..n {
            let s = sigmoid(eta[i]);
            let sw = w[i].sqrt();
            let g = s * (1.0 - s) * sw;
            for j in 0..p {
                jac[(i, j)] *= g;
            }
            r[i] = (u[i] - s) * sw;
        }

        let (ja, ra) = with_ridge_rows(&jac, &r, penalties, beta.as_slice());
        let delta = solve_least_squares(&ja, &ra)
            .ok_or_else(|| convergence(done + iter, "singular Gauss-Newton system".to_string()))?;

        let mut step = 1.0;
        let mut accepted = None;
        let mut last_obj = obj;
        for _ in 0..MAX_HALVINGS {
            let candidate = &beta + &delta * step;
            last_obj = objective(x, u, w, penalties, &candidate);
            if last_obj.is_finite() && last_obj < obj {
                accepted = Some((candidate, last_obj));
                break;
            }
            step *= 0.5;
        }

        let Some((next, next_obj)) = accepted else {
            if !last_obj.is_finite() {
                return Err(convergence(done + iter, "non-finite objective".to_string()));
            }
            // No descent direction left: stationary point.
            return Ok((beta, iter));
        };

        let rel_change = (obj - next_obj) / obj.max(f64::MIN_POSITIVE);
        let step_norm = (&next - &beta).norm();
        beta = next;
        obj = next_obj;

        if rel_change < opts.tolerance || step_norm < MIN_REL_STEP * (1.0 + beta.norm()) {
            return Ok((beta, iter));
        }
    }

    Err(convergence(
        done + opts.max_iters,
        format!("no convergence within {} iterations", opts.max_iters),
    ))
}

fn unit_residuals(x: &DMatrix<f64>, u: &[f64], beta: &DVector<f64>) -> Vec<f64> {
    let eta = x * beta;
    u.iter().zip(eta.iter()).map(|(&ui, &e)| ui - sigmoid(e)).collect()
}

fn convergence(iterations: usize, reason: String) -> RidershipError {
    RidershipError::ModelConvergence { iterations, reason }
}

fn huber_reweight(w_base: &[f64], residuals: &[f64], k: f64) -> Vec<f64> {
    // Scale via MAD (median absolute deviation).
    let mut abs: Vec<f64> = residuals.iter().map(|r| r.abs()).filter(|v| v.is_finite()).collect();
    let mad = median_mut(&mut abs).unwrap_or(0.0);
    let scale = (mad / 0.6745).max(1e-12);
    let cutoff = (k.max(1e-6)) * scale;

    let min_factor = 1e-3;
    w_base
        .iter()
        .zip(residuals.iter())
        .map(|(&w0, &r)| {
            let ar = r.abs();
            let factor = if ar <= cutoff || !ar.is_finite() { 1.0 } else { cutoff / ar };
            (w0 * factor).max(w0 * min_factor)
        })
        .collect()
}

fn median_mut(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}
