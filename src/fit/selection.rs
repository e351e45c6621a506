//! Layout selection using BIC with guardrails.
//!
//! Every candidate layout is fitted and scored:
//! - SSE / RMSE in ride units
//! - BIC = n * ln(SSE/n) + k * ln(n)
//!
//! Selection rules:
//! 1. Exclude underdetermined layouts: require `n >= k + 5`
//! 2. Choose the layout with minimum BIC
//! 3. If a simpler layout is within 2 BIC of the best, pick the simplest such layout

use rayon::prelude::*;

use crate::domain::{Bounds, FitQuality, FitResult, ForecastConfig, ModelLayout};
use crate::error::RidershipError;
use crate::fit::fitter::{FitOptions, LayoutFit, Observations, fit_layout};
use crate::fit::grid::candidate_layouts;

/// Minimum number of extra observations beyond parameter count.
const MIN_N_BUFFER: usize = 5;

/// BIC points within which a simpler layout beats the minimum.
const BIC_SLACK: f64 = 2.0;

/// Output of fitting + selection.
#[derive(Debug, Clone)]
pub struct FitSelection {
    pub best: FitResult,
    /// Fits for all attempted layouts (after guardrails), in grid order.
    pub fits: Vec<FitResult>,
    /// Layouts that were skipped and why (for diagnostics).
    pub skipped: Vec<(ModelLayout, String)>,
}

/// Fit every candidate layout in parallel and select the best one.
///
/// A convergence failure of any attempted layout is returned as-is (the first
/// failing layout in grid order, so the outcome doesn't depend on scheduling).
pub fn fit_and_select(
    obs: &Observations,
    bounds: Bounds,
    config: &ForecastConfig,
) -> Result<FitSelection, RidershipError> {
    let n = obs.len();
    let opts = FitOptions::from(config);

    let mut attempted = Vec::new();
    let mut skipped = Vec::new();
    for layout in candidate_layouts(config) {
        let k = layout.param_len();
        if n < k + MIN_N_BUFFER {
            skipped.push((
                layout,
                format!("Underdetermined: n={n} < k+{MIN_N_BUFFER}={}", k + MIN_N_BUFFER),
            ));
        } else {
            attempted.push(layout);
        }
    }

    if attempted.is_empty() {
        return Err(RidershipError::InsufficientHistory {
            required: smallest_required(&skipped),
            actual: n,
        });
    }

    // Evaluate each layout independently (parallel); results keep grid order.
    let results: Vec<Result<LayoutFit, RidershipError>> = attempted
        .par_iter()
        .map(|layout| fit_layout(layout, obs, bounds, &opts))
        .collect();

    let mut fits = Vec::with_capacity(results.len());
    for result in results {
        fits.push(to_fit_result(result?));
    }

    let best = select_by_bic(&fits);
    log::debug!(
        "selected {} (bic={:.2}) out of {} fitted, {} skipped",
        best.layout.display_name(),
        best.quality.bic,
        fits.len(),
        skipped.len()
    );

    Ok(FitSelection {
        best,
        fits,
        skipped,
    })
}

/// Score a single-layout fit.
pub fn to_fit_result(fit: LayoutFit) -> FitResult {
    let k = fit.layout.param_len();
    FitResult {
        quality: FitQuality {
            sse: fit.sse,
            rmse: fit.rmse,
            bic: bic(fit.n, fit.sse, k),
            n: fit.n,
            iterations: fit.iterations,
        },
        layout: fit.layout,
        params: fit.params,
    }
}

fn bic(n: usize, sse: f64, k: usize) -> f64 {
    let n_f = n as f64;
    let sse_per = (sse / n_f).max(1e-12);
    n_f * sse_per.ln() + (k as f64) * n_f.ln()
}

fn select_by_bic(fits: &[FitResult]) -> FitResult {
    // Find minimum BIC.
    let mut best = &fits[0];
    for f in &fits[1..] {
        if f.quality.bic < best.quality.bic {
            best = f;
        }
    }

    let best_bic = best.quality.bic;

    // Prefer simplicity if within 2 BIC points: walk in order of increasing
    // parameter count (grid order breaks ties) and take the first close fit.
    let mut by_complexity: Vec<&FitResult> = fits.iter().collect();
    by_complexity.sort_by_key(|f| f.layout.param_len());
    for f in by_complexity {
        if f.quality.bic <= best_bic + BIC_SLACK {
            return f.clone();
        }
    }

    best.clone()
}

fn smallest_required(skipped: &[(ModelLayout, String)]) -> usize {
    skipped
        .iter()
        .map(|(layout, _)| layout.param_len() + MIN_N_BUFFER)
        .min()
        .unwrap_or(MIN_N_BUFFER)
}
