//! Least squares solver.
//!
//! Every linear step of the fitter reduces to
//!
//! ```text
//! minimize ‖X β - y‖²
//! ```
//!
//! with `X` tall (one row per observed day, plus optional penalty rows).
//! The logit-space initial fit and each Gauss–Newton step both go through here.
//!
//! - Rows are pre-scaled by the caller (`sqrt(w_i)` for weights, `sqrt(λ)` for
//!   ridge rows), so this is a plain OLS solve.
//! - SVD handles rank-deficient designs (e.g. a changepoint past the last
//!   observation gives an all-zero hinge column) instead of panicking.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if no tolerance gives a finite solution.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Progressively looser singular value cutoffs.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Append ridge rows to a design so that column `j` pays `λ_j (offset_j + Δ_j)²`.
///
/// The solved vector is `Δ`; `offset` is the current parameter value (all
/// zeros when solving for the parameters directly). `penalties[j] == 0` adds
/// no row for column `j`.
pub fn with_ridge_rows(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    penalties: &[f64],
    offset: &[f64],
) -> (DMatrix<f64>, DVector<f64>) {
    let n = x.nrows();
    let p = x.ncols();
    let active: Vec<usize> = (0..p).filter(|&j| penalties[j] > 0.0).collect();
    if active.is_empty() {
        return (x.clone(), y.clone());
    }

    let rows = n + active.len();
    let mut xa = DMatrix::<f64>::zeros(rows, p);
    let mut ya = DVector::<f64>::zeros(rows);
    xa.rows_mut(0, n).copy_from(x);
    ya.rows_mut(0, n).copy_from(y);

    for (k, &j) in active.iter().enumerate() {
        let s = penalties[j].sqrt();
        xa[(n + k, j)] = s;
        ya[n + k] = -s * offset[j];
    }
    (xa, ya)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn zero_column_gets_zero_coefficient() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
        let y = DVector::from_row_slice(&[4.0, 4.0, 4.0]);
        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 4.0).abs() < 1e-10);
        assert!(beta[1].abs() < 1e-10);
    }

    #[test]
    fn ridge_rows_shrink_towards_zero() {
        let x = DMatrix::from_row_slice(2, 1, &[1.0, 1.0]);
        let y = DVector::from_row_slice(&[3.0, 3.0]);
        let (xa, ya) = with_ridge_rows(&x, &y, &[2.0], &[0.0]);
        assert_eq!(xa.nrows(), 3);
        let beta = solve_least_squares(&xa, &ya).unwrap();
        // (2·3) / (2 + 2) = 1.5
        assert!((beta[0] - 1.5).abs() < 1e-10);

        let (xn, _) = with_ridge_rows(&x, &y, &[0.0], &[0.0]);
        assert_eq!(xn.nrows(), 2);
    }
}
