//! Ordinary least squares.
//!
//! Every fit in this crate is a straight line through `(t, ln y)` points, so
//! the design matrix is always `n x 2` with an intercept column. We still go
//! through a general SVD solve:
//!
//! - the design matrix is tall (more rows than columns), which rules out
//!   nalgebra's square `QR::solve`
//! - SVD degrades gracefully when the window is degenerate

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Straight-line fit `y = intercept + slope * x`.
///
/// Returns `(intercept, slope)`, or `None` with fewer than two points, mismatched
/// lengths or a singular system.
pub fn fit_line(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let n = xs.len();
    if n < 2 || ys.len() != n {
        return None;
    }

    let x = DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { xs[i] });
    let y = DVector::from_column_slice(ys);
    let beta = solve_least_squares(&x, &y)?;
    Some((beta[0], beta[1]))
}
