//! Dense least-squares helpers on top of `nalgebra`.
//!
//! Both the local polynomial smoother and the piecewise linear fitter reduce
//! to small overdetermined systems `A * beta ≈ y`. They are solved through
//! the SVD so rank-deficient designs (coincident breakpoints, repeated
//! columns) still produce the minimum-norm solution instead of failing.

use nalgebra::{DMatrix, DVector};

/// Singular values below this (relative to the largest) are treated as zero.
const SVD_RELATIVE_EPS: f64 = 1e-12;

/// Solution of a least-squares problem.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    /// Fitted coefficients, one per design column.
    pub beta: DVector<f64>,
    /// Residual sum of squares `||A * beta - y||^2`.
    pub rss: f64,
}

/// Solve `min ||A * beta - y||^2` for `beta`.
///
/// Returns `None` if the design is empty or the decomposition fails.
pub fn solve(design: &DMatrix<f64>, y: &DVector<f64>) -> Option<LeastSquares> {
    if design.nrows() == 0 || design.ncols() == 0 || design.nrows() != y.len() {
        return None;
    }

    let svd = design.clone().svd(true, true);
    let max_sv = svd.singular_values.max();
    let eps = (max_sv * SVD_RELATIVE_EPS).max(f64::MIN_POSITIVE);
    let beta = svd.solve(y, eps).ok()?;

    let residual = design * &beta - y;
    let rss = residual.norm_squared();

    Some(LeastSquares { beta, rss })
}

/// Vandermonde design `[1, t, t^2, ..., t^degree]`.
pub fn vandermonde(t: &[f64], degree: usize) -> DMatrix<f64> {
    DMatrix::from_fn(t.len(), degree + 1, |row, col| t[row].powi(col as i32))
}

/// Fit a polynomial of `degree` to `(t, y)`; coefficients in ascending power.
pub fn polyfit(t: &[f64], y: &[f64], degree: usize) -> Option<DVector<f64>> {
    if t.len() != y.len() || t.len() <= degree {
        return None;
    }
    let design = vandermonde(t, degree);
    let rhs = DVector::from_column_slice(y);
    solve(&design, &rhs).map(|fit| fit.beta)
}

/// Evaluate ascending-power polynomial coefficients at `t` (Horner's rule).
pub fn polyval(coefficients: &DVector<f64>, t: f64) -> f64 {
    coefficients
        .as_slice()
        .iter()
        .rev()
        .fold(0.0, |acc, &c| acc * t + c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_exact_line() {
        let design = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_column_slice(&[1.0, 3.0, 5.0]);
        let fit = solve(&design, &y).unwrap();
        assert!((fit.beta[0] - 1.0).abs() < 1e-10);
        assert!((fit.beta[1] - 2.0).abs() < 1e-10);
        assert!(fit.rss < 1e-18);
    }

    #[test]
    fn test_solve_rank_deficient_does_not_fail() {
        // Two identical columns
        let design = DMatrix::from_row_slice(3, 2, &[1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        let y = DVector::from_column_slice(&[2.0, 2.0, 2.0]);
        let fit = solve(&design, &y).unwrap();
        assert!((fit.beta[0] + fit.beta[1] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_polyfit_recovers_cubic() {
        let t: Vec<f64> = (-3..=3).map(|v| v as f64).collect();
        let y: Vec<f64> = t.iter().map(|&v| 2.0 - v + 0.5 * v * v * v).collect();
        let coeffs = polyfit(&t, &y, 3).unwrap();
        assert!((polyval(&coeffs, 1.5) - (2.0 - 1.5 + 0.5 * 1.5f64.powi(3))).abs() < 1e-9);
    }

    #[test]
    fn test_polyfit_needs_enough_points() {
        assert!(polyfit(&[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0], 3).is_none());
    }
}
