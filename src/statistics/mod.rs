//! Statistical primitives for latency curve analysis.
//!
//! - Quantile computation using efficient O(n) selection algorithms
//! - Dense least squares used by the smoother and the piecewise fitter

mod least_squares;
mod quantile;

pub use least_squares::{polyfit, polyval, solve, vandermonde, LeastSquares};
pub use quantile::{compute_quantile, median, median_of};
