//! Detection strategies applied to aggregated latency curves.
//!
//! Each probe maps a curve to one estimate:
//!
//! 1. **Ratio threshold** ([`detect_line_size`]): first large latency drop between strides
//! 2. **Maximum positive delta** ([`detect_associativity`]): last value before the sharpest rise
//! 3. **Knee** ([`find_knee`]): Kneedle elbow bounding the cache capacity from above
//! 4. **Piecewise regression** ([`fit_piecewise`]): last breakpoint of a continuous linear fit
//!
//! All of them are pure functions of the curve and their parameters.

mod associativity;
mod knee;
mod line_size;
mod piecewise;

pub use associativity::{detect_associativity, positive_deltas};
pub use knee::find_knee;
pub use line_size::detect_line_size;
pub use piecewise::{fit_piecewise, PiecewiseFit};
