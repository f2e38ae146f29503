//! Maximum-positive-delta detector for set associativity.
//!
//! Latency stays flat while the accessed lines fit in one set and jumps once
//! they exceed the number of ways. Decreases are treated as noise.

use crate::result::ChangePoint;
use crate::types::Curve;

/// Clipped first differences: `c[0] = 0`, `c[i] = max(y[i] - y[i-1], 0)`.
///
/// Non-finite differences count as zero.
pub fn positive_deltas(y: &[f64]) -> Vec<f64> {
    let mut changes = Vec::with_capacity(y.len());
    if y.is_empty() {
        return changes;
    }
    changes.push(0.0);
    changes.extend(y.windows(2).map(|pair| {
        let delta = pair[1] - pair[0];
        if delta.is_finite() {
            delta.max(0.0)
        } else {
            0.0
        }
    }));
    changes
}

/// Return the x just before the sharpest latency rise.
///
/// `k` is the first index of the largest clipped difference. `k > 0` gives
/// `Detected(x[k-1])`; `k == 0` (no rise at all) and empty curves give
/// `NoSignal`.
pub fn detect_associativity(curve: &Curve) -> ChangePoint {
    let changes = positive_deltas(curve.y());
    let mut k = 0;
    for (i, &change) in changes.iter().enumerate() {
        if change > changes[k] {
            k = i;
        }
    }
    if k > 0 {
        ChangePoint::Detected(curve.x()[k - 1])
    } else {
        ChangePoint::NoSignal
    }
}
