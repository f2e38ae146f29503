//! Kneedle knee location for concave, increasing curves.
//!
//! Both axes are normalized to `[0, 1]` and the difference curve
//! `d = y_n - x_n` is scanned for local maxima. After each maximum a
//! threshold slightly below it is armed; the knee is the most recent maximum
//! when `d` first falls under the armed threshold. Local minima disarm the
//! threshold. The curve is evaluated only at its sample points.

use log::debug;

use crate::result::{KneeResult, NoKneeReason};
use crate::types::Curve;

fn normalize(values: &[f64]) -> Option<Vec<f64>> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;
    if !(range.is_finite() && range > 0.0) {
        return None;
    }
    Some(values.iter().map(|v| (v - min) / range).collect())
}

/// Indices where `keep(d[i], neighbour)` holds for both neighbours.
///
/// Endpoints compare against their single neighbour.
fn relative_extrema(d: &[f64], keep: impl Fn(f64, f64) -> bool) -> Vec<usize> {
    let last = d.len() - 1;
    (0..d.len())
        .filter(|&i| {
            let before = d[i.saturating_sub(1)];
            let after = d[(i + 1).min(last)];
            keep(d[i], before) && keep(d[i], after)
        })
        .collect()
}

/// Locate the knee of `curve` with sensitivity `sensitivity` (Kneedle `S`).
pub fn find_knee(curve: &Curve, sensitivity: f64) -> KneeResult {
    let n = curve.len();
    if n < 3 {
        return KneeResult::NotFound(NoKneeReason::TooFewPoints);
    }
    let (Some(x_n), Some(y_n)) = (normalize(curve.x()), normalize(curve.y())) else {
        return KneeResult::NotFound(NoKneeReason::FlatCurve);
    };

    let d: Vec<f64> = y_n.iter().zip(&x_n).map(|(y, x)| y - x).collect();
    let maxima = relative_extrema(&d, |v, other| v >= other);
    let minima = relative_extrema(&d, |v, other| v <= other);

    let Some(&first_maximum) = maxima.first() else {
        return KneeResult::NotFound(NoKneeReason::NoLocalMaximum);
    };

    let mean_step = x_n.windows(2).map(|w| w[1] - w[0]).sum::<f64>() / (n - 1) as f64;
    let offset = sensitivity * mean_step.abs();

    let mut threshold = 0.0;
    let mut threshold_index = first_maximum;
    let mut next_maximum = 0;
    for i in first_maximum..n - 1 {
        if maxima.get(next_maximum) == Some(&i) {
            threshold = d[i] - offset;
            threshold_index = i;
            next_maximum += 1;
        }
        if minima.binary_search(&i).is_ok() {
            threshold = 0.0;
        }
        if d[i + 1] < threshold {
            debug!(
                "knee at index {threshold_index} (d={:.4}, threshold={threshold:.4})",
                d[threshold_index]
            );
            return KneeResult::Found {
                x: curve.x()[threshold_index],
                normalized_x: x_n[threshold_index],
            };
        }
    }

    KneeResult::NotFound(NoKneeReason::NoThresholdCrossing)
}
