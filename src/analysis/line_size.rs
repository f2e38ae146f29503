//! Ratio-threshold detector for the cache line size.
//!
//! A stride sweep is slow while each access still lands on a new line and
//! drops sharply once the stride exceeds the line, so the line size is the
//! last stride before a large latency ratio between neighbours.

use crate::result::ChangePoint;
use crate::types::Curve;

/// Return `Detected(x[i])` for the first `i` with `y[i] >= threshold * y[i+1]`.
///
/// If no adjacent pair crosses the threshold the true line size lies at or
/// beyond the tested strides, reported as `Fallback(fallback)`. Curves with
/// fewer than two points give `NoSignal`.
pub fn detect_line_size(curve: &Curve, threshold: f64, fallback: f64) -> ChangePoint {
    if curve.len() < 2 {
        return ChangePoint::NoSignal;
    }
    let (x, y) = (curve.x(), curve.y());
    y.windows(2)
        .position(|pair| pair[0] >= threshold * pair[1])
        .map_or(ChangePoint::Fallback(fallback), |i| ChangePoint::Detected(x[i]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(y: &[f64]) -> Curve {
        Curve::new(vec![64.0, 128.0, 256.0, 512.0], y.to_vec()).unwrap()
    }

    #[test]
    fn test_detects_first_crossing() {
        // 100 / 58 ≈ 1.72
        let result = detect_line_size(&curve(&[100.0, 100.0, 58.0, 57.0]), 1.7, 4096.0);
        assert_eq!(result, ChangePoint::Detected(128.0));
    }

    #[test]
    fn test_falls_back_below_threshold() {
        // 100 / 60 ≈ 1.67
        let result = detect_line_size(&curve(&[100.0, 100.0, 60.0, 59.0]), 1.7, 4096.0);
        assert_eq!(result, ChangePoint::Fallback(4096.0));
    }

    #[test]
    fn test_exact_ratio_counts() {
        let result = detect_line_size(&curve(&[17.0, 10.0, 10.0, 10.0]), 1.7, 4096.0);
        assert_eq!(result, ChangePoint::Detected(64.0));
    }

    #[test]
    fn test_short_curve_has_no_signal() {
        let single = Curve::new(vec![64.0], vec![1.0]).unwrap();
        assert_eq!(detect_line_size(&single, 1.7, 4096.0), ChangePoint::NoSignal);
        assert_eq!(
            detect_line_size(&Curve::default(), 1.7, 4096.0),
            ChangePoint::NoSignal
        );
    }
}
