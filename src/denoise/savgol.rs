//! Savitzky-Golay (local cubic) smoothing.
//!
//! Interior points are the value at the window center of a least-squares
//! cubic fitted to the surrounding window, computed as a fixed convolution.
//! The first and last half-window points cannot be centered; for those the
//! cubic is fitted to the first (or last) full window and evaluated at the
//! edge positions. Positions are sample indices, not x values.

use crate::constants::LOCAL_POLYNOMIAL_DEGREE;
use crate::error::{ProbeError, Result};
use crate::statistics::{polyfit, polyval, vandermonde};

/// Convolution weights that evaluate the window's fitted polynomial at its center.
fn center_weights(window: usize, degree: usize) -> Result<Vec<f64>> {
    let half = (window / 2) as f64;
    let t: Vec<f64> = (0..window).map(|i| i as f64 - half).collect();
    let pinv = vandermonde(&t, degree)
        .pseudo_inverse(1e-12)
        .map_err(|e| ProbeError::invalid_config(format!("local polynomial design: {e}")))?;
    // Row 0 maps samples to the constant coefficient, the fit's value at t = 0
    Ok(pinv.row(0).iter().copied().collect())
}

/// Fit the polynomial to `y[start..start + window]` and evaluate it at
/// offsets `from..to` within that window.
fn fit_edge(y: &[f64], start: usize, window: usize, from: usize, to: usize, out: &mut [f64]) -> Result<()> {
    let t: Vec<f64> = (0..window).map(|i| i as f64).collect();
    let coefficients = polyfit(&t, &y[start..start + window], LOCAL_POLYNOMIAL_DEGREE)
        .ok_or_else(|| ProbeError::invalid_config("local polynomial edge fit failed"))?;
    for offset in from..to {
        out[start + offset] = polyval(&coefficients, offset as f64);
    }
    Ok(())
}

/// Smooth `y` with a cubic Savitzky-Golay filter of odd `window`.
///
/// Requires `window` odd, larger than the polynomial degree, and no larger
/// than `y.len()`.
pub fn savitzky_golay(y: &[f64], window: usize) -> Result<Vec<f64>> {
    let degree = LOCAL_POLYNOMIAL_DEGREE;
    if window % 2 == 0 || window <= degree {
        return Err(ProbeError::invalid_config(format!(
            "local polynomial window must be odd and greater than {degree}, got {window}"
        )));
    }
    let n = y.len();
    if n < window {
        return Err(ProbeError::invalid_config(format!(
            "local polynomial window {window} exceeds curve length {n}"
        )));
    }

    let half = window / 2;
    let weights = center_weights(window, degree)?;
    let mut out = vec![0.0; n];

    for (i, slot) in out.iter_mut().enumerate().take(n - half).skip(half) {
        *slot = weights
            .iter()
            .zip(&y[i - half..=i + half])
            .map(|(w, v)| w * v)
            .sum();
    }

    fit_edge(y, 0, window, 0, half, &mut out)?;
    fit_edge(y, n - window, window, window - half, window, &mut out)?;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cubic_is_reproduced_exactly() {
        let y: Vec<f64> = (0..12)
            .map(|i| {
                let t = i as f64;
                0.1 * t * t * t - t * t + 3.0
            })
            .collect();
        let smoothed = savitzky_golay(&y, 5).unwrap();
        for (a, b) in y.iter().zip(&smoothed) {
            assert!((a - b).abs() < 1e-8, "{a} vs {b}");
        }
    }

    #[test]
    fn test_known_center_weights() {
        // Classic 5-point cubic smoothing weights: (-3, 12, 17, 12, -3) / 35
        let weights = center_weights(5, 3).unwrap();
        let expected = [-3.0, 12.0, 17.0, 12.0, -3.0].map(|w| w / 35.0);
        for (w, e) in weights.iter().zip(expected) {
            assert!((w - e).abs() < 1e-12);
        }
    }

    #[test]
    fn test_spike_is_attenuated() {
        let mut y = vec![1.0; 11];
        y[5] = 10.0;
        let smoothed = savitzky_golay(&y, 5).unwrap();
        assert!(smoothed[5] < 10.0);
        assert_eq!(smoothed.len(), y.len());
    }

    #[test]
    fn test_rejects_even_or_small_window() {
        let y = vec![1.0; 10];
        assert!(savitzky_golay(&y, 4).is_err());
        assert!(savitzky_golay(&y, 3).is_err());
        assert!(savitzky_golay(&y, 11).is_err());
    }
}
