//! Quantile computation using O(n) selection algorithms.
//!
//! This module provides efficient quantile computation using Rust's
//! `slice.select_nth_unstable()` which uses introselect for O(n) average time.
//! Chunk medians and median-of-medians reductions are both built on it.

/// Compute a single quantile from a mutable slice.
///
/// Uses `select_nth_unstable()` for O(n) expected time complexity.
/// The slice is partially reordered as a side effect.
///
/// # Arguments
///
/// * `data` - Mutable slice of measurements (will be partially reordered)
/// * `p` - Quantile probability in [0, 1]
///
/// # Returns
///
/// The quantile value at probability `p`.
///
/// # Panics
///
/// Panics if `data` is empty or if `p` is outside [0, 1].
pub fn compute_quantile(data: &mut [f64], p: f64) -> f64 {
    assert!(!data.is_empty(), "Cannot compute quantile of empty slice");
    assert!(
        (0.0..=1.0).contains(&p),
        "Quantile probability must be in [0, 1]"
    );

    let n = data.len();

    if n == 1 {
        return data[0];
    }

    // "R-7" quantile definition (linear interpolation)
    let h = (n - 1) as f64 * p;
    let h_floor = h.floor() as usize;
    let h_frac = h - h.floor();

    if h_floor >= n - 1 {
        let (_, &mut max, _) = data.select_nth_unstable_by(n - 1, |a, b| a.total_cmp(b));
        return max;
    }

    let (_, &mut lower, upper) = data.select_nth_unstable_by(h_floor, |a, b| a.total_cmp(b));

    if h_frac == 0.0 {
        return lower;
    }

    // The next order statistic is the minimum of the upper partition
    let upper_min = upper
        .iter()
        .copied()
        .min_by(|a, b| a.total_cmp(b))
        .unwrap_or(lower);

    lower + h_frac * (upper_min - lower)
}

/// Median of a mutable slice.
///
/// For an even number of values this is the mean of the two middle values,
/// matching the usual dataframe `median()` convention.
///
/// # Panics
///
/// Panics if `data` is empty.
pub fn median(data: &mut [f64]) -> f64 {
    compute_quantile(data, 0.5)
}

/// Median of a slice without disturbing the caller's ordering.
///
/// Returns `None` for an empty slice.
pub fn median_of(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let mut working = data.to_vec();
    Some(median(&mut working))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_quantile_median() {
        let mut data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let median = compute_quantile(&mut data, 0.5);
        assert!((median - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_compute_quantile_extremes() {
        let mut data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let min = compute_quantile(&mut data.clone(), 0.0);
        let max = compute_quantile(&mut data, 1.0);
        assert!((min - 1.0).abs() < 1e-10);
        assert!((max - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_median_even_count_averages_middle() {
        let mut data = vec![40.0, 10.0, 30.0, 20.0];
        assert!((median(&mut data) - 25.0).abs() < 1e-10);
    }

    #[test]
    fn test_median_of_leaves_input_untouched() {
        let data = vec![3.0, 1.0, 2.0];
        assert_eq!(median_of(&data), Some(2.0));
        assert_eq!(data, vec![3.0, 1.0, 2.0]);
        assert_eq!(median_of(&[]), None);
    }

    #[test]
    fn test_median_single_value() {
        let mut data = vec![7.5];
        assert_eq!(median(&mut data), 7.5);
    }

    #[test]
    #[should_panic(expected = "Cannot compute quantile of empty slice")]
    fn test_empty_slice_panics() {
        let mut data: Vec<f64> = vec![];
        compute_quantile(&mut data, 0.5);
    }
}
