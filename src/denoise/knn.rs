//! Uniform-weight k-nearest-neighbour regression on a one-dimensional x.
//!
//! Because x is sorted, the k nearest neighbours of a point always form a
//! contiguous window containing it. The window grows from the point itself
//! toward whichever side is closer; on equal distance the left (lower index)
//! neighbour wins, which keeps the result deterministic.

use crate::error::{ProbeError, Result};

/// Inclusive bounds `[left, right]` of a neighbourhood.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Neighbourhood {
    left: usize,
    right: usize,
}

impl Neighbourhood {
    fn around(x: &[f64], center: usize, k: usize) -> Self {
        let n = x.len();
        let mut hood = Self {
            left: center,
            right: center,
        };
        while hood.right - hood.left + 1 < k {
            if hood.left == 0 {
                hood.right += 1;
            } else if hood.right == n - 1 {
                hood.left -= 1;
            } else {
                let d_left = x[center] - x[hood.left - 1];
                let d_right = x[hood.right + 1] - x[center];
                if d_left <= d_right {
                    hood.left -= 1;
                } else {
                    hood.right += 1;
                }
            }
        }
        hood
    }
}

/// Predict y at every x as the mean y of its `k` nearest neighbours
/// (the point itself included).
///
/// `x` must be sorted ascending; requires `1 <= k <= x.len()`.
pub fn knn_regression(x: &[f64], y: &[f64], k: usize) -> Result<Vec<f64>> {
    let n = x.len();
    if x.len() != y.len() {
        return Err(ProbeError::invalid_config(format!(
            "knn input lengths differ: x={} y={}",
            x.len(),
            y.len()
        )));
    }
    if k == 0 || k > n {
        return Err(ProbeError::invalid_config(format!(
            "knn neighbours must be in 1..={n}, got {k}"
        )));
    }

    Ok((0..n)
        .map(|i| {
            let hood = Neighbourhood::around(x, i, k);
            y[hood.left..=hood.right].iter().sum::<f64>() / k as f64
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_neighbour_is_identity() {
        let x = [1.0, 2.0, 3.0];
        let y = [5.0, 7.0, 9.0];
        assert_eq!(knn_regression(&x, &y, 1).unwrap(), y.to_vec());
    }

    #[test]
    fn test_all_neighbours_is_global_mean() {
        let x = [1.0, 2.0, 4.0, 8.0];
        let y = [1.0, 2.0, 3.0, 6.0];
        let out = knn_regression(&x, &y, 4).unwrap();
        assert!(out.iter().all(|v| (v - 3.0).abs() < 1e-12));
    }

    #[test]
    fn test_neighbourhood_prefers_closer_side() {
        let x = [0.0, 10.0, 11.0, 12.0];
        // Nearest two to x=10 are 10 and 11
        assert_eq!(
            Neighbourhood::around(&x, 1, 2),
            Neighbourhood { left: 1, right: 2 }
        );
        // Edges grow inward
        assert_eq!(
            Neighbourhood::around(&x, 0, 3),
            Neighbourhood { left: 0, right: 2 }
        );
    }

    #[test]
    fn test_tie_prefers_left() {
        let x = [0.0, 1.0, 2.0];
        assert_eq!(
            Neighbourhood::around(&x, 1, 2),
            Neighbourhood { left: 0, right: 1 }
        );
    }

    #[test]
    fn test_rejects_too_many_neighbours() {
        assert!(knn_regression(&[1.0, 2.0], &[1.0, 2.0], 3).is_err());
        assert!(knn_regression(&[1.0, 2.0], &[1.0, 2.0], 0).is_err());
    }
}
