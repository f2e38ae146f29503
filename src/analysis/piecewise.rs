//! Continuous piecewise-linear least squares with optimized breakpoints.
//!
//! For fixed breakpoints the model is linear in its coefficients over the
//! hinge basis `[1, u, (u - b_1)+, ..., (u - b_{N-1})+]`. During the search
//! the small normal equations are assembled in closed form from suffix sums
//! of the data, solved by SVD, and scored by the exact residual over every
//! point. The reported fit is solved once more on the full design.
//!
//! Breakpoints are searched from several deterministic starts: even spacing
//! in x, even spacing by rank, and greedy insertion (each breakpoint placed
//! at its best position given the earlier ones). From each start, sweeps
//! alternate two moves until the residual stops improving:
//! - coordinate steps, moving one breakpoint between its neighbours
//! - relocations, removing one breakpoint and reinserting it anywhere
//!
//! Both moves scan data positions and refine the best scan point with a
//! golden-section search.
//!
//! Fitting happens on x normalized to `[0, 1]`; breakpoints are reported in
//! the curve's own units.

use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, Result};
use crate::statistics::solve;
use crate::types::Curve;

/// Candidate positions scanned per coordinate step.
const MAX_SCAN_POINTS: usize = 200;

/// Golden-section iterations per refinement.
const GOLDEN_ITERATIONS: usize = 48;

/// Coordinate sweeps per start.
const MAX_SWEEPS: usize = 50;

/// Relative RSS improvement below which a start is considered converged.
const CONVERGENCE_TOLERANCE: f64 = 1e-10;

/// Gram singular values below this (relative to the largest) are dropped.
const GRAM_RELATIVE_EPS: f64 = 1e-12;

const INV_PHI: f64 = 0.618_033_988_749_894_8;

/// A fitted continuous piecewise-linear model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiecewiseFit {
    /// Interior breakpoints (`segments - 1` of them), ascending.
    pub breakpoints: Vec<f64>,
    /// Smallest x of the fitted curve (first outer breakpoint).
    pub x_min: f64,
    /// Largest x of the fitted curve (last outer breakpoint).
    pub x_max: f64,
    /// Model value at `x_min`.
    pub intercept: f64,
    /// Slope of each segment, in y per x unit.
    pub slopes: Vec<f64>,
    /// Residual sum of squares.
    pub rss: f64,
}

impl PiecewiseFit {
    /// Number of segments.
    pub fn segments(&self) -> usize {
        self.slopes.len()
    }

    /// The last interior breakpoint, interpreted as the capacity estimate.
    pub fn last_breakpoint(&self) -> f64 {
        self.breakpoints.last().copied().unwrap_or(self.x_max)
    }

    /// Evaluate the fitted model at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        let mut value = self.intercept;
        let mut start = self.x_min;
        for (segment, &slope) in self.slopes.iter().enumerate() {
            let end = self.breakpoints.get(segment).copied().unwrap_or(f64::INFINITY);
            if x <= end || segment + 1 == self.slopes.len() {
                return value + slope * (x - start);
            }
            value += slope * (end - start);
            start = end;
        }
        value
    }

    /// The model evaluated at every x of `curve`.
    pub fn predict_curve(&self, curve: &Curve) -> Curve {
        curve.with_y(curve.x().iter().map(|&x| self.predict(x)).collect())
    }
}

/// Hinge design matrix on normalized positions `u`.
fn design(u: &[f64], breakpoints: &[f64]) -> DMatrix<f64> {
    let columns = breakpoints.len() + 2;
    DMatrix::from_fn(u.len(), columns, |row, col| match col {
        0 => 1.0,
        1 => u[row],
        _ => (u[row] - breakpoints[col - 2]).max(0.0),
    })
}

/// Sums over the points at index `i` and beyond, for every `i` in `0..=n`.
struct SuffixSums {
    count: Vec<f64>,
    u: Vec<f64>,
    uu: Vec<f64>,
    y: Vec<f64>,
    uy: Vec<f64>,
}

impl SuffixSums {
    fn new(u: &[f64], y: &[f64]) -> Self {
        let n = u.len();
        let mut sums = Self {
            count: vec![0.0; n + 1],
            u: vec![0.0; n + 1],
            uu: vec![0.0; n + 1],
            y: vec![0.0; n + 1],
            uy: vec![0.0; n + 1],
        };
        for i in (0..n).rev() {
            sums.count[i] = sums.count[i + 1] + 1.0;
            sums.u[i] = sums.u[i + 1] + u[i];
            sums.uu[i] = sums.uu[i + 1] + u[i] * u[i];
            sums.y[i] = sums.y[i + 1] + y[i];
            sums.uy[i] = sums.uy[i + 1] + u[i] * y[i];
        }
        sums
    }
}

struct Objective<'a> {
    u: &'a [f64],
    y: DVector<f64>,
    centered: Vec<f64>,
    sums: SuffixSums,
}

impl<'a> Objective<'a> {
    fn new(u: &'a [f64], y: &[f64]) -> Self {
        let mean = y.iter().sum::<f64>() / y.len() as f64;
        let centered: Vec<f64> = y.iter().map(|v| v - mean).collect();
        let sums = SuffixSums::new(u, &centered);
        Self {
            u,
            y: DVector::from_column_slice(y),
            centered,
            sums,
        }
    }

    /// Coefficients of the centered fit from the normal equations.
    ///
    /// `(u - b)+` is non-zero only past the first `u > b`, so every Gram entry
    /// is a combination of suffix sums taken at that index.
    fn coefficients(&self, breakpoints: &[f64]) -> Option<DVector<f64>> {
        let s = &self.sums;
        let first: Vec<usize> = breakpoints
            .iter()
            .map(|&b| self.u.partition_point(|&v| v <= b))
            .collect();

        let k = breakpoints.len() + 2;
        let mut gram = DMatrix::<f64>::zeros(k, k);
        let mut rhs = DVector::<f64>::zeros(k);
        gram[(0, 0)] = s.count[0];
        gram[(0, 1)] = s.u[0];
        gram[(1, 1)] = s.uu[0];
        rhs[0] = s.y[0];
        rhs[1] = s.uy[0];

        for (j, (&b, &i)) in breakpoints.iter().zip(&first).enumerate() {
            let col = j + 2;
            gram[(0, col)] = s.u[i] - b * s.count[i];
            gram[(1, col)] = s.uu[i] - b * s.u[i];
            rhs[col] = s.uy[i] - b * s.y[i];
            for (l, (&c, &m)) in breakpoints.iter().zip(&first).enumerate().skip(j) {
                let tail = i.max(m);
                gram[(col, l + 2)] = s.uu[tail] - (b + c) * s.u[tail] + b * c * s.count[tail];
            }
        }
        gram.fill_lower_triangle_with_upper_triangle();

        let svd = gram.svd(true, true);
        let eps = (svd.singular_values.max() * GRAM_RELATIVE_EPS).max(f64::MIN_POSITIVE);
        svd.solve(&rhs, eps).ok()
    }

    /// Residual sum of squares with hinges at `breakpoints` (any order).
    fn rss(&self, breakpoints: &[f64]) -> f64 {
        let Some(beta) = self.coefficients(breakpoints) else {
            return f64::INFINITY;
        };
        let rss: f64 = self
            .u
            .iter()
            .zip(&self.centered)
            .map(|(&u, &y)| {
                let hinges: f64 = breakpoints
                    .iter()
                    .enumerate()
                    .map(|(j, &b)| beta[j + 2] * (u - b).max(0.0))
                    .sum();
                let residual = y - beta[0] - beta[1] * u - hinges;
                residual * residual
            })
            .sum();
        if rss.is_finite() {
            rss
        } else {
            f64::INFINITY
        }
    }

    /// Data positions strictly between `low` and `high`, thinned to the scan budget.
    fn scan_points(&self, low: f64, high: f64) -> Vec<f64> {
        let inside: Vec<f64> = self
            .u
            .iter()
            .copied()
            .filter(|&v| v > low && v < high)
            .collect();
        let stride = inside.len().div_ceil(MAX_SCAN_POINTS).max(1);
        inside.into_iter().step_by(stride).collect()
    }

    /// Best position in `(low, high)` for one breakpoint added to `fixed`.
    ///
    /// Returns the position and its RSS only if it beats `current`.
    fn best_insertion(
        &self,
        fixed: &[f64],
        low: f64,
        high: f64,
        current: f64,
    ) -> Option<(f64, f64)> {
        let slot = fixed.len();
        let mut trial = fixed.to_vec();
        trial.push(0.5 * (low + high));
        let mut rss_at = |value: f64| {
            trial[slot] = value;
            self.rss(&trial)
        };

        let mut candidates = self.scan_points(low, high);
        if candidates.is_empty() {
            candidates.push(0.5 * (low + high));
        }

        let mut best = None;
        let mut best_rss = current;
        let mut best_index = None;
        for (index, &candidate) in candidates.iter().enumerate() {
            let rss = rss_at(candidate);
            if rss < best_rss {
                best = Some((candidate, rss));
                best_rss = rss;
                best_index = Some(index);
            }
        }

        // Refine between the scan neighbours of the best candidate
        let (a, b) = match best_index {
            Some(index) => (
                index.checked_sub(1).map_or(low, |i| candidates[i]),
                candidates.get(index + 1).copied().unwrap_or(high),
            ),
            None => (low, high),
        };
        let (refined, refined_rss) = golden_section(&mut rss_at, a, b);
        if refined_rss < best_rss {
            best = Some((refined, refined_rss));
        }
        best
    }

    /// Move one breakpoint to its best position between its neighbours.
    fn optimize_coordinate(&self, breakpoints: &mut [f64], index: usize, current: f64) -> f64 {
        let low = if index == 0 { 0.0 } else { breakpoints[index - 1] };
        let high = breakpoints.get(index + 1).copied().unwrap_or(1.0);
        match self.best_insertion(&without(breakpoints, index), low, high, current) {
            Some((value, rss)) => {
                breakpoints[index] = value;
                rss
            }
            None => current,
        }
    }

    /// Remove one breakpoint and reinsert it wherever the fit improves most.
    fn relocate(&self, breakpoints: &mut Vec<f64>, index: usize, current: f64) -> f64 {
        let mut others = without(breakpoints, index);
        match self.best_insertion(&others, 0.0, 1.0, current) {
            Some((value, rss)) => {
                others.push(value);
                others.sort_by(f64::total_cmp);
                *breakpoints = others;
                rss
            }
            None => current,
        }
    }

    fn descend(&self, mut breakpoints: Vec<f64>) -> (Vec<f64>, f64) {
        breakpoints.sort_by(f64::total_cmp);
        let mut rss = self.rss(&breakpoints);
        for sweep in 0..MAX_SWEEPS {
            let before = rss;
            for index in 0..breakpoints.len() {
                rss = self.optimize_coordinate(&mut breakpoints, index, rss);
            }
            for index in 0..breakpoints.len() {
                rss = self.relocate(&mut breakpoints, index, rss);
            }
            if before - rss <= CONVERGENCE_TOLERANCE * before.max(f64::MIN_POSITIVE) {
                debug!("descent converged after {} sweeps, rss={rss:.6e}", sweep + 1);
                break;
            }
        }
        (breakpoints, rss)
    }

    /// Insert breakpoints one at a time, each at its best position given the earlier ones.
    fn greedy_start(&self, interior: usize) -> Vec<f64> {
        let mut breakpoints = Vec::with_capacity(interior);
        for _ in 0..interior {
            let value = self
                .best_insertion(&breakpoints, 0.0, 1.0, f64::INFINITY)
                .map_or(0.5, |(value, _)| value);
            breakpoints.push(value);
        }
        breakpoints.sort_by(f64::total_cmp);
        breakpoints
    }
}

fn without(breakpoints: &[f64], index: usize) -> Vec<f64> {
    breakpoints
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != index)
        .map(|(_, &b)| b)
        .collect()
}

/// Minimize `f` on `[a, b]`, returning the best point and its value.
fn golden_section(mut f: impl FnMut(f64) -> f64, mut a: f64, mut b: f64) -> (f64, f64) {
    let mut c = b - INV_PHI * (b - a);
    let mut d = a + INV_PHI * (b - a);
    let mut fc = f(c);
    let mut fd = f(d);
    for _ in 0..GOLDEN_ITERATIONS {
        if fc < fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_PHI * (b - a);
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_PHI * (b - a);
            fd = f(d);
        }
    }
    if fc < fd {
        (c, fc)
    } else {
        (d, fd)
    }
}

/// Starting breakpoints: evenly spaced in x, and evenly spaced by sample rank.
fn starts(u: &[f64], interior: usize) -> Vec<Vec<f64>> {
    let even: Vec<f64> = (1..=interior)
        .map(|k| k as f64 / (interior + 1) as f64)
        .collect();
    let last = u.len() - 1;
    let by_rank: Vec<f64> = (1..=interior)
        .map(|k| u[(k * last) / (interior + 1)])
        .collect();
    if by_rank == even {
        vec![even]
    } else {
        vec![even, by_rank]
    }
}

/// Fit a continuous `segments`-segment piecewise-linear model to `curve`.
///
/// Requires `segments >= 2` and at least `segments + 1` distinct x values.
pub fn fit_piecewise(curve: &Curve, segments: usize) -> Result<PiecewiseFit> {
    if segments < 2 {
        return Err(ProbeError::invalid_config(format!(
            "piecewise fit needs at least 2 segments, got {segments}"
        )));
    }
    if curve.len() < segments + 1 {
        return Err(ProbeError::invalid_config(format!(
            "piecewise fit with {segments} segments needs at least {} distinct x values, got {}",
            segments + 1,
            curve.len()
        )));
    }

    let x = curve.x();
    let (x_min, x_max) = (x[0], x[x.len() - 1]);
    let span = x_max - x_min;
    let u: Vec<f64> = x.iter().map(|v| (v - x_min) / span).collect();
    let objective = Objective::new(&u, curve.y());

    let interior = segments - 1;
    let mut candidates = starts(&u, interior);
    candidates.push(objective.greedy_start(interior));

    let mut best: Option<(Vec<f64>, f64)> = None;
    for (start_index, start) in candidates.into_iter().enumerate() {
        let (breakpoints, rss) = objective.descend(start);
        debug!("piecewise start {start_index}: rss={rss:.6e}");
        if best.as_ref().map_or(true, |(_, best_rss)| rss < *best_rss) {
            best = Some((breakpoints, rss));
        }
    }
    let (mut normalized, _) = best.ok_or_else(|| ProbeError::invalid_config("no piecewise start"))?;
    normalized.sort_by(f64::total_cmp);

    let fit = solve(&design(&u, &normalized), &objective.y)
        .ok_or_else(|| ProbeError::invalid_config("piecewise least squares failed"))?;

    let mut slope = fit.beta[1];
    let mut slopes = Vec::with_capacity(segments);
    slopes.push(slope / span);
    for k in 0..segments - 1 {
        slope += fit.beta[k + 2];
        slopes.push(slope / span);
    }

    Ok(PiecewiseFit {
        breakpoints: normalized.iter().map(|b| x_min + b * span).collect(),
        x_min,
        x_max,
        intercept: fit.beta[0],
        slopes,
        rss: fit.rss,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn hinge(x: f64) -> f64 {
        if x < 1024.0 {
            2.0 + 0.001 * x
        } else {
            2.0 + 1.024 + 0.01 * (x - 1024.0)
        }
    }

    #[test]
    fn test_recovers_single_breakpoint_under_noise() {
        let mut rng = StdRng::seed_from_u64(7);
        let noise = Normal::new(0.0, 0.02).unwrap();
        let x: Vec<f64> = (0..=96).map(|i| f64::from(i) * 32.0).collect();
        let y: Vec<f64> = x.iter().map(|&v| hinge(v) + noise.sample(&mut rng)).collect();
        let curve = Curve::new(x, y).unwrap();

        let fit = fit_piecewise(&curve, 2).unwrap();
        assert_eq!(fit.breakpoints.len(), 1);
        let breakpoint = fit.last_breakpoint();
        assert!((breakpoint - 1024.0).abs() < 1024.0, "breakpoint {breakpoint}");
        assert!((breakpoint - 1024.0).abs() < 64.0, "breakpoint {breakpoint}");
    }

    #[test]
    fn test_exact_data_is_fit_exactly() {
        let x: Vec<f64> = (0..=64).map(|i| f64::from(i) * 32.0).collect();
        let y: Vec<f64> = x.iter().map(|&v| hinge(v)).collect();
        let curve = Curve::new(x, y).unwrap();

        let fit = fit_piecewise(&curve, 2).unwrap();
        assert!(fit.rss < 1e-8, "rss {}", fit.rss);
        assert_relative_eq!(fit.slopes[0], 0.001, epsilon = 1e-6);
        assert_relative_eq!(fit.slopes[1], 0.01, epsilon = 1e-6);
        assert_relative_eq!(fit.predict(2048.0), hinge(2048.0), epsilon = 1e-6);
        assert_relative_eq!(fit.predict(0.0), 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_breakpoints_ascending_for_many_segments() {
        let x: Vec<f64> = (0..60).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| (v / 6.0).sin() * 3.0 + v * 0.1).collect();
        let curve = Curve::new(x, y).unwrap();

        let fit = fit_piecewise(&curve, 6).unwrap();
        assert_eq!(fit.breakpoints.len(), 5);
        assert_eq!(fit.segments(), 6);
        assert!(fit.breakpoints.windows(2).all(|w| w[0] <= w[1]));
        assert!(fit.breakpoints.iter().all(|&b| (0.0..=59.0).contains(&b)));
    }

    #[test]
    fn test_requires_enough_distinct_x() {
        let curve = Curve::new(vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 4.0]).unwrap();
        assert!(matches!(
            fit_piecewise(&curve, 3),
            Err(ProbeError::InvalidConfig(_))
        ));
        assert!(fit_piecewise(&curve, 2).is_ok());
        assert!(fit_piecewise(&curve, 1).is_err());
    }

    /// Steps at 1 MB and 8 MB, then a slope from 24 MB: the last breakpoint
    /// belongs at 24 MB even though the early steps attract breakpoints.
    fn staircase(x: f64) -> f64 {
        let mut y = 2.0;
        if x > 1024.0 {
            y += 3.0;
        }
        if x > 8192.0 {
            y += 5.0;
        }
        y + 0.001 * (x - 24576.0).max(0.0)
    }

    #[test]
    fn test_last_breakpoint_on_staircase_curve() {
        let mut rng = StdRng::seed_from_u64(11);
        let noise = Normal::new(0.0, 0.3).unwrap();
        let x: Vec<f64> = (1..=512).map(|i| f64::from(i) * 64.0).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|&v| staircase(v) + noise.sample(&mut rng))
            .collect();
        let curve = Curve::new(x, y).unwrap();

        let fit = fit_piecewise(&curve, 6).unwrap();
        let breakpoint = fit.last_breakpoint();
        assert!((breakpoint - 24576.0).abs() < 1024.0, "breakpoints {:?}", fit.breakpoints);
        // Close to the noise floor of 512 * 0.3^2
        assert!(fit.rss < 70.0, "rss {}", fit.rss);
        assert!(fit.breakpoints.iter().any(|b| (b - 1024.0).abs() < 256.0));
        assert!(fit.breakpoints.iter().any(|b| (b - 8192.0).abs() < 256.0));
    }

    #[test]
    fn test_closed_form_rss_matches_full_solve() {
        let u: Vec<f64> = (0..40).map(|i| f64::from(i) / 39.0).collect();
        let y: Vec<f64> = u.iter().map(|v| (v * 7.0).sin() + 3.0 * v).collect();
        let objective = Objective::new(&u, &y);

        for breakpoints in [vec![0.3], vec![0.7, 0.2], vec![0.25, 0.5, 0.75], vec![0.5, 0.5]] {
            let full = solve(&design(&u, &breakpoints), &objective.y).unwrap();
            assert_relative_eq!(objective.rss(&breakpoints), full.rss, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_relocation_crosses_neighbours() {
        let u: Vec<f64> = (0..=100).map(|i| f64::from(i) / 100.0).collect();
        let y: Vec<f64> = u.iter().map(|&v| (v - 0.8).max(0.0) * 10.0).collect();
        let objective = Objective::new(&u, &y);

        // Both breakpoints start left of the kink; only the first can reach it by relocation
        let mut breakpoints = vec![0.1, 0.2];
        let current = objective.rss(&breakpoints);
        let rss = objective.relocate(&mut breakpoints, 0, current);
        assert!(rss < current);
        assert!(breakpoints.iter().any(|&b| (b - 0.8).abs() < 0.02), "{breakpoints:?}");
        assert!(breakpoints.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_golden_section_finds_parabola_minimum() {
        let (x, fx) = golden_section(|v| (v - 0.3) * (v - 0.3), 0.0, 1.0);
        assert_relative_eq!(x, 0.3, epsilon = 1e-6);
        assert!(fx < 1e-10);
    }
}
