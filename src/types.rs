//! Core value types shared by every pipeline stage.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, Result};

/// Independent-variable key (stride, associativity candidate, working-set size).
///
/// Wraps a finite `f64` with total ordering and bitwise hashing so it can key
/// maps. `-0.0` is normalized to `0.0` so both spellings group together.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct XValue(f64);

impl XValue {
    /// Wrap a value, returning `None` for NaN or infinities.
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() {
            Some(Self(if value == 0.0 { 0.0 } else { value }))
        } else {
            None
        }
    }

    /// The wrapped value.
    pub fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for XValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for XValue {}

impl Hash for XValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for XValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for XValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for XValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A latency curve: one `(x, y)` pair per distinct x, x strictly ascending.
///
/// Used both for aggregated curves and for their denoised counterparts; a
/// denoised curve shares the x column of its source and only replaces y.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Curve {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Curve {
    /// Build a curve, validating equal lengths, finite x and strictly ascending x.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(ProbeError::invalid_config(format!(
                "curve columns differ in length: x={} y={}",
                x.len(),
                y.len()
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ProbeError::invalid_config("curve x values must be finite"));
        }
        if x.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ProbeError::invalid_config(
                "curve x values must be strictly ascending",
            ));
        }
        Ok(Self { x, y })
    }

    /// Build a curve from `(x, y)` pairs already sorted by x.
    pub fn from_points<I>(points: I) -> Result<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let (x, y) = points.into_iter().unzip();
        Self::new(x, y)
    }

    /// Independent-variable column.
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// Latency column.
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Whether the curve has no points.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Iterate over `(x, y)` pairs in ascending x.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }

    /// Same x column with a replacement y column.
    ///
    /// # Panics
    ///
    /// Panics if `y` does not have one value per point.
    pub fn with_y(&self, y: Vec<f64>) -> Self {
        assert_eq!(y.len(), self.x.len(), "replacement y must match curve length");
        Self {
            x: self.x.clone(),
            y,
        }
    }

    /// Divide every x by a positive `divisor` (unit rescaling keeps x ascending).
    pub fn scale_x(&self, divisor: f64) -> Result<Self> {
        if !(divisor.is_finite() && divisor > 0.0) {
            return Err(ProbeError::invalid_config(format!(
                "x rescale divisor must be positive, got {divisor}"
            )));
        }
        Ok(Self {
            x: self.x.iter().map(|v| v / divisor).collect(),
            y: self.y.clone(),
        })
    }
}

/// Cache level a probe targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheLevel {
    /// First-level data cache.
    L1,
    /// Second-level cache.
    L2,
    /// Third-level (usually last-level) cache.
    L3,
}

impl CacheLevel {
    /// All levels, innermost first.
    pub const ALL: [CacheLevel; 3] = [CacheLevel::L1, CacheLevel::L2, CacheLevel::L3];

    /// Short label used in artifact names and reports.
    pub fn label(self) -> &'static str {
        match self {
            CacheLevel::L1 => "L1",
            CacheLevel::L2 => "L2",
            CacheLevel::L3 => "L3",
        }
    }
}

impl fmt::Display for CacheLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which parameter a run infers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// Cache line size from a stride sweep (ratio-threshold detector).
    LineSize,
    /// Set associativity of one level (maximum-positive-delta detector).
    Associativity(CacheLevel),
    /// Upper bound on the largest cache from a coarse size sweep (knee).
    CapacityBound,
    /// Capacity interval from a fine size sweep (piecewise regression).
    Capacity,
}

impl ProbeKind {
    /// Stable slug used in artifact file names.
    pub fn slug(self) -> String {
        match self {
            ProbeKind::LineSize => "cache_linesize".to_string(),
            ProbeKind::Associativity(level) => format!("cache_{level}associativity"),
            ProbeKind::CapacityBound => "cache_size_maximum".to_string(),
            ProbeKind::Capacity => "cache_size_estimated".to_string(),
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeKind::LineSize => f.write_str("cache line size"),
            ProbeKind::Associativity(level) => write!(f, "{level} associativity"),
            ProbeKind::CapacityBound => f.write_str("maximum cache size"),
            ProbeKind::Capacity => f.write_str("cache size"),
        }
    }
}

/// Identifier of one analysis run, used to name every artifact it produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Use an explicit identifier. Path separators are replaced with `_`.
    pub fn new(id: impl Into<String>) -> Self {
        let id: String = id.into();
        Self(id.replace(['/', '\\'], "_"))
    }

    /// Identifier derived from the current local time (`%Y-%m-%d_%H-%M-%S`).
    pub fn now() -> Self {
        Self(chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string())
    }

    /// The identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<prefix>_<run id>.<extension>`
    pub fn artifact_name(&self, prefix: &str, extension: &str) -> String {
        format!("{prefix}_{}.{extension}", self.0)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xvalue_rejects_non_finite() {
        assert!(XValue::new(f64::NAN).is_none());
        assert!(XValue::new(f64::INFINITY).is_none());
        assert_eq!(XValue::new(-0.0), XValue::new(0.0));
    }

    #[test]
    fn test_xvalue_orders_numerically() {
        let mut keys: Vec<XValue> = [16.0, 1.0, 4.0, 2.0]
            .iter()
            .filter_map(|&v| XValue::new(v))
            .collect();
        keys.sort();
        let values: Vec<f64> = keys.iter().map(|k| k.get()).collect();
        assert_eq!(values, vec![1.0, 2.0, 4.0, 16.0]);
    }

    #[test]
    fn test_curve_requires_ascending_x() {
        assert!(Curve::new(vec![1.0, 2.0], vec![3.0, 4.0]).is_ok());
        assert!(Curve::new(vec![2.0, 1.0], vec![3.0, 4.0]).is_err());
        assert!(Curve::new(vec![1.0, 1.0], vec![3.0, 4.0]).is_err());
        assert!(Curve::new(vec![1.0], vec![3.0, 4.0]).is_err());
    }

    #[test]
    fn test_curve_scale_x() {
        let curve = Curve::new(vec![1024.0, 2048.0], vec![1.0, 2.0]).unwrap();
        let scaled = curve.scale_x(1024.0).unwrap();
        assert_eq!(scaled.x(), &[1.0, 2.0]);
        assert_eq!(scaled.y(), curve.y());
        assert!(curve.scale_x(0.0).is_err());
    }

    #[test]
    fn test_run_id_artifact_name() {
        let run = RunId::new("2024-05-01_12-00-00");
        assert_eq!(
            run.artifact_name("cache_linesize_benchmark_data", "csv"),
            "cache_linesize_benchmark_data_2024-05-01_12-00-00.csv"
        );
        assert_eq!(RunId::new("a/b").as_str(), "a_b");
    }

    #[test]
    fn test_probe_kind_slug() {
        assert_eq!(
            ProbeKind::Associativity(CacheLevel::L2).slug(),
            "cache_L2associativity"
        );
    }
}
