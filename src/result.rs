//! Estimate and report types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::Rescale;
use crate::denoise::{DenoiseConfig, DenoiseMethod};
use crate::ingest::IngestStats;
use crate::types::{CacheLevel, ProbeKind, RunId};

/// Outcome of a change-point detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "x", rename_all = "snake_case")]
pub enum ChangePoint {
    /// A transition was found at this x.
    Detected(f64),
    /// No transition inside the tested range; the value is the configured
    /// stand-in for "at or beyond the largest candidate".
    Fallback(f64),
    /// The curve carries no usable transition.
    NoSignal,
}

impl ChangePoint {
    /// The reported value for `Detected` and `Fallback`.
    pub fn value(&self) -> Option<f64> {
        match *self {
            ChangePoint::Detected(x) | ChangePoint::Fallback(x) => Some(x),
            ChangePoint::NoSignal => None,
        }
    }

    /// Whether the value comes from an actual transition in the data.
    pub fn is_detected(&self) -> bool {
        matches!(self, ChangePoint::Detected(_))
    }
}

/// Why the knee locator produced no knee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoKneeReason {
    /// Fewer than three points.
    TooFewPoints,
    /// y does not vary, so it cannot be normalized.
    FlatCurve,
    /// The difference curve has no local maximum (non-finite values).
    NoLocalMaximum,
    /// The difference curve never drops below the threshold after a maximum.
    NoThresholdCrossing,
}

impl NoKneeReason {
    /// Human-readable explanation.
    pub fn description(&self) -> &'static str {
        match self {
            NoKneeReason::TooFewPoints => "fewer than three points",
            NoKneeReason::FlatCurve => "latency does not vary over the sweep",
            NoKneeReason::NoLocalMaximum => "difference curve has no local maximum",
            NoKneeReason::NoThresholdCrossing => "curve is not concave after its maximum",
        }
    }
}

/// Outcome of the knee locator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum KneeResult {
    /// Knee found.
    Found {
        /// Knee location in curve units.
        x: f64,
        /// Knee location after normalizing x to `[0, 1]`.
        normalized_x: f64,
    },
    /// No knee, with the reason.
    NotFound(NoKneeReason),
}

impl KneeResult {
    /// Knee location, if one was found.
    pub fn x(&self) -> Option<f64> {
        match *self {
            KneeResult::Found { x, .. } => Some(x),
            KneeResult::NotFound(_) => None,
        }
    }
}

/// Capacity estimate reported as an explicit interval.
///
/// `estimate`, `low` and `high` are in reported units (`unit`); the interval
/// always spans one reported unit either side of the estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityInterval {
    /// Last interior breakpoint in reported units.
    pub estimate: f64,
    /// Lower bound.
    pub low: f64,
    /// Upper bound.
    pub high: f64,
    /// Reported unit name.
    pub unit: String,
}

impl CapacityInterval {
    /// Wrap a breakpoint given in raw x units.
    pub fn from_breakpoint(breakpoint: f64, rescale: &Rescale) -> Self {
        let estimate = breakpoint / rescale.divisor;
        Self {
            estimate,
            low: estimate - 1.0,
            high: estimate + 1.0,
            unit: rescale.unit.clone(),
        }
    }

    /// Whether `value` (reported units) lies inside the interval.
    pub fn contains(&self, value: f64) -> bool {
        (self.low..=self.high).contains(&value)
    }

    /// Interval bounds in raw x units.
    pub fn raw_bounds(&self, rescale: &Rescale) -> (f64, f64) {
        (self.low * rescale.divisor, self.high * rescale.divisor)
    }
}

/// One piecewise fit of the capacity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityFit {
    /// Smoothing applied before fitting (`none` for the raw curve).
    pub denoise: DenoiseMethod,
    /// Interior breakpoints in raw x units, ascending.
    pub breakpoints: Vec<f64>,
    /// Residual sum of squares of the fit.
    pub rss: f64,
    /// Interval around the last breakpoint.
    pub interval: CapacityInterval,
}

/// Parameter estimate of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "parameter", rename_all = "snake_case")]
pub enum Estimate {
    /// Cache line size in bytes.
    LineSize {
        /// Ratio-threshold detector outcome.
        line_size: ChangePoint,
    },
    /// Set associativity of one level.
    Associativity {
        /// Level probed.
        level: CacheLevel,
        /// Maximum-positive-delta detector outcome.
        ways: ChangePoint,
    },
    /// Upper bound on the largest cache, used to scope the capacity pass.
    CapacityBound {
        /// Knee locator outcome.
        knee: KneeResult,
    },
    /// Capacity interval from the raw and denoised curves.
    Capacity {
        /// One fit per curve variant, raw first.
        fits: Vec<CapacityFit>,
    },
}

/// Run bookkeeping attached to every report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Run identifier naming the artifacts.
    pub run_id: RunId,
    /// Points in the aggregated curve.
    pub points: usize,
    /// Ingestion accounting.
    pub ingest: IngestStats,
    /// Smoothing applied before detection.
    pub denoise: DenoiseConfig,
    /// Raw CSV record written during the run, if any.
    pub raw_artifact: Option<PathBuf>,
    /// Plot datasets written during the run.
    pub plot_artifacts: Vec<PathBuf>,
    /// Wall-clock analysis time.
    pub runtime_secs: f64,
}

/// Complete result of one probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    /// Which parameter was probed.
    pub kind: ProbeKind,
    /// The estimate.
    pub estimate: Estimate,
    /// Run bookkeeping.
    pub metadata: Metadata,
}

impl ProbeReport {
    /// Single headline value: line size, ways, knee, or the last capacity
    /// estimate (reported units).
    pub fn value(&self) -> Option<f64> {
        match &self.estimate {
            Estimate::LineSize { line_size } => line_size.value(),
            Estimate::Associativity { ways, .. } => ways.value(),
            Estimate::CapacityBound { knee } => knee.x(),
            Estimate::Capacity { fits } => fits.last().map(|fit| fit.interval.estimate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_point_value() {
        assert_eq!(ChangePoint::Detected(128.0).value(), Some(128.0));
        assert_eq!(ChangePoint::Fallback(4096.0).value(), Some(4096.0));
        assert_eq!(ChangePoint::NoSignal.value(), None);
        assert!(!ChangePoint::Fallback(4096.0).is_detected());
    }

    #[test]
    fn test_capacity_interval_spans_one_unit() {
        let interval = CapacityInterval::from_breakpoint(16384.0, &Rescale::default());
        assert_eq!(interval.estimate, 16.0);
        assert_eq!((interval.low, interval.high), (15.0, 17.0));
        assert_eq!(interval.raw_bounds(&Rescale::default()), (15360.0, 17408.0));
        assert!(interval.contains(16.5));
        assert!(!interval.contains(17.5));
    }

    #[test]
    fn test_serialized_tags() {
        let json = serde_json::to_string(&ChangePoint::Detected(4.0)).unwrap();
        assert_eq!(json, r#"{"outcome":"detected","x":4.0}"#);
        let json = serde_json::to_string(&KneeResult::NotFound(NoKneeReason::FlatCurve)).unwrap();
        assert_eq!(json, r#"{"outcome":"not_found","detail":"flat_curve"}"#);
        let back: ChangePoint = serde_json::from_str(r#"{"outcome":"no_signal"}"#).unwrap();
        assert_eq!(back, ChangePoint::NoSignal);
    }
}
