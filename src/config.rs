//! Configuration for cache parameter inference.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::benchmark::BenchmarkOverrides;
use crate::constants::{
    DEFAULT_CACHE_LINE_SIZE, DEFAULT_CHUNK_SIZE, DEFAULT_DENOISE_WINDOW,
    DEFAULT_PIECEWISE_SEGMENTS, DEFAULT_RESCALE_DIVISOR, KNEE_SENSITIVITY, LINE_SIZE_FALLBACK,
    LINE_SIZE_RATIO_THRESHOLD,
};
use crate::denoise::{DenoiseConfig, DenoiseMethod};
use crate::error::{ProbeError, Result};
use crate::ingest::SampleColumns;

/// Configuration options for [`CacheProbe`](crate::CacheProbe).
///
/// Every field has a default; a JSON document only needs to name the fields
/// it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rows per aggregation chunk (default: 10,000).
    pub chunk_size: usize,

    /// Ratio `y[i] / y[i+1]` that marks the line size boundary (default: 1.7).
    pub ratio_threshold: f64,

    /// Line size reported when no stride pair crosses the threshold (default: 4096).
    pub line_size_fallback: f64,

    /// Kneedle sensitivity `S` (default: 1.0).
    pub knee_sensitivity: f64,

    /// Smoothing applied before knee location (default: local polynomial, window 5).
    pub bound_denoise: DenoiseConfig,

    /// Smoothing applied before the denoised capacity fit (default: knn, window 5).
    ///
    /// The capacity probe always fits the raw curve as well.
    pub capacity_denoise: DenoiseConfig,

    /// Smoothing applied to associativity and line size curves (default: none).
    pub detector_denoise: DenoiseConfig,

    /// Linear segments in the capacity fit (default: 6).
    pub piecewise_segments: usize,

    /// Unit rescaling for the capacity interval (default: 1024 KB per MB).
    pub rescale: Rescale,

    /// Cache line size passed to capacity benchmarks (default: 64).
    pub cache_line_size: u64,

    /// Sweep limit for the capacity benchmark, in reported units.
    ///
    /// When unset, the capacity probe first runs the bound pass and uses its knee.
    pub max_cache_size: Option<f64>,

    /// Known-parameter overrides passed to associativity benchmarks.
    pub overrides: BenchmarkOverrides,

    /// Override the per-probe CSV sample column layout.
    pub sample_columns: Option<SampleColumns>,

    /// Directory receiving raw CSV records and plot datasets (default: `.`).
    pub artifact_dir: PathBuf,

    /// Directory holding the benchmark executables (default: `.`).
    pub bench_dir: PathBuf,
}

/// Conversion between raw x units and reported units.
///
/// The capacity estimate is reported as `breakpoint ± divisor` raw units,
/// i.e. `± 1` reported unit, so a regression estimate never claims more
/// precision than one reported unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rescale {
    /// Raw units per reported unit.
    pub divisor: f64,
    /// Name of the reported unit.
    pub unit: String,
}

impl Default for Rescale {
    fn default() -> Self {
        Self {
            divisor: DEFAULT_RESCALE_DIVISOR,
            unit: "MB".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            ratio_threshold: LINE_SIZE_RATIO_THRESHOLD,
            line_size_fallback: LINE_SIZE_FALLBACK,
            knee_sensitivity: KNEE_SENSITIVITY,
            bound_denoise: DenoiseConfig {
                method: DenoiseMethod::LocalPolynomial,
                window: DEFAULT_DENOISE_WINDOW,
            },
            capacity_denoise: DenoiseConfig {
                method: DenoiseMethod::KnnRegression,
                window: DEFAULT_DENOISE_WINDOW,
            },
            detector_denoise: DenoiseConfig::none(),
            piecewise_segments: DEFAULT_PIECEWISE_SEGMENTS,
            rescale: Rescale::default(),
            cache_line_size: DEFAULT_CACHE_LINE_SIZE,
            max_cache_size: None,
            overrides: BenchmarkOverrides::default(),
            sample_columns: None,
            artifact_dir: PathBuf::from("."),
            bench_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file; missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|e| ProbeError::io_at("reading", path, e))?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the scalar preconditions that do not depend on the data.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ProbeError::invalid_config("chunk_size must be at least 1"));
        }
        if !(self.ratio_threshold.is_finite() && self.ratio_threshold > 0.0) {
            return Err(ProbeError::invalid_config(format!(
                "ratio_threshold must be positive, got {}",
                self.ratio_threshold
            )));
        }
        if !(self.knee_sensitivity.is_finite() && self.knee_sensitivity >= 0.0) {
            return Err(ProbeError::invalid_config(format!(
                "knee_sensitivity must be non-negative, got {}",
                self.knee_sensitivity
            )));
        }
        if self.piecewise_segments < 2 {
            return Err(ProbeError::invalid_config(format!(
                "piecewise_segments must be at least 2, got {}",
                self.piecewise_segments
            )));
        }
        if !(self.rescale.divisor.is_finite() && self.rescale.divisor > 0.0) {
            return Err(ProbeError::invalid_config(format!(
                "rescale divisor must be positive, got {}",
                self.rescale.divisor
            )));
        }
        if let Some(limit) = self.max_cache_size {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(ProbeError::invalid_config(format!(
                    "max_cache_size must be positive, got {limit}"
                )));
            }
        }
        self.bound_denoise.validate()?;
        self.capacity_denoise.validate()?;
        self.detector_denoise.validate()?;
        Ok(())
    }
}
