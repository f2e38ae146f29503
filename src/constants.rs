//! Default constants for the inference pipeline.

/// Rows aggregated per chunk before the chunk medians are retained.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Latency ratio `y[i] / y[i+1]` that marks the cache line boundary.
pub const LINE_SIZE_RATIO_THRESHOLD: f64 = 1.7;

/// Line size reported when no stride pair crosses the ratio threshold.
pub const LINE_SIZE_FALLBACK: f64 = 4096.0;

/// Kneedle sensitivity `S`.
pub const KNEE_SENSITIVITY: f64 = 1.0;

/// Polynomial degree of the local polynomial (Savitzky-Golay) smoother.
pub const LOCAL_POLYNOMIAL_DEGREE: usize = 3;

/// Default smoothing window (points) for both smoothers.
pub const DEFAULT_DENOISE_WINDOW: usize = 5;

/// Default number of linear segments in the capacity fit.
pub const DEFAULT_PIECEWISE_SEGMENTS: usize = 6;

/// Raw x units per reported unit (KB per MB) in the capacity report.
pub const DEFAULT_RESCALE_DIVISOR: f64 = 1024.0;

/// Cache line size passed to capacity benchmarks when none is configured.
pub const DEFAULT_CACHE_LINE_SIZE: u64 = 64;

/// Row rejection rate above which a run logs a warning.
pub const REJECTION_WARN_RATE: f64 = 0.05;
