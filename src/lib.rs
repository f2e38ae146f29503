//! # cache-probe
//!
//! Infer cache hierarchy parameters from microbenchmark latency sweeps.
//!
//! Benchmarks sweep a hardware-related variable (stride, associativity
//! candidate, working-set size) and print per-trial latencies. This crate
//! turns those noisy samples into one estimate per run:
//! - Cache line size (ratio-threshold change point)
//! - Set associativity per level (maximum positive latency delta)
//! - An upper bound on the largest cache (Kneedle knee)
//! - Cache capacity as an explicit interval (piecewise linear regression)
//!
//! The pipeline is: records → [`ingest`] (chunked median-of-medians) →
//! optional [`denoise`] → one detector from [`analysis`] → [`ProbeReport`],
//! with the analyzed curves handed to a [`PlotSink`].
//!
//! ## Quick Start
//!
//! ```
//! use cache_probe::{CacheProbe, MemoryPlotSink, MemorySource, RunId};
//!
//! let mut source = MemorySource::from_lines([
//!     "stride,milliseconds",
//!     "64,100", "128,100", "256,58", "512,57",
//! ]);
//! let mut sink = MemoryPlotSink::new();
//! let report = CacheProbe::new()
//!     .run_id(RunId::new("example"))
//!     .analyze_line_size(&mut source, &mut sink)?;
//!
//! assert_eq!(report.value(), Some(128.0));
//! # Ok::<(), cache_probe::ProbeError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod benchmark;
mod config;
mod constants;
mod error;
mod probe;
mod result;
mod types;

// Functional modules
pub mod analysis;
pub mod denoise;
pub mod ingest;
pub mod output;
pub mod plot;
pub mod source;
pub mod statistics;

use std::path::Path;

// Re-exports for public API
pub use benchmark::{
    BenchmarkArgs, BenchmarkCommand, BenchmarkOverrides, LevelProfile, OverrideOption,
};
pub use config::{Config, Rescale};
pub use constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_PIECEWISE_SEGMENTS, KNEE_SENSITIVITY, LINE_SIZE_FALLBACK,
    LINE_SIZE_RATIO_THRESHOLD,
};
pub use denoise::{DenoiseConfig, DenoiseMethod};
pub use error::{ProbeError, Result};
pub use plot::{JsonPlotSink, MemoryPlotSink, PlotDataset, PlotSink};
pub use probe::CacheProbe;
pub use result::{
    CapacityFit, CapacityInterval, ChangePoint, Estimate, KneeResult, Metadata, NoKneeReason,
    ProbeReport,
};
pub use source::{BenchmarkProcess, CsvFileSource, MemorySource, SampleSource};
pub use types::{CacheLevel, Curve, ProbeKind, RunId, XValue};

/// Analyze a persisted benchmark CSV with default configuration.
///
/// Plot datasets are kept in memory and discarded; use [`CacheProbe`] with a
/// [`JsonPlotSink`] to keep them.
pub fn analyze_csv(kind: ProbeKind, path: impl AsRef<Path>) -> Result<ProbeReport> {
    let mut source = CsvFileSource::new(path.as_ref());
    CacheProbe::new().analyze(kind, &mut source, &mut MemoryPlotSink::new())
}
