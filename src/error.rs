//! Error types for cache parameter inference.
//!
//! Malformed input rows are never errors: they are rejected and counted in
//! [`IngestStats`](crate::ingest::IngestStats). Errors here are reserved for
//! conditions that end a run: unusable configuration, a failed benchmark
//! process, or I/O on the artifacts a run must persist.

use std::path::Path;
use std::process::ExitStatus;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = ProbeError> = std::result::Result<T, E>;

/// Fatal conditions for an analysis run.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Reading or writing a file or pipe failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being done when the failure happened.
        context: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The CSV stream itself could not be read.
    #[error("csv stream error: {0}")]
    Csv(#[from] csv::Error),

    /// The benchmark executable could not be started.
    #[error("failed to start benchmark `{command}`: {source}")]
    Spawn {
        /// Rendered command line.
        command: String,
        /// Underlying I/O error (usually `NotFound` or `PermissionDenied`).
        #[source]
        source: std::io::Error,
    },

    /// The benchmark executable exited unsuccessfully.
    #[error("benchmark `{command}` exited with {status}")]
    BenchmarkFailed {
        /// Rendered command line.
        command: String,
        /// Exit status reported by the operating system.
        status: ExitStatus,
    },

    /// A configuration precondition was violated.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Aggregation produced no points for a probe that needs a curve.
    #[error("no usable rows: the aggregated curve is empty")]
    EmptyCurve,

    /// A configuration or report document could not be (de)serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProbeError {
    /// Build an [`InvalidConfig`](ProbeError::InvalidConfig) error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Wrap an I/O error with a description of the operation.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Wrap an I/O error that happened on `path`.
    pub fn io_at(action: &str, path: &Path, source: std::io::Error) -> Self {
        Self::io(format!("{action} {}", path.display()), source)
    }
}
