//! Plot datasets handed to an external renderer.
//!
//! The pipeline never draws charts. It builds a [`PlotDataset`] per run
//! (the curves it analyzed plus the markers it derived) and passes it to a
//! [`PlotSink`].

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, Result};
use crate::types::{Curve, ProbeKind, RunId};

/// One named curve in a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Legend label.
    pub label: String,
    /// Points.
    pub curve: Curve,
}

/// Vertical marker at an x position (knee, detection, interval bound).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Position in curve units.
    pub x: f64,
    /// Legend label.
    pub label: String,
}

/// Everything a renderer needs to draw one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotDataset {
    /// Chart title.
    pub title: String,
    /// Probe that produced the data.
    pub kind: ProbeKind,
    /// Run the data belongs to.
    pub run_id: RunId,
    /// x axis label.
    pub x_label: String,
    /// y axis label.
    pub y_label: String,
    /// Whether x is best shown on a base-2 logarithmic scale.
    pub log2_x: bool,
    /// Curves, drawn in order.
    pub series: Vec<Series>,
    /// Markers.
    pub markers: Vec<Marker>,
}

impl PlotDataset {
    /// Empty dataset with the axis conventions of `kind`.
    pub fn new(kind: ProbeKind, run_id: RunId) -> Self {
        let (title, x_label, y_label, log2_x) = match kind {
            ProbeKind::LineSize => (
                "Cache line size: access time per stride".to_string(),
                "Stride (bytes)",
                "Time (milliseconds)",
                true,
            ),
            ProbeKind::Associativity(level) => (
                format!("{level}: cache associativity vs median access time"),
                "Cache associativity",
                "Median access time",
                false,
            ),
            ProbeKind::CapacityBound => (
                "Maximum cache size".to_string(),
                "Data size in MB",
                "Cycles per load",
                false,
            ),
            ProbeKind::Capacity => (
                "Estimated cache size".to_string(),
                "Data size in KB",
                "Cycles per load",
                false,
            ),
        };
        Self {
            title,
            kind,
            run_id,
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            log2_x,
            series: Vec::new(),
            markers: Vec::new(),
        }
    }

    /// Add a curve.
    pub fn with_series(mut self, label: impl Into<String>, curve: Curve) -> Self {
        self.add_series(label, curve);
        self
    }

    /// Add a marker.
    pub fn with_marker(mut self, x: f64, label: impl Into<String>) -> Self {
        self.add_marker(x, label);
        self
    }

    /// Add a curve in place.
    pub fn add_series(&mut self, label: impl Into<String>, curve: Curve) {
        self.series.push(Series {
            label: label.into(),
            curve,
        });
    }

    /// Add a marker in place.
    pub fn add_marker(&mut self, x: f64, label: impl Into<String>) {
        self.markers.push(Marker {
            x,
            label: label.into(),
        });
    }

    /// Whether no series has any point.
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|series| series.curve.is_empty())
    }

    /// `<slug>_benchmark_graph_<run id>.json`
    pub fn file_name(&self) -> String {
        self.run_id.artifact_name(&self.kind.graph_prefix(), "json")
    }
}

/// Consumer of plot datasets.
pub trait PlotSink {
    /// Accept a dataset, returning the artifact written, if any.
    fn submit(&mut self, dataset: &PlotDataset) -> Result<Option<PathBuf>>;
}

/// Writes each dataset as pretty JSON into a directory.
#[derive(Debug, Clone)]
pub struct JsonPlotSink {
    dir: PathBuf,
}

impl JsonPlotSink {
    /// Sink writing into `dir` (which must exist).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl PlotSink for JsonPlotSink {
    fn submit(&mut self, dataset: &PlotDataset) -> Result<Option<PathBuf>> {
        let path = self.dir.join(dataset.file_name());
        let file = File::create(&path).map_err(|e| ProbeError::io_at("creating", &path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, dataset)?;
        writer
            .flush()
            .map_err(|e| ProbeError::io_at("writing", &path, e))?;
        Ok(Some(path))
    }
}

/// Keeps datasets in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryPlotSink {
    /// Datasets in submission order.
    pub datasets: Vec<PlotDataset>,
}

impl MemoryPlotSink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlotSink for MemoryPlotSink {
    fn submit(&mut self, dataset: &PlotDataset) -> Result<Option<PathBuf>> {
        self.datasets.push(dataset.clone());
        Ok(None)
    }
}
