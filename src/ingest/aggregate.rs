//! Chunked reduction of raw samples to one latency per x.
//!
//! Rows are consumed in fixed-size chunks. Within a chunk samples are grouped
//! by x and reduced to a chunk median; once the stream ends, the chunk medians
//! of each x are reduced again to their median. This two-level reduction is
//! not the exact overall median when an x is spread unevenly over chunks,
//! but memory stays bounded by the chunk size plus one value per x per chunk.
//!
//! Chunks count data records, accepted or rejected. Header and blank lines
//! do not count.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::statistics::median;
use crate::types::{Curve, XValue};

use super::row::Row;

/// How samples of one x are reduced to a representative latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    /// Median per chunk, then median of the chunk medians.
    #[default]
    MedianOfMedians,
    /// Exact mean over all samples, kept as a running sum per x.
    Mean,
}

/// Samples grouped by independent-variable value.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    groups: BTreeMap<XValue, Vec<f64>>,
}

impl SampleSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row's samples under its x. Rows with non-finite x are ignored.
    pub fn insert(&mut self, row: &Row) {
        if let Some(key) = XValue::new(row.x) {
            self.groups
                .entry(key)
                .or_default()
                .extend_from_slice(&row.samples);
        }
    }

    /// Number of distinct x values.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no samples were inserted.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Samples recorded for `x`.
    pub fn samples(&self, x: f64) -> Option<&[f64]> {
        XValue::new(x)
            .and_then(|key| self.groups.get(&key))
            .map(Vec::as_slice)
    }

    /// Median of each group, consuming the set.
    pub fn into_medians(self) -> BTreeMap<XValue, f64> {
        self.groups
            .into_iter()
            .filter(|(_, samples)| !samples.is_empty())
            .map(|(key, mut samples)| (key, median(&mut samples)))
            .collect()
    }
}

/// Bounded-memory aggregator over a row stream.
#[derive(Debug)]
pub struct StreamingAggregator {
    chunk_size: usize,
    reducer: Reducer,
    current: SampleSet,
    rows_in_chunk: usize,
    chunks: usize,
    chunk_medians: BTreeMap<XValue, Vec<f64>>,
    running: BTreeMap<XValue, (f64, usize)>,
}

impl StreamingAggregator {
    /// Create an aggregator that reduces every `chunk_size` rows.
    ///
    /// A `chunk_size` of zero is treated as one.
    pub fn new(chunk_size: usize, reducer: Reducer) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            reducer,
            current: SampleSet::new(),
            rows_in_chunk: 0,
            chunks: 0,
            chunk_medians: BTreeMap::new(),
            running: BTreeMap::new(),
        }
    }

    /// Consume one row.
    pub fn push(&mut self, row: &Row) {
        match self.reducer {
            Reducer::MedianOfMedians => self.current.insert(row),
            Reducer::Mean => {
                if let Some(key) = XValue::new(row.x) {
                    let entry = self.running.entry(key).or_insert((0.0, 0));
                    entry.0 += row.samples.iter().sum::<f64>();
                    entry.1 += row.samples.len();
                }
            }
        }

        self.advance();
    }

    /// Count a rejected data record toward the current chunk.
    pub fn skip(&mut self) {
        self.advance();
    }

    fn advance(&mut self) {
        self.rows_in_chunk += 1;
        if self.rows_in_chunk == self.chunk_size {
            self.flush_chunk();
        }
    }

    /// Chunks reduced so far (a trailing partial chunk counts once finished).
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    fn flush_chunk(&mut self) {
        if self.rows_in_chunk == 0 {
            return;
        }
        self.chunks += 1;
        let chunk = std::mem::take(&mut self.current);
        let distinct = chunk.len();
        for (key, chunk_median) in chunk.into_medians() {
            self.chunk_medians.entry(key).or_default().push(chunk_median);
        }
        debug!(
            "chunk {} reduced: {} rows, {} distinct values",
            self.chunks, self.rows_in_chunk, distinct
        );
        self.rows_in_chunk = 0;
    }

    /// Reduce the trailing partial chunk and produce the final curve.
    pub fn finish(mut self) -> Result<(Curve, usize)> {
        self.flush_chunk();
        let points: Vec<(f64, f64)> = match self.reducer {
            Reducer::MedianOfMedians => self
                .chunk_medians
                .into_iter()
                .map(|(key, mut medians)| (key.get(), median(&mut medians)))
                .collect(),
            Reducer::Mean => self
                .running
                .into_iter()
                .filter(|(_, (_, count))| *count > 0)
                .map(|(key, (sum, count))| (key.get(), sum / count as f64))
                .collect(),
        };
        Ok((Curve::from_points(points)?, self.chunks))
    }
}

/// Aggregate an in-memory row sequence.
pub fn aggregate_rows<'a, I>(rows: I, chunk_size: usize, reducer: Reducer) -> Result<Curve>
where
    I: IntoIterator<Item = &'a Row>,
{
    let mut aggregator = StreamingAggregator::new(chunk_size, reducer);
    for row in rows {
        aggregator.push(row);
    }
    aggregator.finish().map(|(curve, _)| curve)
}
