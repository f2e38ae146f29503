//! Sample ingestion and streaming aggregation.
//!
//! This module turns a stream of raw benchmark records into an aggregated
//! latency curve:
//! - Record parsing with per-reason rejection of malformed rows
//! - Chunked two-level median reduction with bounded memory
//! - Ingestion statistics for the run report

mod aggregate;
mod row;
mod stats;

pub use aggregate::{aggregate_rows, Reducer, SampleSet, StreamingAggregator};
pub use row::{ParsedRecord, Row, RowParser, RowRejection, SampleColumns};
pub use stats::{IngestStats, RejectionCounts};

use csv::{ByteRecord, StringRecord};
use log::{debug, info, warn};

use crate::constants::REJECTION_WARN_RATE;
use crate::error::Result;
use crate::types::Curve;

/// Aggregated curve plus the accounting of how it was built.
#[derive(Debug, Clone)]
pub struct Aggregation {
    /// One representative latency per distinct x, ascending.
    pub curve: Curve,
    /// Record counts, rejections and chunking.
    pub stats: IngestStats,
}

/// Parser and aggregator driven one record at a time.
#[derive(Debug)]
pub struct Ingestor {
    parser: RowParser,
    aggregator: StreamingAggregator,
    stats: IngestStats,
}

impl Ingestor {
    /// Create an ingestor for one pass over a source.
    pub fn new(columns: SampleColumns, chunk_size: usize, reducer: Reducer) -> Self {
        Self {
            parser: RowParser::new(columns),
            aggregator: StreamingAggregator::new(chunk_size, reducer),
            stats: IngestStats::default(),
        }
    }

    /// Decode, parse and aggregate one record.
    ///
    /// Records that are not valid UTF-8 are rejected like any other
    /// malformed row.
    pub fn push(&mut self, record: ByteRecord) {
        match StringRecord::from_byte_record(record) {
            Ok(record) => self.push_text(&record),
            Err(err) => {
                self.stats.total_records += 1;
                debug!(
                    "rejected record {}: {} ({})",
                    self.stats.total_records,
                    RowRejection::InvalidUtf8.description(),
                    err.utf8_error()
                );
                self.reject(RowRejection::InvalidUtf8);
            }
        }
    }

    /// Parse and aggregate one decoded record.
    pub fn push_text(&mut self, record: &StringRecord) {
        self.stats.total_records += 1;
        match self.parser.parse(record) {
            ParsedRecord::Row(row) => {
                self.stats.accepted_rows += 1;
                self.stats.samples += row.samples.len();
                self.aggregator.push(&row);
            }
            ParsedRecord::Header => self.stats.header_seen = true,
            ParsedRecord::Blank => {}
            ParsedRecord::Rejected(reason) => {
                debug!(
                    "rejected record {}: {} ({:?})",
                    self.stats.total_records,
                    reason.description(),
                    record
                );
                self.reject(reason);
            }
        }
    }

    fn reject(&mut self, reason: RowRejection) {
        self.stats.rejected.record(reason);
        self.aggregator.skip();
    }

    /// Finish the pass and build the curve.
    pub fn finish(self) -> Result<Aggregation> {
        let mut stats = self.stats;
        let (curve, chunks) = self.aggregator.finish()?;
        stats.chunks = chunks;
        stats.distinct_x = curve.len();

        info!(
            "aggregated {} rows ({} samples) into {} points over {} chunks",
            stats.accepted_rows, stats.samples, stats.distinct_x, stats.chunks
        );
        if stats.rejection_rate() > REJECTION_WARN_RATE {
            warn!(
                "{} of {} data rows rejected ({:.1}%)",
                stats.rejected_rows(),
                stats.accepted_rows + stats.rejected_rows(),
                stats.rejection_rate() * 100.0
            );
        }

        Ok(Aggregation { curve, stats })
    }
}

/// Ingest a complete record stream.
///
/// Stream-level failures (I/O, a failed benchmark process) abort the pass;
/// malformed records are only counted.
pub fn ingest<I>(
    records: I,
    columns: SampleColumns,
    chunk_size: usize,
    reducer: Reducer,
) -> Result<Aggregation>
where
    I: IntoIterator<Item = Result<ByteRecord>>,
{
    let mut ingestor = Ingestor::new(columns, chunk_size, reducer);
    for record in records {
        ingestor.push(record?);
    }
    ingestor.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(lines: &[&str]) -> Vec<Result<ByteRecord>> {
        lines
            .iter()
            .map(|line| Ok(ByteRecord::from(line.split(',').collect::<Vec<_>>())))
            .collect()
    }

    #[test]
    fn test_ingest_counts_rejections_and_header() {
        let input = records(&[
            "stride,milliseconds",
            "64,2.0",
            "64,4.0",
            "128,bogus",
            "x128,1.0",
            "128,1.0",
        ]);
        let aggregation = ingest(input, SampleColumns::Index(1), 10, Reducer::MedianOfMedians)
            .unwrap();

        assert_eq!(aggregation.curve.x(), &[64.0, 128.0]);
        assert_eq!(aggregation.curve.y(), &[3.0, 1.0]);
        assert!(aggregation.stats.header_seen);
        assert_eq!(aggregation.stats.total_records, 6);
        assert_eq!(aggregation.stats.accepted_rows, 3);
        assert_eq!(aggregation.stats.rejected.bad_sample, 1);
        assert_eq!(aggregation.stats.rejected.bad_x, 1);
        assert_eq!(aggregation.stats.distinct_x, 2);
        assert_eq!(aggregation.stats.chunks, 1);
    }

    #[test]
    fn test_invalid_utf8_row_is_rejected() {
        let mut input = records(&["stride,milliseconds", "64,2.0"]);
        input.push(Ok(ByteRecord::from(vec![&b"\xff\xfe"[..], &b"1"[..]])));
        input.extend(records(&["128,1.0"]));

        let aggregation = ingest(input, SampleColumns::Index(1), 10, Reducer::MedianOfMedians)
            .unwrap();
        assert_eq!(aggregation.curve.x(), &[64.0, 128.0]);
        assert_eq!(aggregation.stats.rejected.invalid_utf8, 1);
        assert_eq!(aggregation.stats.total_records, 4);
        assert_eq!(aggregation.stats.accepted_rows, 2);
    }

    #[test]
    fn test_rejected_rows_advance_chunks() {
        // Header and blank lines do not count; the bad row does
        let input = records(&["stride,milliseconds", "64,1.0", "", "64,oops", "64,3.0"]);
        let aggregation = ingest(input, SampleColumns::Index(1), 2, Reducer::MedianOfMedians)
            .unwrap();
        assert_eq!(aggregation.stats.chunks, 2);
        // Chunk medians 1.0 and 3.0
        assert_eq!(aggregation.curve.y(), &[2.0]);
    }

    #[test]
    fn test_ingest_propagates_stream_error() {
        let mut input = records(&["1,2"]);
        input.push(Err(crate::error::ProbeError::EmptyCurve));
        assert!(ingest(input, SampleColumns::Trailing, 10, Reducer::Mean).is_err());
    }
}
