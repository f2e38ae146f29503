//! Accounting for ingested and rejected records.

use serde::{Deserialize, Serialize};

use super::row::RowRejection;

/// Per-reason rejection counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionCounts {
    /// Non-numeric or missing independent variable.
    pub bad_x: usize,
    /// Non-numeric sample field.
    pub bad_sample: usize,
    /// Record without samples.
    pub no_samples: usize,
    /// Configured sample column absent.
    pub missing_column: usize,
    /// Undecodable bytes in the record.
    pub invalid_utf8: usize,
}

impl RejectionCounts {
    /// Count one rejection.
    pub fn record(&mut self, reason: RowRejection) {
        match reason {
            RowRejection::BadX => self.bad_x += 1,
            RowRejection::BadSample => self.bad_sample += 1,
            RowRejection::NoSamples => self.no_samples += 1,
            RowRejection::MissingColumn => self.missing_column += 1,
            RowRejection::InvalidUtf8 => self.invalid_utf8 += 1,
        }
    }

    /// Total rejections across all reasons.
    pub fn total(&self) -> usize {
        self.bad_x + self.bad_sample + self.no_samples + self.missing_column + self.invalid_utf8
    }
}

/// Statistics about one ingestion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Records read from the source, including header and blank lines.
    pub total_records: usize,
    /// Rows accepted into aggregation.
    pub accepted_rows: usize,
    /// Whether a header line was recognized.
    pub header_seen: bool,
    /// Latency samples accepted.
    pub samples: usize,
    /// Chunks reduced by the aggregator.
    pub chunks: usize,
    /// Distinct independent-variable values in the final curve.
    pub distinct_x: usize,
    /// Rejections by reason.
    pub rejected: RejectionCounts,
}

impl IngestStats {
    /// Rows rejected for any reason.
    pub fn rejected_rows(&self) -> usize {
        self.rejected.total()
    }

    /// Fraction of data records (accepted + rejected) that were rejected.
    pub fn rejection_rate(&self) -> f64 {
        let data_rows = self.accepted_rows + self.rejected_rows();
        if data_rows == 0 {
            0.0
        } else {
            self.rejected_rows() as f64 / data_rows as f64
        }
    }
}
