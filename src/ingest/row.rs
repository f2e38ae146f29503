//! Parsing of raw benchmark records into rows.
//!
//! Benchmarks print one record per trial: an independent-variable value
//! followed by one or more latency samples. The x field may carry a unit
//! suffix (`"512 KB"`), sample fields may be padded or empty, and some
//! benchmarks print a header line first. A record that cannot be read is
//! rejected with a reason; it never aborts the run.

use csv::StringRecord;
use serde::{Deserialize, Serialize};

/// Which fields of a record hold latency samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleColumns {
    /// Every field after the first (`<size> KB, s1, s2, ...`).
    Trailing,
    /// Exactly one field, by zero-based position.
    Index(usize),
    /// Exactly one field, located by its header name.
    Named(String),
}

impl Default for SampleColumns {
    fn default() -> Self {
        Self::Trailing
    }
}

/// One accepted record.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Independent-variable value.
    pub x: f64,
    /// Latency samples; never empty, all finite.
    pub samples: Vec<f64>,
}

impl Row {
    /// Create a row.
    pub fn new(x: f64, samples: Vec<f64>) -> Self {
        Self { x, samples }
    }
}

/// Why a record was excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowRejection {
    /// The x field is missing, non-numeric or non-finite.
    BadX,
    /// A non-empty sample field is non-numeric or non-finite.
    BadSample,
    /// The record carries no sample values.
    NoSamples,
    /// The configured sample column does not exist in this record.
    MissingColumn,
    /// The record is not valid UTF-8.
    InvalidUtf8,
}

impl RowRejection {
    /// Human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            RowRejection::BadX => "independent variable is not a finite number",
            RowRejection::BadSample => "sample field is not a finite number",
            RowRejection::NoSamples => "record has no samples",
            RowRejection::MissingColumn => "sample column is missing",
            RowRejection::InvalidUtf8 => "record is not valid UTF-8",
        }
    }
}

/// Outcome of parsing one record.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedRecord {
    /// A usable row.
    Row(Row),
    /// The leading header line.
    Header,
    /// An empty line.
    Blank,
    /// An excluded record.
    Rejected(RowRejection),
}

/// Stateful record parser; remembers the header for named sample columns.
#[derive(Debug, Clone)]
pub struct RowParser {
    columns: SampleColumns,
    named_index: Option<usize>,
    seen_data: bool,
}

impl RowParser {
    /// Create a parser for the given sample column layout.
    pub fn new(columns: SampleColumns) -> Self {
        Self {
            columns,
            named_index: None,
            seen_data: false,
        }
    }

    /// Parse one record.
    ///
    /// The first non-blank record is treated as a header when its x field
    /// is not numeric; afterwards such records are rejected.
    pub fn parse(&mut self, record: &StringRecord) -> ParsedRecord {
        if record.iter().all(|field| field.trim().is_empty()) {
            return ParsedRecord::Blank;
        }

        let first_record = !self.seen_data;
        self.seen_data = true;

        let x = match record.get(0).and_then(parse_x) {
            Some(x) => x,
            None if first_record => {
                self.read_header(record);
                return ParsedRecord::Header;
            }
            None => return ParsedRecord::Rejected(RowRejection::BadX),
        };

        match self.samples(record) {
            Ok(samples) if samples.is_empty() => ParsedRecord::Rejected(RowRejection::NoSamples),
            Ok(samples) => ParsedRecord::Row(Row::new(x, samples)),
            Err(reason) => ParsedRecord::Rejected(reason),
        }
    }

    fn read_header(&mut self, record: &StringRecord) {
        if let SampleColumns::Named(name) = &self.columns {
            self.named_index = record.iter().position(|field| field.trim() == name);
        }
    }

    fn samples(&self, record: &StringRecord) -> Result<Vec<f64>, RowRejection> {
        match &self.columns {
            SampleColumns::Trailing => record.iter().skip(1).filter_map(parse_sample).collect(),
            SampleColumns::Index(index) => single_column(record, Some(*index)),
            SampleColumns::Named(_) => single_column(record, self.named_index),
        }
    }
}

fn single_column(record: &StringRecord, index: Option<usize>) -> Result<Vec<f64>, RowRejection> {
    let field = index
        .and_then(|i| record.get(i))
        .ok_or(RowRejection::MissingColumn)?;
    parse_sample(field).into_iter().collect()
}

/// Parse the x field: trimmed, first space-separated token.
fn parse_x(field: &str) -> Option<f64> {
    let token = field.split_whitespace().next()?;
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a sample field; `None` for an empty field.
fn parse_sample(field: &str) -> Option<Result<f64, RowRejection>> {
    let field = field.trim();
    if field.is_empty() {
        return None;
    }
    Some(
        field
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or(RowRejection::BadSample),
    )
}
