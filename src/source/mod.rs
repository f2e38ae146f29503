//! Streaming record sources.
//!
//! A [`SampleSource`] yields the raw CSV records of one benchmark run. Each
//! call to [`SampleSource::records`] starts a fresh, finite pass, so the same
//! source can feed several analyses. Sources perform no parsing beyond CSV
//! field splitting: records stay raw bytes, and text decoding and row
//! validation happen per record in [`crate::ingest`], so one undecodable
//! line is a rejected row rather than a failed stream.

mod file;
mod memory;
mod process;

pub use file::CsvFileSource;
pub use memory::MemorySource;
pub use process::{BenchmarkProcess, LineTee};

use std::path::Path;

use csv::ByteRecord;

use crate::error::Result;

/// Lazy sequence of records from one pass over a source.
pub type Records<'a> = Box<dyn Iterator<Item = Result<ByteRecord>> + 'a>;

/// A restartable source of raw benchmark records.
pub trait SampleSource {
    /// Short description for logs and reports.
    fn describe(&self) -> String;

    /// Start a new pass.
    fn records(&mut self) -> Result<Records<'_>>;

    /// File holding the durable raw record of the last pass, if the source
    /// writes one.
    fn artifact(&self) -> Option<&Path> {
        None
    }
}

/// CSV reader settings shared by file and process sources.
pub(crate) fn csv_reader<R: std::io::Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input)
}
