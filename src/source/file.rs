use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use super::{csv_reader, Records, SampleSource};
use crate::error::{ProbeError, Result};

/// A persisted CSV record, read for offline analysis.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    /// Source reading `path`; the file is opened on each pass.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File being read.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SampleSource for CsvFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn records(&mut self) -> Result<Records<'_>> {
        let file = File::open(&self.path).map_err(|e| ProbeError::io_at("opening", &self.path, e))?;
        let reader = csv_reader(BufReader::new(file));
        Ok(Box::new(
            reader
                .into_byte_records()
                .map(|record| record.map_err(ProbeError::from)),
        ))
    }

    fn artifact(&self) -> Option<&Path> {
        Some(&self.path)
    }
}
