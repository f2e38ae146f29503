use csv::StringRecord;

use super::{Records, SampleSource};
use crate::error::Result;

/// Records held in memory. Used for synthetic data and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<StringRecord>,
}

impl MemorySource {
    /// Wrap prepared records.
    pub fn new(records: Vec<StringRecord>) -> Self {
        Self { records }
    }

    /// Split each line on commas, trimming fields.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let records = lines
            .into_iter()
            .map(|line| {
                line.as_ref()
                    .split(',')
                    .map(str::trim)
                    .collect::<StringRecord>()
            })
            .collect();
        Self { records }
    }

    /// One record per `(x, samples)` pair.
    pub fn from_samples<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (f64, Vec<f64>)>,
    {
        let records = rows
            .into_iter()
            .map(|(x, samples)| {
                std::iter::once(x.to_string())
                    .chain(samples.iter().map(f64::to_string))
                    .collect::<StringRecord>()
            })
            .collect();
        Self { records }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the source holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SampleSource for MemorySource {
    fn describe(&self) -> String {
        format!("{} in-memory records", self.records.len())
    }

    fn records(&mut self) -> Result<Records<'_>> {
        Ok(Box::new(
            self.records
                .iter()
                .map(|record| Ok(record.as_byte_record().clone())),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csv::ByteRecord;

    #[test]
    fn test_passes_are_repeatable() {
        let mut source = MemorySource::from_lines(["1, 2", "3,4"]);
        let first: Vec<ByteRecord> = source.records().unwrap().map(|r| r.unwrap()).collect();
        let second: Vec<ByteRecord> = source.records().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(first, second);
        assert_eq!(&first[0][1], b"2");
    }

    #[test]
    fn test_from_samples() {
        let mut source = MemorySource::from_samples(vec![(8.0, vec![1.5, 2.0])]);
        let record = source.records().unwrap().next().unwrap().unwrap();
        assert_eq!(record, ByteRecord::from(vec!["8", "1.5", "2"]));
    }
}
