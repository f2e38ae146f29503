//! Benchmark executable as a record source.
//!
//! The child's stdout is consumed line by line. Every line is appended to the
//! raw CSV artifact and flushed before the CSV reader sees it, so an
//! interrupted run still leaves the data it produced on disk. A pass ends when
//! stdout reaches end of file *and* the child has been waited on; a non-zero
//! exit status surfaces as the final item of the pass.
//!
//! There is no timeout: a benchmark that never exits blocks the pass.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use csv::{ByteRecord, ByteRecordsIntoIter};
use log::{info, warn};

use super::{csv_reader, Records, SampleSource};
use crate::benchmark::BenchmarkCommand;
use crate::error::{ProbeError, Result};

/// Reader adapter that copies each complete line to a sink before serving it.
#[derive(Debug)]
pub struct LineTee<R, W> {
    inner: R,
    sink: W,
    line: Vec<u8>,
    served: usize,
    lines: usize,
}

impl<R: BufRead, W: Write> LineTee<R, W> {
    /// Tee `inner` into `sink`.
    pub fn new(inner: R, sink: W) -> Self {
        Self {
            inner,
            sink,
            line: Vec::new(),
            served: 0,
            lines: 0,
        }
    }

    /// Lines copied so far.
    pub fn lines(&self) -> usize {
        self.lines
    }
}

impl<R: BufRead, W: Write> Read for LineTee<R, W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.served == self.line.len() {
            self.line.clear();
            self.served = 0;
            if self.inner.read_until(b'\n', &mut self.line)? == 0 {
                return Ok(0);
            }
            self.sink.write_all(&self.line)?;
            self.sink.flush()?;
            self.lines += 1;
        }
        let n = buf.len().min(self.line.len() - self.served);
        buf[..n].copy_from_slice(&self.line[self.served..self.served + n]);
        self.served += n;
        Ok(n)
    }
}

type TeeReader = LineTee<BufReader<ChildStdout>, File>;

/// Records of one running benchmark; reaps the child when exhausted or dropped.
struct ProcessRecords {
    records: ByteRecordsIntoIter<TeeReader>,
    child: Option<Child>,
    command: String,
}

impl ProcessRecords {
    fn reap(&mut self) -> Option<Result<ByteRecord>> {
        let mut child = self.child.take()?;
        match child.wait() {
            Ok(status) if status.success() => {
                info!("benchmark `{}` finished", self.command);
                None
            }
            Ok(status) => Some(Err(ProbeError::BenchmarkFailed {
                command: self.command.clone(),
                status,
            })),
            Err(e) => Some(Err(ProbeError::io(
                format!("waiting for `{}`", self.command),
                e,
            ))),
        }
    }
}

impl Iterator for ProcessRecords {
    type Item = Result<ByteRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.child.is_none() {
            return None;
        }
        match self.records.next() {
            Some(record) => Some(record.map_err(ProbeError::from)),
            None => self.reap(),
        }
    }
}

impl Drop for ProcessRecords {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            warn!("abandoning benchmark `{}` before it finished", self.command);
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Benchmark executable whose stdout is the record stream.
#[derive(Debug, Clone)]
pub struct BenchmarkProcess {
    command: BenchmarkCommand,
    artifact: PathBuf,
}

impl BenchmarkProcess {
    /// Run `command`, recording its output at `artifact`.
    ///
    /// Each pass spawns the command again and truncates the artifact.
    pub fn new(command: BenchmarkCommand, artifact: impl Into<PathBuf>) -> Self {
        Self {
            command,
            artifact: artifact.into(),
        }
    }

    /// Command being run.
    pub fn command(&self) -> &BenchmarkCommand {
        &self.command
    }
}

impl SampleSource for BenchmarkProcess {
    fn describe(&self) -> String {
        self.command.to_string()
    }

    fn records(&mut self) -> Result<Records<'_>> {
        let command = self.command.to_string();
        let sink = File::create(&self.artifact)
            .map_err(|e| ProbeError::io_at("creating", &self.artifact, e))?;

        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ProbeError::Spawn {
                command: command.clone(),
                source,
            })?;
        info!(
            "running benchmark `{command}`, recording to {}",
            self.artifact.display()
        );

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ProbeError::io(
                    format!("capturing stdout of `{command}`"),
                    io::Error::new(io::ErrorKind::BrokenPipe, "stdout was not piped"),
                ));
            }
        };

        let tee = LineTee::new(BufReader::new(stdout), sink);
        Ok(Box::new(ProcessRecords {
            records: csv_reader(tee).into_byte_records(),
            child: Some(child),
            command,
        }))
    }

    fn artifact(&self) -> Option<&Path> {
        Some(&self.artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_tee_copies_before_serving() {
        let input: &[u8] = b"1,2\n3,4\npartial";
        let mut sink = Vec::new();
        let mut served = String::new();
        {
            let mut tee = LineTee::new(input, &mut sink);
            tee.read_to_string(&mut served).unwrap();
            assert_eq!(tee.lines(), 3);
        }
        assert_eq!(served, "1,2\n3,4\npartial");
        assert_eq!(sink, input);
    }

    #[test]
    fn test_line_tee_small_buffer() {
        let input: &[u8] = b"abc\nde\n";
        let mut sink = Vec::new();
        let mut tee = LineTee::new(input, &mut sink);
        let mut buf = [0u8; 2];
        let mut out = Vec::new();
        loop {
            let n = tee.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, input);
    }

    #[cfg(unix)]
    fn shell(script: &str) -> BenchmarkCommand {
        BenchmarkCommand::new("/bin/sh").arg("-c").arg(script)
    }

    #[cfg(unix)]
    #[test]
    fn test_process_output_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("raw.csv");
        let mut source = BenchmarkProcess::new(
            shell("echo 'stride,milliseconds'; echo '64,2.5'; echo '128,1.0'"),
            &artifact,
        );

        let records: Vec<ByteRecord> = source
            .records()
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(&records[1][1], b"2.5");

        let recorded = std::fs::read_to_string(&artifact).unwrap();
        assert_eq!(recorded, "stride,milliseconds\n64,2.5\n128,1.0\n");
        assert_eq!(source.artifact(), Some(artifact.as_path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_reported_after_output() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("raw.csv");
        let mut source = BenchmarkProcess::new(shell("echo '1,2'; exit 3"), &artifact);

        let items: Vec<Result<ByteRecord>> = source.records().unwrap().collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        match &items[1] {
            Err(ProbeError::BenchmarkFailed { command, status }) => {
                assert!(command.contains("exit 3"));
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("expected BenchmarkFailed, got {other:?}"),
        }
        assert_eq!(std::fs::read_to_string(&artifact).unwrap(), "1,2\n");
    }

    #[test]
    fn test_missing_executable_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = BenchmarkProcess::new(
            BenchmarkCommand::new(dir.path().join("no_such_benchmark")),
            dir.path().join("raw.csv"),
        );
        assert!(matches!(source.records(), Err(ProbeError::Spawn { .. })));
    }
}
