//! Benchmark executables, their command lines and known-parameter overrides.
//!
//! Every probe kind maps to one external executable plus a fixed CSV layout.
//! Associativity benchmarks accept at most one override flag; which one is
//! applied follows a fixed per-level priority order.

use std::fmt;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::ingest::{Reducer, SampleColumns};
use crate::types::{CacheLevel, ProbeKind};

/// Known cache parameters that narrow an associativity benchmark.
///
/// Sizes are in bytes. Unset fields are not passed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkOverrides {
    /// L1 size.
    pub l1_size: Option<u64>,
    /// L2 size.
    pub l2_size: Option<u64>,
    /// L3 size.
    pub l3_size: Option<u64>,
    /// L1 associativity.
    pub l1_associativity: Option<u64>,
    /// L2 associativity.
    pub l2_associativity: Option<u64>,
    /// Cache line size.
    pub cache_line_size: Option<u64>,
}

/// One recognized override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideOption {
    /// `--l1_size`
    L1Size,
    /// `--l2_size`
    L2Size,
    /// `--l3_size`
    L3Size,
    /// `--l1_associativity`
    L1Associativity,
    /// `--l2_associativity`
    L2Associativity,
    /// `--cache_line_size`
    CacheLineSize,
}

impl OverrideOption {
    /// Flag name without dashes.
    pub fn name(self) -> &'static str {
        match self {
            OverrideOption::L1Size => "l1_size",
            OverrideOption::L2Size => "l2_size",
            OverrideOption::L3Size => "l3_size",
            OverrideOption::L1Associativity => "l1_associativity",
            OverrideOption::L2Associativity => "l2_associativity",
            OverrideOption::CacheLineSize => "cache_line_size",
        }
    }

    fn value(self, overrides: &BenchmarkOverrides) -> Option<u64> {
        match self {
            OverrideOption::L1Size => overrides.l1_size,
            OverrideOption::L2Size => overrides.l2_size,
            OverrideOption::L3Size => overrides.l3_size,
            OverrideOption::L1Associativity => overrides.l1_associativity,
            OverrideOption::L2Associativity => overrides.l2_associativity,
            OverrideOption::CacheLineSize => overrides.cache_line_size,
        }
    }
}

/// Per-level settings of the associativity benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelProfile {
    /// Level probed.
    pub level: CacheLevel,
    /// Overrides recognized for this level, highest priority first.
    pub priority: &'static [OverrideOption],
}

impl LevelProfile {
    /// Profile for `level`.
    pub fn for_level(level: CacheLevel) -> Self {
        use OverrideOption::*;
        let priority: &'static [OverrideOption] = match level {
            CacheLevel::L1 => &[L1Size, CacheLineSize],
            CacheLevel::L2 => &[L1Size, CacheLineSize, L2Size, L1Associativity],
            CacheLevel::L3 => &[
                L1Size,
                CacheLineSize,
                L2Size,
                L1Associativity,
                L2Associativity,
                L3Size,
            ],
        };
        Self { level, priority }
    }

    /// The single `--name=value` flag applied for `overrides`.
    ///
    /// Only the first set option in priority order is used; the rest are
    /// logged and ignored. Options this level does not recognize are ignored
    /// the same way.
    pub fn override_flag(&self, overrides: &BenchmarkOverrides) -> Option<String> {
        let mut chosen: Option<(OverrideOption, u64)> = None;
        for &option in self.priority {
            match (option.value(overrides), chosen) {
                (Some(value), None) => chosen = Some((option, value)),
                (Some(_), Some((winner, _))) => warn!(
                    "{} associativity: ignoring --{} because --{} takes priority",
                    self.level,
                    option.name(),
                    winner.name()
                ),
                (None, _) => {}
            }
        }
        for option in ALL_OPTIONS {
            if option.value(overrides).is_some() && !self.priority.contains(&option) {
                warn!(
                    "{} associativity: --{} is not recognized for this level",
                    self.level,
                    option.name()
                );
            }
        }
        chosen.map(|(option, value)| format!("--{}={value}", option.name()))
    }
}

const ALL_OPTIONS: [OverrideOption; 6] = [
    OverrideOption::L1Size,
    OverrideOption::L2Size,
    OverrideOption::L3Size,
    OverrideOption::L1Associativity,
    OverrideOption::L2Associativity,
    OverrideOption::CacheLineSize,
];

impl ProbeKind {
    /// File name of the benchmark executable for this probe.
    pub fn executable_name(self) -> String {
        match self {
            ProbeKind::LineSize => "cache_linesize_benchmark".to_string(),
            ProbeKind::Associativity(level) => format!("cache_{level}associativity_benchmark"),
            ProbeKind::CapacityBound => "cachesize_maximum".to_string(),
            ProbeKind::Capacity => "cachesize_estimated".to_string(),
        }
    }

    /// CSV layout the benchmark emits.
    pub fn default_columns(self) -> SampleColumns {
        match self {
            ProbeKind::LineSize => SampleColumns::Index(1),
            ProbeKind::Associativity(_) => SampleColumns::Named("access_time".to_string()),
            ProbeKind::CapacityBound | ProbeKind::Capacity => SampleColumns::Trailing,
        }
    }

    /// How samples of one x are reduced.
    pub fn reducer(self) -> Reducer {
        match self {
            ProbeKind::CapacityBound => Reducer::Mean,
            _ => Reducer::MedianOfMedians,
        }
    }

    /// Prefix of the raw CSV artifact.
    pub fn data_prefix(self) -> String {
        format!("{}_benchmark_data", self.slug())
    }

    /// Prefix of the plot dataset artifact.
    pub fn graph_prefix(self) -> String {
        format!("{}_benchmark_graph", self.slug())
    }
}

/// Parameters that select the command line of a benchmark run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkArgs {
    /// Associativity overrides.
    pub overrides: BenchmarkOverrides,
    /// Line size passed to capacity benchmarks.
    pub cache_line_size: u64,
    /// Sweep limit (reported units) for the estimated capacity benchmark.
    pub max_cache_size: Option<f64>,
}

/// Executable plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkCommand {
    /// Program to run.
    pub program: PathBuf,
    /// Arguments, already rendered.
    pub args: Vec<String>,
}

impl BenchmarkCommand {
    /// Command with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Command line for `kind`, with the executable looked up in `bench_dir`.
    pub fn for_probe(kind: ProbeKind, bench_dir: &Path, args: &BenchmarkArgs) -> Self {
        let command = Self::new(bench_dir.join(kind.executable_name()));
        match kind {
            ProbeKind::LineSize => command,
            ProbeKind::Associativity(level) => {
                match LevelProfile::for_level(level).override_flag(&args.overrides) {
                    Some(flag) => command.arg(flag),
                    None => command,
                }
            }
            ProbeKind::CapacityBound => {
                command.arg(format!("--cache_line_size={}", args.cache_line_size))
            }
            ProbeKind::Capacity => {
                let command = command.arg(format!("--cache_line_size={}", args.cache_line_size));
                match args.max_cache_size {
                    Some(limit) => command.arg(format!("--max_cache_size={limit}")),
                    None => command,
                }
            }
        }
    }
}

impl fmt::Display for BenchmarkCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
