//! cache-probe CLI
//!
//! Runs the cache microbenchmarks (or reads their recorded output) and
//! prints the inferred parameters.
//!
//! # Commands
//!
//! - `line-size` - Run the stride sweep and predict the cache line size
//! - `associativity` - Run the associativity sweep for one level
//! - `capacity` - Bound, then estimate, the largest cache size
//! - `analyze` - Analyze a previously recorded CSV

use std::path::PathBuf;
use std::process::ExitCode;

use cache_probe::output::{format_report, to_json_pretty};
use cache_probe::{
    CacheLevel, CacheProbe, Config, CsvFileSource, JsonPlotSink, ProbeError, ProbeKind,
    ProbeReport, Result, RunId,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;

/// cache-probe - infer cache line size, associativity and capacity
///
/// Raw benchmark output and plot datasets are written to the output
/// directory, named by run id.
#[derive(Parser)]
#[command(name = "cache-probe")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// JSON configuration file; missing fields take defaults
    #[arg(long, global = true, value_name = "JSON")]
    config: Option<PathBuf>,

    /// Directory for raw CSV records and plot datasets
    #[arg(long, global = true, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Directory containing the benchmark executables
    #[arg(long, global = true, value_name = "DIR")]
    bench_dir: Option<PathBuf>,

    /// Run identifier used in artifact names (default: current time)
    #[arg(long, global = true)]
    run_id: Option<String>,

    /// Report format
    #[arg(long, global = true, value_enum, default_value_t = Format::Terminal)]
    format: Format,

    #[command(flatten)]
    overrides: OverrideArgs,
}

/// Known parameters passed to associativity benchmarks (one is applied per level)
#[derive(Args)]
struct OverrideArgs {
    /// Known L1 size in bytes
    #[arg(long, global = true)]
    l1_size: Option<u64>,

    /// Known L2 size in bytes
    #[arg(long, global = true)]
    l2_size: Option<u64>,

    /// Known L3 size in bytes
    #[arg(long, global = true)]
    l3_size: Option<u64>,

    /// Known L1 associativity
    #[arg(long, global = true)]
    l1_associativity: Option<u64>,

    /// Known L2 associativity
    #[arg(long, global = true)]
    l2_associativity: Option<u64>,

    /// Known cache line size in bytes (also used by capacity benchmarks)
    #[arg(long, global = true)]
    cache_line_size: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the stride benchmark and predict the cache line size
    LineSize,
    /// Run the associativity benchmark for one cache level
    ///
    /// Examples:
    ///   cache-probe associativity --level l2 --l1-size 32768
    Associativity {
        /// Cache level to probe
        #[arg(long, value_enum, default_value_t = LevelArg::L1)]
        level: LevelArg,
    },
    /// Estimate the largest cache size as an interval
    ///
    /// Without --max-cache-size, a coarse bound pass runs first.
    Capacity {
        /// Known upper bound on the cache size, in MB
        #[arg(long)]
        max_cache_size: Option<f64>,
    },
    /// Analyze a recorded benchmark CSV without running anything
    ///
    /// Examples:
    ///   cache-probe analyze line-size --input cache_linesize_benchmark_data.csv
    ///   cache-probe analyze associativity --level l3 --input l3.csv
    Analyze {
        /// Which parameter the CSV was recorded for
        #[arg(value_enum)]
        kind: KindArg,

        /// Recorded CSV file
        #[arg(long, value_name = "CSV")]
        input: PathBuf,

        /// Cache level (associativity only)
        #[arg(long, value_enum, default_value_t = LevelArg::L1)]
        level: LevelArg,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Terminal,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LevelArg {
    L1,
    L2,
    L3,
}

impl From<LevelArg> for CacheLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::L1 => CacheLevel::L1,
            LevelArg::L2 => CacheLevel::L2,
            LevelArg::L3 => CacheLevel::L3,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    LineSize,
    Associativity,
    CapacityBound,
    Capacity,
}

impl KindArg {
    fn probe_kind(self, level: LevelArg) -> ProbeKind {
        match self {
            KindArg::LineSize => ProbeKind::LineSize,
            KindArg::Associativity => ProbeKind::Associativity(level.into()),
            KindArg::CapacityBound => ProbeKind::CapacityBound,
            KindArg::Capacity => ProbeKind::Capacity,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn load_config(global: &GlobalArgs) -> Result<Config> {
    let mut config = match &global.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(dir) = &global.out_dir {
        config.artifact_dir = dir.clone();
    }
    if let Some(dir) = &global.bench_dir {
        config.bench_dir = dir.clone();
    }

    let cli = &global.overrides;
    let overrides = &mut config.overrides;
    overrides.l1_size = cli.l1_size.or(overrides.l1_size);
    overrides.l2_size = cli.l2_size.or(overrides.l2_size);
    overrides.l3_size = cli.l3_size.or(overrides.l3_size);
    overrides.l1_associativity = cli.l1_associativity.or(overrides.l1_associativity);
    overrides.l2_associativity = cli.l2_associativity.or(overrides.l2_associativity);
    overrides.cache_line_size = cli.cache_line_size.or(overrides.cache_line_size);
    if let Some(line) = cli.cache_line_size {
        config.cache_line_size = line;
    }

    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.global)?;
    std::fs::create_dir_all(&config.artifact_dir)
        .map_err(|e| ProbeError::io_at("creating", &config.artifact_dir, e))?;

    let mut sink = JsonPlotSink::new(&config.artifact_dir);
    let run_id = cli
        .global
        .run_id
        .as_deref()
        .map_or_else(RunId::now, RunId::new);
    let mut probe = CacheProbe::with_config(config, run_id);

    let reports = match cli.command {
        Commands::LineSize => vec![probe.measure(ProbeKind::LineSize, &mut sink)?],
        Commands::Associativity { level } => {
            vec![probe.measure(ProbeKind::Associativity(level.into()), &mut sink)?]
        }
        Commands::Capacity { max_cache_size } => {
            if let Some(limit) = max_cache_size {
                probe = probe.max_cache_size(limit);
            }
            probe.measure_capacity(&mut sink)?
        }
        Commands::Analyze { kind, input, level } => {
            let mut source = CsvFileSource::new(input);
            vec![probe.analyze(kind.probe_kind(level), &mut source, &mut sink)?]
        }
    };

    print_reports(&reports, cli.global.format)
}

fn print_reports(reports: &[ProbeReport], format: Format) -> Result<()> {
    for report in reports {
        match format {
            Format::Terminal => println!("{}", format_report(report)),
            Format::Json => println!("{}", to_json_pretty(report)?),
        }
    }
    Ok(())
}
