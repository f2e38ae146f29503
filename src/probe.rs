//! Main `CacheProbe` entry point and builder.

use std::path::PathBuf;
use std::time::Instant;

use log::{info, warn};

use crate::analysis::{detect_associativity, detect_line_size, find_knee, fit_piecewise};
use crate::benchmark::{BenchmarkArgs, BenchmarkCommand, BenchmarkOverrides};
use crate::config::{Config, Rescale};
use crate::denoise::{DenoiseConfig, DenoiseMethod};
use crate::error::{ProbeError, Result};
use crate::ingest::{ingest, Aggregation, SampleColumns};
use crate::plot::{PlotDataset, PlotSink};
use crate::result::{CapacityFit, CapacityInterval, ChangePoint, Estimate, Metadata, ProbeReport};
use crate::source::{BenchmarkProcess, SampleSource};
use crate::types::{CacheLevel, Curve, ProbeKind, RunId};

/// Main entry point for cache parameter inference.
///
/// Use the builder pattern to configure a run, then either analyze an
/// existing record source or run the benchmark executables.
///
/// # Example
///
/// ```no_run
/// use cache_probe::{CacheLevel, CacheProbe, CsvFileSource, MemoryPlotSink};
///
/// let mut source = CsvFileSource::new("cache_L1associativity_benchmark_data.csv");
/// let mut sink = MemoryPlotSink::new();
/// let report = CacheProbe::new()
///     .chunk_size(50_000)
///     .analyze_associativity(CacheLevel::L1, &mut source, &mut sink)?;
/// println!("L1 ways: {:?}", report.value());
/// # Ok::<(), cache_probe::ProbeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CacheProbe {
    config: Config,
    run_id: RunId,
}

impl Default for CacheProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheProbe {
    /// Create with default configuration and a run id taken from the clock.
    pub fn new() -> Self {
        Self::with_config(Config::default(), RunId::now())
    }

    /// Create from an explicit configuration and run identifier.
    pub fn with_config(config: Config, run_id: RunId) -> Self {
        Self { config, run_id }
    }

    /// Create with settings for small, fast offline runs.
    ///
    /// Settings:
    /// - 1,000 rows per chunk (vs 10,000 default)
    /// - 4 capacity segments (vs 6 default)
    pub fn quick() -> Self {
        let config = Config {
            chunk_size: 1_000,
            piecewise_segments: 4,
            ..Config::default()
        };
        Self::with_config(config, RunId::now())
    }

    /// Create with every smoothing stage disabled.
    ///
    /// Detectors, the knee and the capacity fit all see the aggregated curve
    /// as is; the capacity report then holds only the raw fit.
    pub fn raw() -> Self {
        let config = Config {
            bound_denoise: DenoiseConfig::none(),
            capacity_denoise: DenoiseConfig::none(),
            detector_denoise: DenoiseConfig::none(),
            ..Config::default()
        };
        Self::with_config(config, RunId::now())
    }

    /// Set the run identifier used to name artifacts.
    pub fn run_id(mut self, run_id: RunId) -> Self {
        self.run_id = run_id;
        self
    }

    /// Set rows per aggregation chunk.
    pub fn chunk_size(mut self, rows: usize) -> Self {
        self.config.chunk_size = rows;
        self
    }

    /// Set the line size ratio threshold.
    pub fn ratio_threshold(mut self, threshold: f64) -> Self {
        self.config.ratio_threshold = threshold;
        self
    }

    /// Set the line size reported when no threshold crossing is found.
    pub fn line_size_fallback(mut self, fallback: f64) -> Self {
        self.config.line_size_fallback = fallback;
        self
    }

    /// Set the Kneedle sensitivity.
    pub fn knee_sensitivity(mut self, sensitivity: f64) -> Self {
        self.config.knee_sensitivity = sensitivity;
        self
    }

    /// Set smoothing before change-point detection.
    pub fn detector_denoise(mut self, denoise: DenoiseConfig) -> Self {
        self.config.detector_denoise = denoise;
        self
    }

    /// Set smoothing before knee location.
    pub fn bound_denoise(mut self, denoise: DenoiseConfig) -> Self {
        self.config.bound_denoise = denoise;
        self
    }

    /// Set smoothing before the denoised capacity fit.
    pub fn capacity_denoise(mut self, denoise: DenoiseConfig) -> Self {
        self.config.capacity_denoise = denoise;
        self
    }

    /// Set the number of capacity segments.
    pub fn piecewise_segments(mut self, segments: usize) -> Self {
        self.config.piecewise_segments = segments;
        self
    }

    /// Set the capacity unit rescaling.
    pub fn rescale(mut self, rescale: Rescale) -> Self {
        self.config.rescale = rescale;
        self
    }

    /// Override the CSV sample layout for every probe.
    pub fn sample_columns(mut self, columns: SampleColumns) -> Self {
        self.config.sample_columns = Some(columns);
        self
    }

    /// Set associativity benchmark overrides.
    pub fn overrides(mut self, overrides: BenchmarkOverrides) -> Self {
        self.config.overrides = overrides;
        self
    }

    /// Set the capacity sweep limit (reported units).
    pub fn max_cache_size(mut self, limit: f64) -> Self {
        self.config.max_cache_size = Some(limit);
        self
    }

    /// Set the directory receiving raw records.
    pub fn artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.artifact_dir = dir.into();
        self
    }

    /// Set the directory holding the benchmark executables.
    pub fn bench_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.bench_dir = dir.into();
        self
    }

    /// Get the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the run identifier.
    pub fn id(&self) -> &RunId {
        &self.run_id
    }

    /// Analyze one pass of `source` as the given probe kind.
    pub fn analyze(
        &self,
        kind: ProbeKind,
        source: &mut dyn SampleSource,
        sink: &mut dyn PlotSink,
    ) -> Result<ProbeReport> {
        match kind {
            ProbeKind::LineSize => self.analyze_line_size(source, sink),
            ProbeKind::Associativity(level) => self.analyze_associativity(level, source, sink),
            ProbeKind::CapacityBound => self.analyze_capacity_bound(source, sink),
            ProbeKind::Capacity => self.analyze_capacity(source, sink),
        }
    }

    /// Infer the cache line size from a stride sweep.
    pub fn analyze_line_size(
        &self,
        source: &mut dyn SampleSource,
        sink: &mut dyn PlotSink,
    ) -> Result<ProbeReport> {
        let kind = ProbeKind::LineSize;
        let run = self.begin(kind, source)?;
        let smoothed = smooth(&self.config.detector_denoise, &run.aggregation.curve)?;
        let target = smoothed.as_ref().unwrap_or(&run.aggregation.curve);

        let line_size = detect_line_size(
            target,
            self.config.ratio_threshold,
            self.config.line_size_fallback,
        );
        match line_size {
            ChangePoint::Detected(x) => info!("cache line size predicted: {x} bytes"),
            ChangePoint::Fallback(x) => {
                info!("no latency drop above the threshold; reporting fallback {x} bytes")
            }
            ChangePoint::NoSignal => warn!("too few strides to predict a line size"),
        }

        let plot = change_point_plot(
            PlotDataset::new(kind, self.run_id.clone()),
            &run.aggregation.curve,
            smoothed,
            line_size,
            "Predicted line size",
        );
        self.finish(
            run,
            Estimate::LineSize { line_size },
            self.config.detector_denoise,
            source,
            &plot,
            sink,
        )
    }

    /// Infer the set associativity of `level`.
    pub fn analyze_associativity(
        &self,
        level: CacheLevel,
        source: &mut dyn SampleSource,
        sink: &mut dyn PlotSink,
    ) -> Result<ProbeReport> {
        let kind = ProbeKind::Associativity(level);
        let run = self.begin(kind, source)?;
        let smoothed = smooth(&self.config.detector_denoise, &run.aggregation.curve)?;
        let target = smoothed.as_ref().unwrap_or(&run.aggregation.curve);

        let ways = detect_associativity(target);
        match ways {
            ChangePoint::NoSignal => warn!("{level} associativity: no significant change detected"),
            _ => info!("{level} associativity predicted: {}", ways.value().unwrap_or_default()),
        }

        let plot = change_point_plot(
            PlotDataset::new(kind, self.run_id.clone()),
            &run.aggregation.curve,
            smoothed,
            ways,
            "Predicted associativity",
        );
        self.finish(
            run,
            Estimate::Associativity { level, ways },
            self.config.detector_denoise,
            source,
            &plot,
            sink,
        )
    }

    /// Bound the largest cache from above with a coarse size sweep.
    ///
    /// Samples are averaged per size, smoothed, and the knee of the result is
    /// the bound.
    pub fn analyze_capacity_bound(
        &self,
        source: &mut dyn SampleSource,
        sink: &mut dyn PlotSink,
    ) -> Result<ProbeReport> {
        let kind = ProbeKind::CapacityBound;
        let run = self.begin(kind, source)?;
        let smoothed = smooth(&self.config.bound_denoise, &run.aggregation.curve)?;
        let target = smoothed.as_ref().unwrap_or(&run.aggregation.curve);

        let knee = find_knee(target, self.config.knee_sensitivity);
        match knee.x() {
            Some(x) => info!("largest cache should not exceed {x}"),
            None => warn!("no knee found in the size sweep: {knee:?}"),
        }

        let mut plot =
            PlotDataset::new(kind, self.run_id.clone()).with_series("Mean", run.aggregation.curve.clone());
        if let Some(curve) = smoothed {
            plot = plot.with_series("Smoothed", curve);
        }
        if let Some(x) = knee.x() {
            plot = plot.with_marker(x, format!("Max cache size: {x}"));
        }
        self.finish(
            run,
            Estimate::CapacityBound { knee },
            self.config.bound_denoise,
            source,
            &plot,
            sink,
        )
    }

    /// Estimate the cache capacity interval from a fine size sweep.
    ///
    /// The median curve is fitted as is and, when capacity smoothing is
    /// enabled, once more after smoothing.
    pub fn analyze_capacity(
        &self,
        source: &mut dyn SampleSource,
        sink: &mut dyn PlotSink,
    ) -> Result<ProbeReport> {
        let kind = ProbeKind::Capacity;
        let run = self.begin(kind, source)?;
        let raw = &run.aggregation.curve;
        if raw.is_empty() {
            return Err(ProbeError::EmptyCurve);
        }

        let mut plot = PlotDataset::new(kind, self.run_id.clone()).with_series("Raw", raw.clone());
        let mut fits = vec![self.capacity_fit(raw, DenoiseMethod::None, &mut plot)?];
        if let Some(smoothed) = smooth(&self.config.capacity_denoise, raw)? {
            plot = plot.with_series("Denoised", smoothed.clone());
            fits.push(self.capacity_fit(&smoothed, self.config.capacity_denoise.method, &mut plot)?);
        }

        self.finish(
            run,
            Estimate::Capacity { fits },
            self.config.capacity_denoise,
            source,
            &plot,
            sink,
        )
    }

    fn capacity_fit(
        &self,
        curve: &Curve,
        denoise: DenoiseMethod,
        plot: &mut PlotDataset,
    ) -> Result<CapacityFit> {
        let fit = fit_piecewise(curve, self.config.piecewise_segments)?;
        let interval = CapacityInterval::from_breakpoint(fit.last_breakpoint(), &self.config.rescale);
        info!(
            "{} curve: cache size within [{:.2}, {:.2}] {}",
            denoise.label(),
            interval.low,
            interval.high,
            interval.unit
        );

        let (low, high) = interval.raw_bounds(&self.config.rescale);
        let label = denoise.label();
        plot.add_series(format!("{label} fit"), fit.predict_curve(curve));
        plot.add_marker(low, format!("{label} lower bound"));
        plot.add_marker(high, format!("{label} upper bound"));

        Ok(CapacityFit {
            denoise,
            breakpoints: fit.breakpoints,
            rss: fit.rss,
            interval,
        })
    }

    /// Benchmark process source for `kind`, recording into the artifact directory.
    pub fn benchmark_source(&self, kind: ProbeKind) -> BenchmarkProcess {
        let args = BenchmarkArgs {
            overrides: self.config.overrides.clone(),
            cache_line_size: self.config.cache_line_size,
            max_cache_size: self.config.max_cache_size,
        };
        let command = BenchmarkCommand::for_probe(kind, &self.config.bench_dir, &args);
        let artifact = self
            .config
            .artifact_dir
            .join(self.run_id.artifact_name(&kind.data_prefix(), "csv"));
        BenchmarkProcess::new(command, artifact)
    }

    /// Run the benchmark for `kind` and analyze its output.
    pub fn measure(&self, kind: ProbeKind, sink: &mut dyn PlotSink) -> Result<ProbeReport> {
        let mut source = self.benchmark_source(kind);
        self.analyze(kind, &mut source, sink)
    }

    /// Two-pass capacity measurement.
    ///
    /// Without a configured `max_cache_size`, the bound pass runs first and
    /// its knee limits the capacity sweep. Returns the bound report (if the
    /// bound pass ran) followed by the capacity report.
    pub fn measure_capacity(&self, sink: &mut dyn PlotSink) -> Result<Vec<ProbeReport>> {
        let mut reports = Vec::with_capacity(2);
        let mut probe = self.clone();
        if self.config.max_cache_size.is_none() {
            let bound = self.measure(ProbeKind::CapacityBound, sink)?;
            match bound.value() {
                Some(limit) if limit > 0.0 => probe.config.max_cache_size = Some(limit),
                _ => warn!("no capacity bound found; running the capacity sweep with its own default range"),
            }
            reports.push(bound);
        }
        reports.push(probe.measure(ProbeKind::Capacity, sink)?);
        Ok(reports)
    }

    fn begin(&self, kind: ProbeKind, source: &mut dyn SampleSource) -> Result<Run> {
        self.config.validate()?;
        let started = Instant::now();
        info!("run {}: analyzing {kind} from {}", self.run_id, source.describe());

        let columns = self
            .config
            .sample_columns
            .clone()
            .unwrap_or_else(|| kind.default_columns());
        let aggregation = ingest(source.records()?, columns, self.config.chunk_size, kind.reducer())?;
        Ok(Run {
            kind,
            started,
            aggregation,
        })
    }

    fn finish(
        &self,
        run: Run,
        estimate: Estimate,
        denoise: DenoiseConfig,
        source: &dyn SampleSource,
        plot: &PlotDataset,
        sink: &mut dyn PlotSink,
    ) -> Result<ProbeReport> {
        let plot_artifacts = sink.submit(plot)?.into_iter().collect();
        Ok(ProbeReport {
            kind: run.kind,
            estimate,
            metadata: Metadata {
                run_id: self.run_id.clone(),
                points: run.aggregation.curve.len(),
                ingest: run.aggregation.stats,
                denoise,
                raw_artifact: source.artifact().map(PathBuf::from),
                plot_artifacts,
                runtime_secs: run.started.elapsed().as_secs_f64(),
            },
        })
    }
}

/// State carried from ingestion to the report.
struct Run {
    kind: ProbeKind,
    started: Instant,
    aggregation: Aggregation,
}

/// Apply `denoise` when enabled. An empty curve cannot be smoothed.
fn smooth(denoise: &DenoiseConfig, curve: &Curve) -> Result<Option<Curve>> {
    if !denoise.is_enabled() {
        return Ok(None);
    }
    if curve.is_empty() {
        return Err(ProbeError::EmptyCurve);
    }
    denoise.apply(curve).map(Some)
}

fn change_point_plot(
    plot: PlotDataset,
    raw: &Curve,
    smoothed: Option<Curve>,
    result: ChangePoint,
    label: &str,
) -> PlotDataset {
    let mut plot = plot.with_series("Median", raw.clone());
    if let Some(curve) = smoothed {
        plot = plot.with_series("Denoised", curve);
    }
    match result.value() {
        Some(x) => plot.with_marker(x, label),
        None => plot,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::MemoryPlotSink;
    use crate::source::MemorySource;

    fn probe() -> CacheProbe {
        CacheProbe::with_config(Config::default(), RunId::new("test"))
    }

    #[test]
    fn test_line_size_from_memory() {
        let mut source = MemorySource::from_lines([
            "stride,milliseconds",
            "64,100",
            "64,100",
            "128,100",
            "256,58",
            "512,57",
        ]);
        let mut sink = MemoryPlotSink::new();
        let report = probe().analyze_line_size(&mut source, &mut sink).unwrap();

        assert_eq!(
            report.estimate,
            Estimate::LineSize {
                line_size: ChangePoint::Detected(128.0)
            }
        );
        assert!(report.metadata.ingest.header_seen);
        assert_eq!(report.metadata.points, 4);
        assert_eq!(sink.datasets[0].markers[0].x, 128.0);
    }

    #[test]
    fn test_associativity_with_named_column() {
        let mut lines = vec!["associativity,element_index,access_time".to_string()];
        for (ways, latency) in [(1, 10), (2, 10), (4, 11), (8, 40), (16, 41)] {
            for element in 0..3 {
                lines.push(format!("{ways},{element},{latency}"));
            }
        }
        let mut source = MemorySource::from_lines(&lines);
        let mut sink = MemoryPlotSink::new();
        let report = probe()
            .analyze_associativity(CacheLevel::L2, &mut source, &mut sink)
            .unwrap();
        assert_eq!(report.value(), Some(4.0));
        assert_eq!(report.kind, ProbeKind::Associativity(CacheLevel::L2));
    }

    #[test]
    fn test_capacity_bound_reports_knee() {
        let rows: Vec<(f64, Vec<f64>)> = (1..=20)
            .map(|mb| {
                let x = f64::from(mb);
                let latency = if x <= 8.0 { 4.0 + x } else { 12.0 + 0.1 * (x - 8.0) };
                (x, vec![latency - 0.5, latency + 0.5])
            })
            .collect();
        let mut source = MemorySource::from_samples(rows);
        let mut sink = MemoryPlotSink::new();
        let report = probe().analyze_capacity_bound(&mut source, &mut sink).unwrap();
        let knee = report.value().unwrap();
        assert!((6.0..=10.0).contains(&knee), "knee {knee}");
        assert_eq!(sink.datasets[0].series.len(), 2);
    }

    #[test]
    fn test_capacity_reports_raw_and_denoised_fits() {
        let rows: Vec<(f64, Vec<f64>)> = (1..=48)
            .map(|i| {
                let kb = f64::from(i) * 512.0;
                let latency = if kb <= 16384.0 { 5.0 } else { 5.0 + (kb - 16384.0) / 256.0 };
                (kb, vec![latency])
            })
            .collect();
        let mut source = MemorySource::from_samples(rows);
        let mut sink = MemoryPlotSink::new();
        let report = probe()
            .piecewise_segments(2)
            .analyze_capacity(&mut source, &mut sink)
            .unwrap();

        let Estimate::Capacity { fits } = &report.estimate else {
            panic!("expected capacity estimate");
        };
        assert_eq!(fits.len(), 2);
        assert_eq!(fits[0].denoise, DenoiseMethod::None);
        assert!(fits[0].interval.contains(16.0), "{:?}", fits[0].interval);
        assert_eq!(sink.datasets[0].markers.len(), 4);
    }

    #[test]
    fn test_capacity_on_empty_source_is_error() {
        let mut source = MemorySource::default();
        let mut sink = MemoryPlotSink::new();
        assert!(matches!(
            probe().analyze_capacity(&mut source, &mut sink),
            Err(ProbeError::EmptyCurve)
        ));
    }

    #[test]
    fn test_benchmark_source_names_artifact() {
        let probe = probe().artifact_dir("out").bench_dir("bin");
        let source = probe.benchmark_source(ProbeKind::LineSize);
        assert_eq!(
            source.artifact(),
            Some(std::path::Path::new("out/cache_linesize_benchmark_data_test.csv"))
        );
        assert!(source.command().program.ends_with("cache_linesize_benchmark"));
    }

    #[test]
    fn test_with_config_keeps_run_id() {
        let config = CacheProbe::quick().config().clone();
        let probe = CacheProbe::with_config(config, RunId::new("fixed"));
        assert_eq!(probe.id(), &RunId::new("fixed"));
        assert_eq!(probe.config().chunk_size, 1_000);

        let source = probe.benchmark_source(ProbeKind::Capacity);
        assert!(source
            .artifact()
            .unwrap()
            .ends_with("cache_size_estimated_benchmark_data_fixed.csv"));
    }

    /// Writes an executable `name` into `dir` that prints `rows` and records
    /// its arguments in `<name>.args`.
    #[cfg(unix)]
    fn fake_benchmark(dir: &std::path::Path, name: &str, rows: &[String]) {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        let script = format!(
            "#!/bin/sh\necho \"$@\" > '{}'\ncat <<'ROWS'\n{}\nROWS\n",
            dir.join(format!("{name}.args")).display(),
            rows.join("\n")
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    fn recorded_args(dir: &std::path::Path, name: &str) -> Option<String> {
        std::fs::read_to_string(dir.join(format!("{name}.args")))
            .ok()
            .map(|args| args.trim().to_string())
    }

    /// Coarse sweep in MB that saturates after 8 MB.
    #[cfg(unix)]
    fn saturating_rows() -> Vec<String> {
        (1..=20)
            .map(|mb| {
                let x = f64::from(mb);
                let latency = if x <= 8.0 { 4.0 + x } else { 12.0 + 0.1 * (x - 8.0) };
                format!("{mb} MB, {}, {}", latency - 0.5, latency + 0.5)
            })
            .collect()
    }

    /// Fine sweep in KB that starts rising after 16 MB.
    #[cfg(unix)]
    fn capacity_rows() -> Vec<String> {
        (1..=48)
            .map(|i| {
                let kb = f64::from(i) * 512.0;
                let latency = if kb <= 16384.0 { 5.0 } else { 5.0 + (kb - 16384.0) / 256.0 };
                format!("{kb} KB, {latency}")
            })
            .collect()
    }

    #[cfg(unix)]
    fn scripted_bench_dir(bench_dir: &std::path::Path) -> CacheProbe {
        probe()
            .piecewise_segments(2)
            .bench_dir(bench_dir)
            .artifact_dir(bench_dir)
    }

    #[cfg(unix)]
    #[test]
    fn test_measure_capacity_passes_knee_to_capacity_sweep() {
        let dir = tempfile::tempdir().unwrap();
        fake_benchmark(dir.path(), "cachesize_maximum", &saturating_rows());
        fake_benchmark(dir.path(), "cachesize_estimated", &capacity_rows());

        let probe = scripted_bench_dir(dir.path());
        let reports = probe.measure_capacity(&mut MemoryPlotSink::new()).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].kind, ProbeKind::CapacityBound);
        assert_eq!(reports[1].kind, ProbeKind::Capacity);
        let knee = reports[0].value().unwrap();
        assert!((6.0..=10.0).contains(&knee), "knee {knee}");

        let line_size = probe.config().cache_line_size;
        assert_eq!(
            recorded_args(dir.path(), "cachesize_maximum").unwrap(),
            format!("--cache_line_size={line_size}")
        );
        assert_eq!(
            recorded_args(dir.path(), "cachesize_estimated").unwrap(),
            format!("--cache_line_size={line_size} --max_cache_size={knee}")
        );

        let Estimate::Capacity { fits } = &reports[1].estimate else {
            panic!("expected capacity estimate, got {:?}", reports[1].estimate);
        };
        assert!(fits[0].interval.contains(16.0), "{:?}", fits[0].interval);
        assert!(reports[1].metadata.raw_artifact.as_ref().unwrap().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_measure_capacity_with_limit_skips_bound_pass() {
        let dir = tempfile::tempdir().unwrap();
        fake_benchmark(dir.path(), "cachesize_maximum", &saturating_rows());
        fake_benchmark(dir.path(), "cachesize_estimated", &capacity_rows());

        let reports = scripted_bench_dir(dir.path())
            .max_cache_size(20.0)
            .measure_capacity(&mut MemoryPlotSink::new())
            .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, ProbeKind::Capacity);
        assert_eq!(recorded_args(dir.path(), "cachesize_maximum"), None);
        assert!(recorded_args(dir.path(), "cachesize_estimated")
            .unwrap()
            .ends_with("--max_cache_size=20"));
    }

    #[cfg(unix)]
    #[test]
    fn test_measure_capacity_without_knee_runs_default_range() {
        let dir = tempfile::tempdir().unwrap();
        let flat: Vec<String> = (1..=20).map(|mb| format!("{mb} MB, 7.0, 7.0")).collect();
        fake_benchmark(dir.path(), "cachesize_maximum", &flat);
        fake_benchmark(dir.path(), "cachesize_estimated", &capacity_rows());

        let probe = CacheProbe::with_config(CacheProbe::raw().config().clone(), RunId::new("flat"))
            .piecewise_segments(2)
            .bench_dir(dir.path())
            .artifact_dir(dir.path());
        let reports = probe.measure_capacity(&mut MemoryPlotSink::new()).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].value(), None);
        let args = recorded_args(dir.path(), "cachesize_estimated").unwrap();
        assert!(!args.contains("--max_cache_size"), "{args}");
    }

    #[test]
    fn test_presets() {
        assert_eq!(CacheProbe::quick().config().chunk_size, 1_000);
        assert!(!CacheProbe::raw().config().capacity_denoise.is_enabled());
    }
}
