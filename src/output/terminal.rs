//! Terminal output formatting with colors and box drawing.

use colored::Colorize;

use crate::result::{CapacityFit, ChangePoint, Estimate, KneeResult, ProbeReport};

/// Format a ProbeReport for human-readable terminal output.
pub fn format_report(report: &ProbeReport) -> String {
    let mut output = String::new();
    let sep = "\u{2500}".repeat(62);

    output.push_str(&format!("cache-probe: {}\n", report.kind));
    output.push_str(&sep);
    output.push('\n');
    output.push('\n');

    let stats = &report.metadata.ingest;
    output.push_str(&format!("  Run: {}\n", report.metadata.run_id));
    output.push_str(&format!(
        "  Rows: {} accepted, {} rejected ({} samples, {} chunks)\n",
        stats.accepted_rows,
        stats.rejected_rows(),
        stats.samples,
        stats.chunks
    ));
    output.push_str(&format!("  Points: {}\n", report.metadata.points));
    output.push('\n');

    match &report.estimate {
        Estimate::LineSize { line_size } => {
            output.push_str(&format_change_point("Cache line size", *line_size, "bytes"));
        }
        Estimate::Associativity { level, ways } => {
            output.push_str(&format_change_point(
                &format!("{level} associativity"),
                *ways,
                "ways",
            ));
        }
        Estimate::CapacityBound { knee } => match knee {
            KneeResult::Found { x, .. } => output.push_str(&format!(
                "  {}\n",
                format!("\u{2713} Largest cache should not exceed {x}").green().bold()
            )),
            KneeResult::NotFound(reason) => output.push_str(&format!(
                "  {}\n    {}\n",
                "\u{26A0} No knee found".yellow().bold(),
                reason.description()
            )),
        },
        Estimate::Capacity { fits } => {
            output.push_str(&format!("  {}\n", "Cache size (piecewise regression):".bold()));
            for fit in fits {
                output.push_str(&format_capacity_fit(fit));
            }
        }
    }

    output.push('\n');
    output.push_str(&sep);
    output.push('\n');

    if let Some(path) = &report.metadata.raw_artifact {
        output.push_str(&format!("Raw data: {}\n", path.display()));
    }
    for path in &report.metadata.plot_artifacts {
        output.push_str(&format!("Plot data: {}\n", path.display()));
    }

    output
}

fn format_change_point(name: &str, result: ChangePoint, unit: &str) -> String {
    match result {
        ChangePoint::Detected(x) => format!(
            "  {}\n",
            format!("\u{2713} {name}: {x} {unit}").green().bold()
        ),
        ChangePoint::Fallback(x) => format!(
            "  {}\n    No transition within the tested range; reporting the largest candidate.\n",
            format!("\u{26A0} {name}: {x} {unit} (at or beyond range)")
                .yellow()
                .bold()
        ),
        ChangePoint::NoSignal => format!(
            "  {}\n",
            format!("\u{2717} {name}: no significant change detected").red().bold()
        ),
    }
}

fn format_capacity_fit(fit: &CapacityFit) -> String {
    let interval = &fit.interval;
    format!(
        "    {:<22} [{:.2}, {:.2}] {}  (rss {:.3e})\n",
        format!("{}:", fit.denoise.label()),
        interval.low,
        interval.high,
        interval.unit,
        fit.rss
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Rescale;
    use crate::denoise::{DenoiseConfig, DenoiseMethod};
    use crate::ingest::IngestStats;
    use crate::result::{CapacityInterval, Metadata, NoKneeReason};
    use crate::types::{ProbeKind, RunId};

    fn make_report(kind: ProbeKind, estimate: Estimate) -> ProbeReport {
        ProbeReport {
            kind,
            estimate,
            metadata: Metadata {
                run_id: RunId::new("run"),
                points: 4,
                ingest: IngestStats {
                    accepted_rows: 10,
                    ..IngestStats::default()
                },
                denoise: DenoiseConfig::none(),
                raw_artifact: None,
                plot_artifacts: Vec::new(),
                runtime_secs: 0.1,
            },
        }
    }

    #[test]
    fn test_format_line_size() {
        let report = make_report(
            ProbeKind::LineSize,
            Estimate::LineSize {
                line_size: ChangePoint::Detected(64.0),
            },
        );
        let output = format_report(&report);
        assert!(output.contains("cache line size"));
        assert!(output.contains("Cache line size: 64 bytes"));
        assert!(output.contains("10 accepted"));
    }

    #[test]
    fn test_format_missing_knee() {
        let report = make_report(
            ProbeKind::CapacityBound,
            Estimate::CapacityBound {
                knee: KneeResult::NotFound(NoKneeReason::FlatCurve),
            },
        );
        assert!(format_report(&report).contains("No knee found"));
    }

    #[test]
    fn test_format_capacity_interval() {
        let fit = CapacityFit {
            denoise: DenoiseMethod::None,
            breakpoints: vec![16384.0],
            rss: 0.5,
            interval: CapacityInterval::from_breakpoint(16384.0, &Rescale::default()),
        };
        let report = make_report(ProbeKind::Capacity, Estimate::Capacity { fits: vec![fit] });
        assert!(format_report(&report).contains("[15.00, 17.00] MB"));
    }
}
