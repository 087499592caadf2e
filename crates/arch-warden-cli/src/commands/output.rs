//! Shared output formatting for batch reports.

use anyhow::Result;
use arch_warden_core::{BatchReport, FileStatus, Severity, Violation};

use crate::OutputFormat;

/// Print a batch report in the specified format.
pub fn print(report: &BatchReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print_text(report),
        OutputFormat::Json => return print_json(report),
        OutputFormat::Compact => print_compact(report),
    }
    Ok(())
}

fn severity_indicator(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "\x1b[31merror\x1b[0m",
        Severity::Warning => "\x1b[33mwarning\x1b[0m",
    }
}

fn print_violation(violation: &Violation) {
    print!("{}", violation.file.display());
    if let Some(line) = violation.line {
        print!(":{line}");
    }
    println!(" [{}]", violation.rule);
    println!(
        "  {}: {}",
        severity_indicator(violation.severity),
        violation.message
    );
    if let Some(why) = &violation.why {
        println!("  = why: {why}");
    }
    if !violation.alternatives.is_empty() {
        println!("  = consider: {}", violation.alternatives.join(", "));
    }
    println!();
}

fn print_text(report: &BatchReport) {
    for file in &report.files {
        for violation in file.violations.iter().chain(file.warnings.iter()) {
            print_violation(violation);
        }
        if file.status == FileStatus::Errored {
            println!(
                "{}: \x1b[33mskipped\x1b[0m ({})",
                file.file.display(),
                file.note.as_deref().unwrap_or("analysis error"),
            );
        }
    }

    for (label, section) in [
        ("package", &report.package_violations),
        ("layer", &report.layer_violations),
    ] {
        if let Some(edges) = section {
            for edge in edges {
                println!(
                    "{} -> {} [{label}]\n  \x1b[31merror\x1b[0m: {}\n",
                    edge.from.display(),
                    edge.to.display(),
                    edge.message,
                );
            }
        }
    }

    if let Some(coverage) = &report.coverage {
        for gap in &coverage.gaps {
            println!(
                "{} [coverage]\n  \x1b[31merror\x1b[0m: {}\n",
                gap.file.display(),
                gap.message,
            );
        }
        println!(
            "coverage: {}/{} sources covered ({:.1}%)\n",
            coverage.covered_sources, coverage.total_sources, coverage.percent,
        );
    }

    if let Some(pairs) = &report.similarity {
        for pair in pairs {
            println!(
                "{} ~ {} [similarity]\n  {}: {:.2} >= {:.2}\n",
                pair.file_a.display(),
                pair.file_b.display(),
                severity_indicator(pair.severity),
                pair.similarity,
                pair.threshold,
            );
        }
    }

    let summary = &report.summary;
    let summary_color = if summary.total_errors > 0 {
        "\x1b[31m"
    } else if summary.total_warnings > 0 {
        "\x1b[33m"
    } else {
        "\x1b[32m"
    };
    println!(
        "{}{} file(s): {} passed, {} failed, {} warned, {} skipped; \
         {} error(s), {} warning(s), {} cycle(s)\x1b[0m",
        summary_color,
        summary.total,
        summary.passed,
        summary.failed,
        summary.warned,
        summary.skipped,
        summary.total_errors,
        summary.total_warnings,
        report.stats.cycle_count,
    );
}

fn print_json(report: &BatchReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{json}");
    Ok(())
}

fn print_compact(report: &BatchReport) {
    for file in &report.files {
        for violation in file.violations.iter().chain(file.warnings.iter()) {
            println!("{violation}");
        }
    }
}
