//! Per-file and batch validation reports.

use crate::types::{Severity, Violation};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of validating one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileStatus {
    /// No violations at any severity.
    Pass,
    /// Warnings only.
    Warn,
    /// At least one error-severity violation.
    Fail,
    /// The file matched no architecture and was skipped, not failed.
    MissingArchitecture,
    /// Per-file analysis failed (unreadable file, resolution failure);
    /// degraded, never counted against the architecture's rules.
    Errored,
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Warn => write!(f, "warn"),
            Self::Fail => write!(f, "fail"),
            Self::MissingArchitecture => write!(f, "missing-architecture"),
            Self::Errored => write!(f, "errored"),
        }
    }
}

/// Validation result for one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    /// Absolute path of the validated file.
    pub file: PathBuf,
    /// Resolved architecture id, when one matched.
    pub arch_id: Option<String>,
    /// Aggregate status, ordered fail > warn > pass.
    pub status: FileStatus,
    /// Error-severity violations, in rule application order.
    pub violations: Vec<Violation>,
    /// Warning-severity violations, in rule application order.
    pub warnings: Vec<Violation>,
    /// Suppressions applied while validating (e.g. `allow_import` overrides).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides_active: Vec<String>,
    /// Number of error-severity violations.
    pub error_count: usize,
    /// Number of warning-severity violations.
    pub warning_count: usize,
    /// Detail for degraded statuses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl FileReport {
    /// Creates an empty passing report for a file.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, arch_id: Option<String>) -> Self {
        Self {
            file: file.into(),
            arch_id,
            status: FileStatus::Pass,
            violations: Vec::new(),
            warnings: Vec::new(),
            overrides_active: Vec::new(),
            error_count: 0,
            warning_count: 0,
            note: None,
        }
    }

    /// Creates a skipped report for a file with no recognized architecture.
    #[must_use]
    pub fn missing_architecture(file: impl Into<PathBuf>) -> Self {
        let mut report = Self::new(file, None);
        report.status = FileStatus::MissingArchitecture;
        report
    }

    /// Creates a degraded report for a file whose analysis failed.
    #[must_use]
    pub fn errored(
        file: impl Into<PathBuf>,
        arch_id: Option<String>,
        note: impl Into<String>,
    ) -> Self {
        let mut report = Self::new(file, arch_id);
        report.status = FileStatus::Errored;
        report.note = Some(note.into());
        report
    }

    /// Routes a violation into the error or warning list and updates counts.
    pub fn push(&mut self, violation: Violation) {
        match violation.severity {
            Severity::Error => {
                self.error_count += 1;
                self.violations.push(violation);
            }
            Severity::Warning => {
                self.warning_count += 1;
                self.warnings.push(violation);
            }
        }
        self.recompute_status();
    }

    /// Recomputes the status from the current counts (fail > warn > pass).
    ///
    /// Degraded statuses are sticky: an errored or skipped file never
    /// transitions back to a rule-based status.
    pub fn recompute_status(&mut self) {
        if matches!(
            self.status,
            FileStatus::MissingArchitecture | FileStatus::Errored
        ) {
            return;
        }
        self.status = if self.error_count > 0 {
            FileStatus::Fail
        } else if self.warning_count > 0 {
            FileStatus::Warn
        } else {
            FileStatus::Pass
        };
    }
}

/// One detected import cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    /// Files forming the closed import chain, in discovery order.
    pub files: Vec<PathBuf>,
    /// Architecture id of each file, aligned with `files`.
    pub architectures: Vec<Option<String>>,
}

/// A per-edge boundary violation (package or layer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeViolation {
    /// Importing file.
    pub from: PathBuf,
    /// Imported file.
    pub to: PathBuf,
    /// What boundary was crossed and why it is disallowed.
    pub message: String,
}

/// One uncovered source reported by the coverage check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageGap {
    /// Key of the coverage constraint this gap belongs to.
    pub constraint_key: String,
    /// The source item that lacks coverage.
    pub source: String,
    /// File the source was found in.
    pub file: PathBuf,
    /// Human-readable description.
    pub message: String,
}

/// Aggregated coverage outcome across all coverage constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageSummary {
    /// Every uncovered source.
    pub gaps: Vec<CoverageGap>,
    /// Total sources that required coverage.
    pub total_sources: usize,
    /// Sources that were covered.
    pub covered_sources: usize,
    /// Covered percentage over all constraints.
    pub percent: f64,
}

/// A near-duplicate pair reported by the similarity check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityViolation {
    /// First file of the pair.
    pub file_a: PathBuf,
    /// Second file of the pair.
    pub file_b: PathBuf,
    /// Measured similarity score.
    pub similarity: f64,
    /// Declared ceiling that was met or exceeded.
    pub threshold: f64,
    /// Severity declared by the similarity constraint.
    pub severity: Severity,
    /// Architecture both files belong to.
    pub arch_id: String,
}

/// Cache effectiveness counters for one run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Content cache hits.
    pub content_hits: usize,
    /// Content cache misses (files actually read).
    pub content_misses: usize,
    /// Resolution cache hits.
    pub resolution_hits: usize,
    /// Resolution cache misses (architectures actually resolved).
    pub resolution_misses: usize,
}

/// Project-level statistics for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectStats {
    /// Milliseconds spent building the import graph.
    pub graph_build_ms: u64,
    /// Number of files in the import graph.
    pub node_count: usize,
    /// Number of detected import cycles.
    pub cycle_count: usize,
    /// Cache hit/miss counters.
    pub cache: CacheStats,
}

/// Aggregate counters over all per-file results and project-level checks.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Files considered.
    pub total: usize,
    /// Files that passed.
    pub passed: usize,
    /// Files that failed, plus package and layer violations.
    pub failed: usize,
    /// Files with warnings only.
    pub warned: usize,
    /// Files skipped for missing architecture.
    pub skipped: usize,
    /// Files degraded by per-file analysis errors.
    pub errored: usize,
    /// Per-file errors + package violations + layer violations
    /// + coverage gaps + error-severity similarity violations.
    pub total_errors: usize,
    /// Per-file warnings + warning-severity similarity violations.
    pub total_warnings: usize,
}

/// Aggregated result of validating a whole project or file set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Per-file results, preserving input file order.
    pub files: Vec<FileReport>,
    /// Aggregate counters.
    pub summary: BatchSummary,
    /// Project statistics.
    pub stats: ProjectStats,
    /// Detected import cycles, each file list in discovery order.
    pub cycles: Vec<CycleReport>,
    /// Package boundary violations, present only when non-empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_violations: Option<Vec<EdgeViolation>>,
    /// Layer boundary violations, present only when non-empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_violations: Option<Vec<EdgeViolation>>,
    /// Coverage outcome, present only when gaps were found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageSummary>,
    /// Similarity violations, present only when non-empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<Vec<SimilarityViolation>>,
}

impl BatchReport {
    /// Returns true if any error-severity finding was recorded.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.summary.total_errors > 0
    }

    /// Returns true if findings at or above the given severity exist.
    #[must_use]
    pub fn has_findings_at(&self, severity: Severity) -> bool {
        match severity {
            Severity::Error => self.summary.total_errors > 0,
            Severity::Warning => self.summary.total_errors > 0 || self.summary.total_warnings > 0,
        }
    }

    /// Formats a human-readable multi-line report suitable for `panic!()`
    /// messages in `cargo test` integration.
    #[must_use]
    pub fn format_report(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        for file in &self.files {
            for v in file.violations.iter().chain(file.warnings.iter()) {
                let _ = writeln!(out, "{v}");
            }
            for suppressed in &file.overrides_active {
                let _ = writeln!(out, "{}: suppressed: {suppressed}", file.file.display());
            }
        }
        for section in [&self.package_violations, &self.layer_violations] {
            if let Some(edges) = section {
                for e in edges {
                    let _ = writeln!(
                        out,
                        "{} -> {}: {}",
                        e.from.display(),
                        e.to.display(),
                        e.message
                    );
                }
            }
        }
        if let Some(coverage) = &self.coverage {
            for gap in &coverage.gaps {
                let _ = writeln!(out, "{}: {}", gap.file.display(), gap.message);
            }
        }
        if let Some(pairs) = &self.similarity {
            for p in pairs {
                let _ = writeln!(
                    out,
                    "{} ~ {}: similarity {:.2} >= {:.2} ({})",
                    p.file_a.display(),
                    p.file_b.display(),
                    p.similarity,
                    p.threshold,
                    p.severity
                );
            }
        }

        let s = &self.summary;
        let _ = writeln!(
            out,
            "\n{} file(s): {} passed, {} failed, {} warned, {} skipped, {} errored; \
             {} error(s), {} warning(s), {} cycle(s)",
            s.total,
            s.passed,
            s.failed,
            s.warned,
            s.skipped,
            s.errored,
            s.total_errors,
            s.total_warnings,
            self.stats.cycle_count,
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(severity: Severity) -> Violation {
        Violation::new("forbid_import", severity, "src/a.ts", "import forbidden")
    }

    #[test]
    fn push_routes_by_severity() {
        let mut report = FileReport::new("src/a.ts", Some("domain".into()));
        report.push(violation(Severity::Warning));
        assert_eq!(report.status, FileStatus::Warn);
        assert_eq!(report.warning_count, 1);
        report.push(violation(Severity::Error));
        assert_eq!(report.status, FileStatus::Fail);
        assert_eq!(report.error_count, 1);
    }

    #[test]
    fn fail_outranks_warn() {
        let mut report = FileReport::new("src/a.ts", Some("domain".into()));
        report.push(violation(Severity::Error));
        report.push(violation(Severity::Warning));
        assert_eq!(report.status, FileStatus::Fail);
    }

    #[test]
    fn degraded_status_is_sticky() {
        let mut report = FileReport::errored("src/a.ts", None, "unreadable");
        report.recompute_status();
        assert_eq!(report.status, FileStatus::Errored);
    }

    #[test]
    fn missing_architecture_is_not_a_failure() {
        let report = FileReport::missing_architecture("src/unknown.ts");
        assert_eq!(report.status, FileStatus::MissingArchitecture);
        assert_eq!(report.error_count, 0);
    }

    #[test]
    fn report_formats_summary_line() {
        let report = BatchReport {
            files: vec![],
            summary: BatchSummary {
                total: 3,
                passed: 2,
                failed: 1,
                total_errors: 2,
                ..BatchSummary::default()
            },
            stats: ProjectStats::default(),
            cycles: vec![],
            package_violations: None,
            layer_violations: None,
            coverage: None,
            similarity: None,
        };
        let text = report.format_report();
        assert!(text.contains("3 file(s)"));
        assert!(text.contains("2 error(s)"));
    }

    #[test]
    fn has_findings_at_warning_sees_warnings() {
        let report = BatchReport {
            files: vec![],
            summary: BatchSummary {
                total_warnings: 1,
                ..BatchSummary::default()
            },
            stats: ProjectStats::default(),
            cycles: vec![],
            package_violations: None,
            layer_violations: None,
            coverage: None,
            similarity: None,
        };
        assert!(!report.has_failures());
        assert!(report.has_findings_at(Severity::Warning));
    }
}
