//! Collaborator interfaces for the four project-level checks.
//!
//! Package/layer boundary validation, coverage, and similarity are external
//! collaborators: the orchestrator drives them through these traits and
//! merges their outcomes into the batch report.

use crate::dispatch::ValidatorError;
use crate::graph::ImportGraph;
use crate::registry::Registry;
use crate::report::{CoverageGap, EdgeViolation};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A per-edge boundary check over the import graph (package or layer).
pub trait BoundaryValidator: Send + Sync {
    /// Name of the boundary being checked, for logs and reports.
    fn name(&self) -> &'static str;

    /// Validates every edge of the graph, returning per-edge violations.
    fn validate(&self, root: &Path, graph: &ImportGraph, registry: &Registry)
        -> Vec<EdgeViolation>;
}

/// One coverage constraint turned into a concrete search configuration.
#[derive(Debug, Clone)]
pub struct CoverageConfig {
    /// Identity key of the originating constraint.
    pub key: String,
    /// Globs selecting the files to search for sources.
    pub source_globs: Vec<String>,
    /// Regex whose first capture (or whole match) names a source.
    pub source_pattern: String,
    /// Globs selecting the files that may cover sources.
    pub target_globs: Vec<String>,
    /// Optional covering regex template; `{name}` expands to the source.
    pub covering_pattern: Option<String>,
}

/// Coverage outcome for one constraint.
#[derive(Debug, Clone, Default)]
pub struct CoverageOutcome {
    /// Sources lacking coverage.
    pub gaps: Vec<CoverageGap>,
    /// Sources that required coverage.
    pub total_sources: usize,
    /// Sources that were covered.
    pub covered_sources: usize,
}

/// Performs the cross-file coverage computation.
pub trait CoverageValidator: Send + Sync {
    /// Evaluates every configuration, returning one outcome per
    /// constraint key.
    ///
    /// # Errors
    ///
    /// Returns a validator error on malformed configuration (bad regex);
    /// such errors abort the run.
    fn validate_all(
        &self,
        root: &Path,
        configs: &[CoverageConfig],
    ) -> Result<HashMap<String, CoverageOutcome>, ValidatorError>;
}

/// A lightweight per-file signature used to group similarity candidates.
#[derive(Debug, Clone)]
pub struct Signature {
    /// Architecture the file belongs to, if resolvable.
    pub arch_id: Option<String>,
}

/// A candidate scored against the file under comparison.
#[derive(Debug, Clone)]
pub struct SimilarMatch {
    /// The similar file.
    pub file: PathBuf,
    /// Similarity score in `0.0..=1.0`.
    pub similarity: f64,
}

/// Options for one similarity search.
#[derive(Debug, Clone, Copy)]
pub struct FindSimilarOptions {
    /// Minimum score reported as a match.
    pub threshold: f64,
    /// Restrict candidates to the same architecture.
    pub same_arch_only: bool,
}

/// Scores near-duplicate files.
pub trait SimilarityAnalyzer: Send + Sync {
    /// Extracts the grouping signature of a file.
    fn extract_signature(&self, file: &Path, arch_id: Option<&str>) -> Signature;

    /// Scores `file` against each candidate, returning those meeting the
    /// threshold. Candidates carry their content so nothing is re-read.
    fn find_similar(
        &self,
        file: &Path,
        content: &str,
        candidates: &[(PathBuf, Arc<str>)],
        options: &FindSimilarOptions,
    ) -> Vec<SimilarMatch>;
}
