//! The import graph interface consumed by the orchestrator.
//!
//! The graph is built by an external collaborator (see
//! [`GraphBuilder`]); the orchestrator treats it as an immutable black box
//! with this stable shape: absolute file paths, forward import edges,
//! reverse edges, and detected cycles.

use crate::registry::Registry;
use crate::report::CycleReport;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// One import statement extracted from a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRef {
    /// The raw specifier as written (`axios`, `./user`, `crate::domain`).
    pub raw: String,
    /// The project file the specifier resolves to, when it is project-local.
    pub resolved: Option<PathBuf>,
    /// Line number of the import (1-indexed).
    pub line: usize,
}

/// One file in the import graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// Absolute path of the file.
    pub file: PathBuf,
    /// Architecture the file was classified into, if any.
    pub arch_id: Option<String>,
    /// Imports declared by the file.
    pub imports: Vec<ImportRef>,
    /// Files that import this file (reverse edges).
    pub imported_by: BTreeSet<PathBuf>,
}

/// A reverse-edge entry: a file that imports another, with its architecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Importer {
    /// The importing file.
    pub file: PathBuf,
    /// Architecture of the importing file, if any.
    pub arch_id: Option<String>,
}

/// A directed graph of file-to-imported-file edges with reverse edges.
///
/// Immutable once built; no component mutates it.
#[derive(Debug, Clone, Default)]
pub struct ImportGraph {
    nodes: IndexMap<PathBuf, GraphNode>,
}

impl ImportGraph {
    /// Builds a graph from nodes, preserving their order.
    #[must_use]
    pub fn from_nodes(nodes: Vec<GraphNode>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.file.clone(), n)).collect(),
        }
    }

    /// Gets a node by absolute path.
    #[must_use]
    pub fn node(&self, path: &Path) -> Option<&GraphNode> {
        self.nodes.get(path)
    }

    /// Iterates nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    /// Returns the file paths in insertion order.
    #[must_use]
    pub fn files(&self) -> Vec<PathBuf> {
        self.nodes.keys().cloned().collect()
    }

    /// Returns the number of files in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the files importing `path`, with their architectures,
    /// from the reverse-edge index.
    #[must_use]
    pub fn importers(&self, path: &Path) -> Vec<Importer> {
        self.node(path)
            .map(|node| {
                node.imported_by
                    .iter()
                    .map(|file| Importer {
                        file: file.clone(),
                        arch_id: self.node(file).and_then(|n| n.arch_id.clone()),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The outcome of building an import graph.
#[derive(Debug, Clone)]
pub struct GraphBuild {
    /// The built graph.
    pub graph: ImportGraph,
    /// Detected import cycles; each cycle's file list preserves
    /// discovery order.
    pub cycles: Vec<CycleReport>,
    /// Wall-clock build time in milliseconds.
    pub build_time_ms: u64,
}

impl GraphBuild {
    /// Returns the cycles that include the given file.
    #[must_use]
    pub fn cycles_through(&self, file: &Path) -> Vec<CycleReport> {
        self.cycles
            .iter()
            .filter(|c| c.files.iter().any(|f| f == file))
            .cloned()
            .collect()
    }
}

/// Errors while building the import graph. Always fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A file or directory could not be read.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// An include or exclude glob is invalid.
    #[error("invalid file pattern `{pattern}`: {reason}")]
    Pattern {
        /// The invalid pattern.
        pattern: String,
        /// Why it's invalid.
        reason: String,
    },

    /// The directory walk failed.
    #[error("walk error: {0}")]
    Walk(String),
}

/// Builds import graphs for the orchestrator.
pub trait GraphBuilder: Send + Sync {
    /// Builds the graph for a project root, classifying files against the
    /// registry and honoring include/exclude globs.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails; graph build failures abort the
    /// whole validation run.
    fn build(
        &self,
        root: &Path,
        registry: &Registry,
        include: &[String],
        exclude: &[String],
    ) -> Result<GraphBuild, GraphError>;

    /// Extracts raw imports from one file's content, for files validated
    /// outside a prebuilt graph.
    fn scan_imports(&self, path: &Path, content: &str) -> Vec<ImportRef>;
}
