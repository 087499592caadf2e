//! Context types handed to rule validators.

use crate::graph::{ImportRef, Importer};
use crate::report::CycleReport;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The file-local view a validator judges a constraint against.
#[derive(Debug, Clone)]
pub struct FileContext {
    /// Absolute path to the file.
    pub path: PathBuf,
    /// Path relative to the project root.
    pub relative_path: PathBuf,
    /// Architecture the file resolved to, if any.
    pub arch_id: Option<String>,
    /// File contents, shared with the run's content cache.
    pub content: Arc<str>,
    /// Imports extracted from the file.
    pub imports: Vec<ImportRef>,
    /// Whether this file is detected as a test file.
    pub is_test: bool,
}

impl FileContext {
    /// Creates a new file context, deriving the relative path and
    /// test-file detection from the path.
    #[must_use]
    pub fn new(
        path: PathBuf,
        root: &Path,
        arch_id: Option<String>,
        content: Arc<str>,
        imports: Vec<ImportRef>,
    ) -> Self {
        let relative_path = path
            .strip_prefix(root)
            .map_or_else(|_| path.clone(), Path::to_path_buf);
        let is_test = detect_test_file(&relative_path);
        Self {
            path,
            relative_path,
            arch_id,
            content,
            imports,
            is_test,
        }
    }
}

/// Detects if a file is a test file based on path conventions.
fn detect_test_file(path: &Path) -> bool {
    for component in path.components() {
        if let std::path::Component::Normal(s) = component {
            let s = s.to_string_lossy();
            if s == "tests" || s == "test" || s == "__tests__" {
                return true;
            }
        }
    }

    if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
        let stem = file_name.rsplit_once('.').map_or(file_name, |(s, _)| s);
        if stem.ends_with("_test")
            || stem.ends_with("_tests")
            || stem.ends_with(".test")
            || stem.ends_with(".spec")
            || stem.starts_with("test_")
        {
            return true;
        }
    }

    false
}

/// The whole-project view for graph-dependent rules: who imports this
/// file, and which detected cycles pass through it.
#[derive(Debug, Clone, Default)]
pub struct ProjectView {
    /// Files importing the file under validation.
    pub importers: Vec<Importer>,
    /// Cycles that include the file under validation.
    pub cycles: Vec<CycleReport>,
}
