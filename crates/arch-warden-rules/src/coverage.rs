//! Cross-file coverage computation.
//!
//! Each coverage configuration names what counts as a "source" (a regex
//! over files selected by globs) and what counts as "covering" it (a
//! match in target-glob files, by substring or by a `{name}` regex
//! template). Gaps are sources with no covering match.

use arch_warden_core::checks::{CoverageConfig, CoverageOutcome, CoverageValidator};
use arch_warden_core::{rules, CoverageGap, ValidatorError};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// The default [`CoverageValidator`] implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCoverageValidator;

impl DefaultCoverageValidator {
    /// Creates the validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn validate_one(
        &self,
        root: &Path,
        config: &CoverageConfig,
    ) -> Result<CoverageOutcome, ValidatorError> {
        let source_regex =
            Regex::new(&config.source_pattern).map_err(|e| ValidatorError::BadPattern {
                rule: rules::REQUIRE_COVERAGE.to_string(),
                pattern: config.source_pattern.clone(),
                reason: e.to_string(),
            })?;
        let source_globs = compile_globs(&config.source_globs)?;
        let target_globs = compile_globs(&config.target_globs)?;

        // Gather sources: each capture (or whole match) in source files.
        let mut sources: Vec<(String, PathBuf)> = Vec::new();
        for file in files_matching(root, &source_globs) {
            let Ok(content) = std::fs::read_to_string(&file) else {
                warn!(file = %file.display(), "skipping unreadable coverage source file");
                continue;
            };
            for captures in source_regex.captures_iter(&content) {
                let name = captures
                    .get(1)
                    .or_else(|| captures.get(0))
                    .map(|m| m.as_str().to_string());
                if let Some(name) = name {
                    sources.push((name, file.clone()));
                }
            }
        }

        // Gather target content once.
        let target_contents: Vec<String> = files_matching(root, &target_globs)
            .into_iter()
            .filter_map(|file| std::fs::read_to_string(file).ok())
            .collect();

        let mut gaps = Vec::new();
        let mut covered = 0usize;
        for (name, file) in &sources {
            if self.is_covered(name, config, &target_contents)? {
                covered += 1;
            } else {
                gaps.push(CoverageGap {
                    constraint_key: config.key.clone(),
                    source: name.clone(),
                    file: file.clone(),
                    message: format!("`{name}` has no covering match in target files"),
                });
            }
        }

        debug!(
            key = %config.key,
            total = sources.len(),
            covered,
            "coverage constraint evaluated"
        );
        Ok(CoverageOutcome {
            gaps,
            total_sources: sources.len(),
            covered_sources: covered,
        })
    }

    fn is_covered(
        &self,
        name: &str,
        config: &CoverageConfig,
        target_contents: &[String],
    ) -> Result<bool, ValidatorError> {
        match &config.covering_pattern {
            Some(template) => {
                let pattern = template.replace("{name}", &regex::escape(name));
                let regex = Regex::new(&pattern).map_err(|e| ValidatorError::BadPattern {
                    rule: rules::REQUIRE_COVERAGE.to_string(),
                    pattern,
                    reason: e.to_string(),
                })?;
                Ok(target_contents.iter().any(|c| regex.is_match(c)))
            }
            None => Ok(target_contents.iter().any(|c| c.contains(name))),
        }
    }
}

impl CoverageValidator for DefaultCoverageValidator {
    fn validate_all(
        &self,
        root: &Path,
        configs: &[CoverageConfig],
    ) -> Result<HashMap<String, CoverageOutcome>, ValidatorError> {
        let mut outcomes = HashMap::with_capacity(configs.len());
        for config in configs {
            outcomes.insert(config.key.clone(), self.validate_one(root, config)?);
        }
        Ok(outcomes)
    }
}

fn compile_globs(patterns: &[String]) -> Result<Vec<glob::Pattern>, ValidatorError> {
    patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p).map_err(|e| ValidatorError::BadPattern {
                rule: rules::REQUIRE_COVERAGE.to_string(),
                pattern: p.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

fn files_matching(root: &Path, globs: &[glob::Pattern]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| {
            let relative = path.strip_prefix(root).unwrap_or(path);
            let relative_str = relative.to_string_lossy();
            globs.iter().any(|g| g.matches(&relative_str))
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn config(covering: Option<&str>) -> CoverageConfig {
        CoverageConfig {
            key: "coverage-test".into(),
            source_globs: vec!["src/**/*.ts".into()],
            source_pattern: r"export function (\w+)".into(),
            target_globs: vec!["tests/**/*.ts".into()],
            covering_pattern: covering.map(str::to_string),
        }
    }

    #[test]
    fn covered_and_uncovered_sources_are_split() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "src/domain/user.ts",
            "export function createUser() {}\nexport function deleteUser() {}\n",
        );
        write(root, "tests/user.test.ts", "it('works', () => createUser());\n");

        let outcome = DefaultCoverageValidator::new()
            .validate_one(root, &config(None))
            .unwrap();
        assert_eq!(outcome.total_sources, 2);
        assert_eq!(outcome.covered_sources, 1);
        assert_eq!(outcome.gaps.len(), 1);
        assert_eq!(outcome.gaps[0].source, "deleteUser");
    }

    #[test]
    fn covering_template_anchors_the_match() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "src/domain/user.ts", "export function createUser() {}\n");
        // Mentions the name but not in a describe() call.
        write(root, "tests/user.test.ts", "// createUser is untested\n");

        let outcome = DefaultCoverageValidator::new()
            .validate_one(root, &config(Some(r"describe\('{name}'")))
            .unwrap();
        assert_eq!(outcome.covered_sources, 0);
        assert_eq!(outcome.gaps.len(), 1);
    }

    #[test]
    fn empty_sources_mean_no_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "tests/user.test.ts", "");

        let outcome = DefaultCoverageValidator::new()
            .validate_one(root, &config(None))
            .unwrap();
        assert_eq!(outcome.total_sources, 0);
        assert!(outcome.gaps.is_empty());
    }

    #[test]
    fn bad_source_pattern_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut bad = config(None);
        bad.source_pattern = "(unclosed".into();
        let result = DefaultCoverageValidator::new().validate_all(dir.path(), &[bad]);
        assert!(matches!(result, Err(ValidatorError::BadPattern { .. })));
    }

    #[test]
    fn validate_all_keys_outcomes_by_constraint() {
        let dir = tempfile::tempdir().unwrap();
        let outcomes = DefaultCoverageValidator::new()
            .validate_all(dir.path(), &[config(None)])
            .unwrap();
        assert!(outcomes.contains_key("coverage-test"));
    }
}
