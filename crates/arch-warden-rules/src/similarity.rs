//! Near-duplicate detection via token-set similarity.
//!
//! Files are reduced to a set of code tokens (comments stripped,
//! identifiers and literals kept) and pairs are scored with the Jaccard
//! index. Cheap, deterministic, and language-agnostic; the orchestrator
//! handles grouping and pair deduplication.

use arch_warden_core::checks::{FindSimilarOptions, SimilarityAnalyzer, SimilarMatch, Signature};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The default [`SimilarityAnalyzer`] implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSimilarityAnalyzer;

impl DefaultSimilarityAnalyzer {
    /// Creates the analyzer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SimilarityAnalyzer for DefaultSimilarityAnalyzer {
    fn extract_signature(&self, _file: &Path, arch_id: Option<&str>) -> Signature {
        Signature {
            arch_id: arch_id.map(str::to_string),
        }
    }

    fn find_similar(
        &self,
        _file: &Path,
        content: &str,
        candidates: &[(PathBuf, Arc<str>)],
        options: &FindSimilarOptions,
    ) -> Vec<SimilarMatch> {
        let own_tokens = token_set(content);
        let mut matches = Vec::new();
        for (candidate, candidate_content) in candidates {
            let score = jaccard(&own_tokens, &token_set(candidate_content));
            if score >= options.threshold {
                matches.push(SimilarMatch {
                    file: candidate.clone(),
                    similarity: score,
                });
            }
        }
        matches
    }
}

/// Tokenizes content into a set of identifiers, numbers, and operators,
/// dropping `//`, `#`, and `/* */` comments.
fn token_set(content: &str) -> HashSet<String> {
    let mut tokens = HashSet::new();
    let mut in_block_comment = false;

    for line in content.lines() {
        let mut line = line;
        if in_block_comment {
            match line.find("*/") {
                Some(end) => {
                    line = &line[end + 2..];
                    in_block_comment = false;
                }
                None => continue,
            }
        }
        let mut stripped = String::new();
        let mut rest = line;
        loop {
            match rest.find("/*") {
                Some(start) => {
                    stripped.push_str(&rest[..start]);
                    match rest[start..].find("*/") {
                        Some(end) => rest = &rest[start + end + 2..],
                        None => {
                            in_block_comment = true;
                            rest = "";
                        }
                    }
                }
                None => {
                    stripped.push_str(rest);
                    break;
                }
            }
        }
        let code = stripped
            .split("//")
            .next()
            .and_then(|s| s.split('#').next())
            .unwrap_or("");

        let mut current = String::new();
        for ch in code.chars() {
            if ch.is_alphanumeric() || ch == '_' {
                current.push(ch);
            } else {
                if !current.is_empty() {
                    tokens.insert(std::mem::take(&mut current));
                }
                if !ch.is_whitespace() {
                    tokens.insert(ch.to_string());
                }
            }
        }
        if !current.is_empty() {
            tokens.insert(current);
        }
    }

    tokens
}

/// Jaccard index of two token sets.
fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(content: &str, candidates: &[(&str, &str)], threshold: f64) -> Vec<SimilarMatch> {
        let candidates: Vec<(PathBuf, Arc<str>)> = candidates
            .iter()
            .map(|(path, c)| (PathBuf::from(path), Arc::from(*c)))
            .collect();
        DefaultSimilarityAnalyzer::new().find_similar(
            Path::new("/p/a.ts"),
            content,
            &candidates,
            &FindSimilarOptions {
                threshold,
                same_arch_only: true,
            },
        )
    }

    #[test]
    fn identical_files_score_one() {
        let code = "export function createUser(name) { return db.insert(name); }";
        let matches = find(code, &[("/p/b.ts", code)], 0.9);
        assert_eq!(matches.len(), 1);
        assert!((matches[0].similarity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn comments_do_not_affect_the_score() {
        let a = "let x = compute(); // eager\n/* block */ let y = x;";
        let b = "let x = compute();\nlet y = x;";
        let matches = find(a, &[("/p/b.ts", b)], 0.99);
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn unrelated_files_fall_below_threshold() {
        let matches = find(
            "export class UserRepository { find(id) {} }",
            &[("/p/b.ts", "const TIMEOUT_MS = 5000; setInterval(tick, TIMEOUT_MS);")],
            0.5,
        );
        assert!(matches.is_empty());
    }

    #[test]
    fn threshold_is_inclusive() {
        let code = "a b c";
        let matches = find(code, &[("/p/b.ts", code)], 1.0);
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn signature_carries_architecture() {
        let analyzer = DefaultSimilarityAnalyzer::new();
        let signature = analyzer.extract_signature(Path::new("/p/a.ts"), Some("domain"));
        assert_eq!(signature.arch_id.as_deref(), Some("domain"));
        assert!(analyzer
            .extract_signature(Path::new("/p/a.ts"), None)
            .arch_id
            .is_none());
    }

    #[test]
    fn multiline_block_comments_are_stripped() {
        let a = "/* start\nmiddle\nend */ let x = 1;";
        let b = "let x = 1;";
        let matches = find(a, &[("/p/b.ts", b)], 0.99);
        assert_eq!(matches.len(), 1);
    }
}
