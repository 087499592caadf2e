//! Utility helpers shared by rule implementations.

/// Splits an import specifier into segments.
///
/// Accepts `::` (Rust), `/` (TS/JS), and `.` (Python/JVM) separators, so
/// one pattern syntax covers every scanned language.
#[must_use]
pub fn split_specifier(specifier: &str) -> Vec<&str> {
    specifier
        .split("::")
        .flat_map(|part| part.split('/'))
        .flat_map(|part| part.split('.'))
        .filter(|part| !part.is_empty())
        .collect()
}

/// Checks if an import specifier matches a pattern.
///
/// Supports wildcards:
/// - `*` matches any single segment
/// - `**` matches any number of segments (including zero)
///
/// # Examples
///
/// ```
/// use arch_warden_core::utils::specifier_matches;
///
/// assert!(specifier_matches("std::fs::read", "std::fs::*"));
/// assert!(specifier_matches("axios/lib/core", "axios/**"));
/// assert!(!specifier_matches("tokio::fs::read", "std::**"));
/// ```
#[must_use]
pub fn specifier_matches(specifier: &str, pattern: &str) -> bool {
    let spec_parts = split_specifier(specifier);
    let pattern_parts = split_specifier(pattern);
    match_parts(&spec_parts, &pattern_parts)
}

fn match_parts(spec: &[&str], pattern: &[&str]) -> bool {
    if pattern.is_empty() {
        return spec.is_empty();
    }

    let (first, rest) = (pattern[0], &pattern[1..]);

    match first {
        "**" => (0..=spec.len()).any(|i| match_parts(&spec[i..], rest)),
        "*" => !spec.is_empty() && match_parts(&spec[1..], rest),
        literal => !spec.is_empty() && spec[0] == literal && match_parts(&spec[1..], rest),
    }
}

/// Returns true if the specifier is rooted at the given module.
///
/// A bare pattern without wildcards matches the whole module subtree, so
/// `forbid_import = ["axios"]` also catches `axios/lib/core`.
#[must_use]
pub fn specifier_rooted_at(specifier: &str, module: &str) -> bool {
    let spec_parts = split_specifier(specifier);
    let module_parts = split_specifier(module);
    spec_parts.len() >= module_parts.len()
        && spec_parts[..module_parts.len()] == module_parts[..]
}

/// Matches a specifier against a pattern, treating wildcard-free patterns
/// as subtree roots.
#[must_use]
pub fn import_matches(specifier: &str, pattern: &str) -> bool {
    if pattern.contains('*') {
        specifier_matches(specifier, pattern)
    } else {
        specifier_rooted_at(specifier, pattern)
    }
}
