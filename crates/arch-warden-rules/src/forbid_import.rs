//! Rule forbidding imports of declared specifiers.
//!
//! # Value
//!
//! A specifier or list of specifiers. Segment wildcards are supported:
//! `*` matches one segment, `**` any number. A wildcard-free specifier
//! matches its whole subtree, so `axios` also catches `axios/lib/core`.
//!
//! # Suppression
//!
//! `allow_import` constraints in the same resolved set suppress matches;
//! applied suppressions are reported as active overrides, not violations.

use arch_warden_core::utils::import_matches;
use arch_warden_core::{rules, Constraint, RuleContext, RuleValidator, ValidatorError, Violation};

/// Rule name for forbid-import.
pub const NAME: &str = rules::FORBID_IMPORT;

/// Forbids imports matching declared specifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForbidImport;

impl ForbidImport {
    /// Creates the validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RuleValidator for ForbidImport {
    fn rule(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Forbids imports of declared specifiers"
    }

    fn validate(
        &self,
        constraint: &Constraint,
        ctx: &RuleContext<'_>,
    ) -> Result<Vec<Violation>, ValidatorError> {
        let patterns =
            constraint
                .value
                .as_str_list()
                .ok_or_else(|| ValidatorError::MalformedValue {
                    rule: constraint.rule.clone(),
                    expected: "a specifier or list of specifiers",
                    found: constraint.value.to_string(),
                })?;

        let mut violations = Vec::new();
        for import in &ctx.file.imports {
            if let Some(pattern) = patterns.iter().find(|p| import_matches(&import.raw, p)) {
                let message = format!("import of `{}` is forbidden (matches `{pattern}`)", import.raw);
                violations.push(
                    Violation::from_constraint(constraint, ctx.file.path.clone(), message)
                        .at_line(import.line)
                        .with_target(import.raw.clone()),
                );
            }
        }
        Ok(violations)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use arch_warden_core::{FileContext, ImportRef};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    /// Builds a file context with the given imports, one per line.
    pub fn ctx_with_imports(imports: &[&str]) -> FileContext {
        FileContext::new(
            PathBuf::from("/p/src/domain/user.ts"),
            Path::new("/p"),
            Some("domain".into()),
            Arc::from(""),
            imports
                .iter()
                .enumerate()
                .map(|(i, raw)| ImportRef {
                    raw: (*raw).to_string(),
                    resolved: None,
                    line: i + 1,
                })
                .collect(),
        )
    }

    /// Builds a file context with the given content and no imports.
    pub fn ctx_with_content(content: &str) -> FileContext {
        FileContext::new(
            PathBuf::from("/p/src/domain/user.ts"),
            Path::new("/p"),
            Some("domain".into()),
            Arc::from(content),
            Vec::new(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::ctx_with_imports;
    use super::*;
    use arch_warden_core::{ConstraintValue, RuleContext, Severity};

    fn check(value: ConstraintValue, imports: &[&str]) -> Vec<Violation> {
        let constraint = Constraint::new(NAME, value, Severity::Error);
        let file = ctx_with_imports(imports);
        let ctx = RuleContext {
            file: &file,
            project: None,
        };
        ForbidImport::new().validate(&constraint, &ctx).unwrap()
    }

    #[test]
    fn flags_matching_import() {
        let violations = check(
            ConstraintValue::List(vec!["axios".into()]),
            &["axios", "left-pad"],
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].target.as_deref(), Some("axios"));
        assert_eq!(violations[0].line, Some(1));
    }

    #[test]
    fn bare_specifier_catches_subtree() {
        let violations = check(ConstraintValue::Str("axios".into()), &["axios/lib/core"]);
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn wildcard_specifier_matches_segments() {
        let violations = check(
            ConstraintValue::Str("std::fs::*".into()),
            &["std::fs::read", "std::io::read"],
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].target.as_deref(), Some("std::fs::read"));
    }

    #[test]
    fn clean_file_passes() {
        let violations = check(ConstraintValue::Str("axios".into()), &["node-fetch"]);
        assert!(violations.is_empty());
    }

    #[test]
    fn numeric_value_is_malformed() {
        let constraint = Constraint::new(NAME, ConstraintValue::Num(1.0), Severity::Error);
        let file = ctx_with_imports(&[]);
        let ctx = RuleContext {
            file: &file,
            project: None,
        };
        let result = ForbidImport::new().validate(&constraint, &ctx);
        assert!(matches!(result, Err(ValidatorError::MalformedValue { .. })));
    }
}
