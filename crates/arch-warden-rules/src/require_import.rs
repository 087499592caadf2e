//! Rule requiring declared imports to be present.
//!
//! # Value
//!
//! A specifier or list of specifiers, combined per the constraint's
//! `match` mode: `all` (default) requires every entry, `any` requires at
//! least one.

use arch_warden_core::utils::import_matches;
use arch_warden_core::{
    rules, Constraint, MatchMode, RuleContext, RuleValidator, ValidatorError, Violation,
};

/// Rule name for require-import.
pub const NAME: &str = rules::REQUIRE_IMPORT;

/// Requires declared imports to be present in the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireImport;

impl RequireImport {
    /// Creates the validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RuleValidator for RequireImport {
    fn rule(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Requires declared imports to be present"
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

        let present = |pattern: &String| {
            ctx.file
                .imports
                .iter()
                .any(|import| import_matches(&import.raw, pattern))
        };

        let violation = |message: String| {
            vec![Violation::from_constraint(
                constraint,
                ctx.file.path.clone(),
                message,
            )]
        };

        match constraint.match_mode {
            MatchMode::All => {
                let missing: Vec<&String> = patterns.iter().filter(|p| !present(p)).collect();
                if missing.is_empty() {
                    Ok(Vec::new())
                } else {
                    let list = missing
                        .iter()
                        .map(|s| format!("`{s}`"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    Ok(violation(format!("required import(s) missing: {list}")))
                }
            }
            MatchMode::Any => {
                if patterns.iter().any(|p| present(p)) {
                    Ok(Vec::new())
                } else {
                    let list = patterns
                        .iter()
                        .map(|s| format!("`{s}`"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    Ok(violation(format!("at least one of {list} must be imported")))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forbid_import::test_support::ctx_with_imports;
    use arch_warden_core::{ConstraintValue, Severity};

    fn check(patterns: &[&str], mode: MatchMode, imports: &[&str]) -> Vec<Violation> {
        let mut constraint = Constraint::new(
            NAME,
            ConstraintValue::List(patterns.iter().map(|s| (*s).to_string()).collect()),
            Severity::Warning,
        );
        constraint.match_mode = mode;
        let file = ctx_with_imports(imports);
        let ctx = RuleContext {
            file: &file,
            project: None,
        };
        RequireImport::new().validate(&constraint, &ctx).unwrap()
    }

    #[test]
    fn all_mode_requires_every_entry() {
        assert!(check(&["tracing", "serde"], MatchMode::All, &["tracing", "serde"]).is_empty());
        let violations = check(&["tracing", "serde"], MatchMode::All, &["tracing"]);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("serde"));
        assert!(!violations[0].message.contains("`tracing`"));
    }

    #[test]
    fn any_mode_requires_one_entry() {
        assert!(check(&["tracing", "log"], MatchMode::Any, &["log"]).is_empty());
        let violations = check(&["tracing", "log"], MatchMode::Any, &["println"]);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("at least one"));
    }

    #[test]
    fn wildcards_satisfy_requirements() {
        assert!(check(&["tracing::**"], MatchMode::All, &["tracing::info"]).is_empty());
    }
}
