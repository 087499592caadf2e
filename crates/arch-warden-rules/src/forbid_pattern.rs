//! Rule forbidding content that matches a regular expression.
//!
//! The expression comes from the constraint's `pattern` field when set,
//! otherwise from a string `value`. `allow_pattern` directives never reach
//! this validator; the resolver consumes them.

use arch_warden_core::{rules, Constraint, RuleContext, RuleValidator, ValidatorError, Violation};
use regex::Regex;

/// Rule name for forbid-pattern.
pub const NAME: &str = rules::FORBID_PATTERN;

/// Forbids file content matching a pattern.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForbidPattern;

impl ForbidPattern {
    /// Creates the validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RuleValidator for ForbidPattern {
    fn rule(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Forbids content matching a regular expression"
    }

    fn validate(
        &self,
        constraint: &Constraint,
        ctx: &RuleContext<'_>,
    ) -> Result<Vec<Violation>, ValidatorError> {
        let source = match (&constraint.pattern, &constraint.value) {
            (Some(pattern), _) => pattern.as_str(),
            (None, arch_warden_core::ConstraintValue::Str(value)) => value.as_str(),
            _ => {
                return Err(ValidatorError::MalformedValue {
                    rule: constraint.rule.clone(),
                    expected: "a `pattern` field or a string value",
                    found: constraint.value.to_string(),
                })
            }
        };
        let regex = Regex::new(source).map_err(|e| ValidatorError::BadPattern {
            rule: constraint.rule.clone(),
            pattern: source.to_string(),
            reason: e.to_string(),
        })?;

        let mut violations = Vec::new();
        for (index, line) in ctx.file.content.lines().enumerate() {
            if let Some(matched) = regex.find(line) {
                let message = format!("content matches forbidden pattern `{source}`");
                violations.push(
                    Violation::from_constraint(constraint, ctx.file.path.clone(), message)
                        .at_line(index + 1)
                        .with_target(matched.as_str().to_string()),
                );
            }
        }
        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forbid_import::test_support::ctx_with_content;
    use arch_warden_core::{ConstraintValue, Severity};

    fn check(pattern: Option<&str>, value: ConstraintValue, content: &str) -> Vec<Violation> {
        let mut constraint = Constraint::new(NAME, value, Severity::Error);
        constraint.pattern = pattern.map(str::to_string);
        let file = ctx_with_content(content);
        let ctx = RuleContext {
            file: &file,
            project: None,
        };
        ForbidPattern::new().validate(&constraint, &ctx).unwrap()
    }

    #[test]
    fn flags_each_matching_line() {
        let violations = check(
            Some(r"console\.log"),
            ConstraintValue::Str("console logging".into()),
            "console.log('a');\nlet x = 1;\nconsole.log('b');\n",
        );
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].line, Some(1));
        assert_eq!(violations[1].line, Some(3));
        assert_eq!(violations[0].target.as_deref(), Some("console.log"));
    }

    #[test]
    fn falls_back_to_value_as_pattern() {
        let violations = check(None, ConstraintValue::Str("eval".into()), "eval(code);\n");
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn clean_content_passes() {
        let violations = check(Some("eval"), ConstraintValue::Str("eval".into()), "let x = 1;\n");
        assert!(violations.is_empty());
    }

    #[test]
    fn invalid_runtime_pattern_errors() {
        let mut constraint = Constraint::new(
            NAME,
            ConstraintValue::Str("(unclosed".into()),
            Severity::Error,
        );
        constraint.pattern = None;
        let file = ctx_with_content("x");
        let ctx = RuleContext {
            file: &file,
            project: None,
        };
        let result = ForbidPattern::new().validate(&constraint, &ctx);
        assert!(matches!(result, Err(ValidatorError::BadPattern { .. })));
    }
}
