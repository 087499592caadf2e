//! Rule validator dispatch: the lookup from rule name to the validator
//! capable of judging a constraint against a context.

use crate::context::{FileContext, ProjectView};
use crate::types::{Constraint, Violation};
use std::collections::HashMap;
use tracing::debug;

/// Well-known rule names.
pub mod rules {
    /// Forbids importing the listed specifiers.
    pub const FORBID_IMPORT: &str = "forbid_import";
    /// Requires importing the listed specifiers (`match` = all/any).
    pub const REQUIRE_IMPORT: &str = "require_import";
    /// Suppresses `forbid_import` matches for the listed specifiers.
    pub const ALLOW_IMPORT: &str = "allow_import";
    /// Forbids content matching a pattern.
    pub const FORBID_PATTERN: &str = "forbid_pattern";
    /// Directive removing a matching `forbid_pattern` during resolution.
    pub const ALLOW_PATTERN: &str = "allow_pattern";
    /// Caps the number of lines in a file.
    pub const MAX_LINES: &str = "max_lines";
    /// Caps the number of imports in a file.
    pub const MAX_IMPORTS: &str = "max_imports";
    /// Forbids the file from participating in an import cycle.
    pub const FORBID_CIRCULAR_IMPORTS: &str = "forbid_circular_imports";
    /// Restricts which architectures may import the file.
    pub const IMPORTABLE_BY: &str = "importable_by";
    /// Requires cross-file coverage of matched sources.
    pub const REQUIRE_COVERAGE: &str = "require_coverage";
    /// Caps pairwise similarity between same-architecture files.
    pub const MAX_SIMILARITY: &str = "max_similarity";

    /// Rules that need whole-project context and are excluded from
    /// single-file validation.
    pub const GRAPH_RULES: &[&str] = &[FORBID_CIRCULAR_IMPORTS, IMPORTABLE_BY];

    /// Returns true for rules that require the import graph.
    #[must_use]
    pub fn is_graph_rule(rule: &str) -> bool {
        GRAPH_RULES.contains(&rule)
    }
}

/// Errors raised by rule validators.
///
/// A malformed constraint value is a configuration error and aborts the
/// run it occurs in; it is never folded into a per-file result.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidatorError {
    /// The constraint value has the wrong shape for the rule.
    #[error("rule `{rule}` expects {expected}, got `{found}`")]
    MalformedValue {
        /// The rule that rejected the value.
        rule: String,
        /// What the rule expects.
        expected: &'static str,
        /// Display form of the offending value.
        found: String,
    },

    /// A pattern failed to compile at validation time.
    #[error("rule `{rule}`: invalid pattern `{pattern}`: {reason}")]
    BadPattern {
        /// The rule carrying the pattern.
        rule: String,
        /// The pattern source.
        pattern: String,
        /// Why it failed to compile.
        reason: String,
    },
}

/// The context a constraint is judged against: always a file view, plus a
/// project view for graph-dependent rules.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// The file under validation.
    pub file: &'a FileContext,
    /// Project-wide context, present only in the graph-dependent phase.
    pub project: Option<&'a ProjectView>,
}

/// A validator capable of judging one rule's constraints.
pub trait RuleValidator: Send + Sync {
    /// The rule name this validator handles.
    fn rule(&self) -> &'static str;

    /// Short description for rule listings.
    fn description(&self) -> &'static str {
        ""
    }

    /// Judges a constraint against a context.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::MalformedValue`] when the constraint value
    /// has the wrong shape; such errors abort the run.
    fn validate(
        &self,
        constraint: &Constraint,
        ctx: &RuleContext<'_>,
    ) -> Result<Vec<Violation>, ValidatorError>;
}

/// Type alias for boxed validator trait objects.
pub type ValidatorBox = Box<dyn RuleValidator>;

/// The rule-name to validator lookup used by both validation phases.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: HashMap<&'static str, ValidatorBox>,
}

impl ValidatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a validator, replacing any previous one for the same rule.
    #[must_use]
    pub fn with<V: RuleValidator + 'static>(mut self, validator: V) -> Self {
        self.validators.insert(validator.rule(), Box::new(validator));
        self
    }

    /// Registers a boxed validator.
    pub fn register(&mut self, validator: ValidatorBox) {
        self.validators.insert(validator.rule(), validator);
    }

    /// Gets the validator for a rule name.
    #[must_use]
    pub fn get(&self, rule: &str) -> Option<&dyn RuleValidator> {
        self.validators.get(rule).map(AsRef::as_ref)
    }

    /// Returns the registered rule names, sorted.
    #[must_use]
    pub fn rule_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.validators.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Dispatches a constraint to its validator.
    ///
    /// Returns `Ok(None)` for rule names with no registered validator;
    /// unknown rules are skipped, not errors.
    ///
    /// # Errors
    ///
    /// Propagates validator errors (malformed values are fatal to the run).
    pub fn dispatch(
        &self,
        constraint: &Constraint,
        ctx: &RuleContext<'_>,
    ) -> Result<Option<Vec<Violation>>, ValidatorError> {
        match self.get(&constraint.rule) {
            Some(validator) => validator.validate(constraint, ctx).map(Some),
            None => {
                debug!(rule = %constraint.rule, "no validator registered, skipping");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConstraintValue, Severity};
    use std::path::PathBuf;
    use std::sync::Arc;

    struct AlwaysFires;

    impl RuleValidator for AlwaysFires {
        fn rule(&self) -> &'static str {
            "always-fires"
        }

        fn validate(
            &self,
            constraint: &Constraint,
            ctx: &RuleContext<'_>,
        ) -> Result<Vec<Violation>, ValidatorError> {
            Ok(vec![Violation::from_constraint(
                constraint,
                ctx.file.path.clone(),
                "fired",
            )])
        }
    }

    fn file_ctx() -> FileContext {
        FileContext::new(
            PathBuf::from("/p/src/a.ts"),
            std::path::Path::new("/p"),
            Some("domain".into()),
            Arc::from(""),
            vec![],
        )
    }

    #[test]
    fn dispatch_invokes_registered_validator() {
        let registry = ValidatorRegistry::new().with(AlwaysFires);
        let constraint = Constraint::new(
            "always-fires",
            ConstraintValue::Str("x".into()),
            Severity::Error,
        );
        let file = file_ctx();
        let ctx = RuleContext {
            file: &file,
            project: None,
        };
        let violations = registry.dispatch(&constraint, &ctx).unwrap().unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, "always-fires");
    }

    #[test]
    fn dispatch_skips_unknown_rules() {
        let registry = ValidatorRegistry::new();
        let constraint = Constraint::new(
            "unregistered",
            ConstraintValue::Str("x".into()),
            Severity::Error,
        );
        let file = file_ctx();
        let ctx = RuleContext {
            file: &file,
            project: None,
        };
        assert!(registry.dispatch(&constraint, &ctx).unwrap().is_none());
    }

    #[test]
    fn graph_rules_are_flagged() {
        assert!(rules::is_graph_rule(rules::FORBID_CIRCULAR_IMPORTS));
        assert!(rules::is_graph_rule(rules::IMPORTABLE_BY));
        assert!(!rules::is_graph_rule(rules::FORBID_IMPORT));
    }
}
