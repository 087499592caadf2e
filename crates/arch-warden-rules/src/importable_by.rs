//! Project-scoped rule restricting which architectures may import a file.
//!
//! # Value
//!
//! An architecture id or list of ids allowed to import files of this
//! architecture. Imports from within the same architecture are always
//! allowed; importers with no resolvable architecture are flagged.

use arch_warden_core::{rules, Constraint, RuleContext, RuleValidator, ValidatorError, Violation};

/// Rule name for importable-by.
pub const NAME: &str = rules::IMPORTABLE_BY;

/// Restricts which architectures may import the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportableBy;

impl ImportableBy {
    /// Creates the validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RuleValidator for ImportableBy {
    fn rule(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Restricts which architectures may import the file"
    }

    fn validate(
        &self,
        constraint: &Constraint,
        ctx: &RuleContext<'_>,
    ) -> Result<Vec<Violation>, ValidatorError> {
        let allowed =
            constraint
                .value
                .as_str_list()
                .ok_or_else(|| ValidatorError::MalformedValue {
                    rule: constraint.rule.clone(),
                    expected: "an architecture id or list of ids",
                    found: constraint.value.to_string(),
                })?;
        let Some(view) = ctx.project else {
            return Ok(Vec::new());
        };

        let own_arch = ctx.file.arch_id.as_deref();
        let mut violations = Vec::new();
        for importer in &view.importers {
            let importer_arch = importer.arch_id.as_deref();
            if importer_arch.is_some() && importer_arch == own_arch {
                continue;
            }
            let permitted =
                importer_arch.is_some_and(|arch| allowed.iter().any(|a| a == arch));
            if permitted {
                continue;
            }
            let described = importer_arch.unwrap_or("no architecture");
            violations.push(
                Violation::from_constraint(
                    constraint,
                    ctx.file.path.clone(),
                    format!(
                        "imported by `{}` ({described}); importable only by: {}",
                        importer.file.display(),
                        allowed.join(", "),
                    ),
                )
                .with_target(importer.file.to_string_lossy().into_owned()),
            );
        }
        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forbid_import::test_support::ctx_with_imports;
    use arch_warden_core::{ConstraintValue, Importer, ProjectView, Severity};
    use std::path::PathBuf;

    fn constraint(allowed: &[&str]) -> Constraint {
        Constraint::new(
            NAME,
            ConstraintValue::List(allowed.iter().map(|s| (*s).to_string()).collect()),
            Severity::Error,
        )
    }

    fn view(importers: &[(&str, Option<&str>)]) -> ProjectView {
        ProjectView {
            importers: importers
                .iter()
                .map(|(file, arch)| Importer {
                    file: PathBuf::from(file),
                    arch_id: arch.map(str::to_string),
                })
                .collect(),
            cycles: vec![],
        }
    }

    #[test]
    fn listed_architecture_may_import() {
        let file = ctx_with_imports(&[]);
        let v = view(&[("/p/src/handlers/create.ts", Some("handlers"))]);
        let ctx = RuleContext {
            file: &file,
            project: Some(&v),
        };
        assert!(ImportableBy::new()
            .validate(&constraint(&["handlers"]), &ctx)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn unlisted_architecture_violates() {
        let file = ctx_with_imports(&[]);
        let v = view(&[("/p/src/cli/main.ts", Some("cli"))]);
        let ctx = RuleContext {
            file: &file,
            project: Some(&v),
        };
        let violations = ImportableBy::new()
            .validate(&constraint(&["handlers"]), &ctx)
            .unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("cli"));
    }

    #[test]
    fn same_architecture_always_allowed() {
        // ctx_with_imports gives the file the `domain` architecture.
        let file = ctx_with_imports(&[]);
        let v = view(&[("/p/src/domain/other.ts", Some("domain"))]);
        let ctx = RuleContext {
            file: &file,
            project: Some(&v),
        };
        assert!(ImportableBy::new()
            .validate(&constraint(&["handlers"]), &ctx)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn unclassified_importer_violates() {
        let file = ctx_with_imports(&[]);
        let v = view(&[("/p/scripts/tool.ts", None)]);
        let ctx = RuleContext {
            file: &file,
            project: Some(&v),
        };
        let violations = ImportableBy::new()
            .validate(&constraint(&["handlers"]), &ctx)
            .unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("no architecture"));
    }
}
