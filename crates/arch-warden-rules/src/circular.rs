//! Project-scoped rule forbidding participation in import cycles.
//!
//! Evaluated only in the graph-dependent phase; one violation is produced
//! per detected cycle through the file.

use arch_warden_core::{rules, Constraint, RuleContext, RuleValidator, ValidatorError, Violation};

/// Rule name for forbid-circular-imports.
pub const NAME: &str = rules::FORBID_CIRCULAR_IMPORTS;

/// Forbids the file from participating in an import cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForbidCircularImports;

impl ForbidCircularImports {
    /// Creates the validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RuleValidator for ForbidCircularImports {
    fn rule(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Forbids participation in import cycles"
    }

    fn validate(
        &self,
        constraint: &Constraint,
        ctx: &RuleContext<'_>,
    ) -> Result<Vec<Violation>, ValidatorError> {
        let Some(view) = ctx.project else {
            // Without project context there is nothing to judge.
            return Ok(Vec::new());
        };

        Ok(view
            .cycles
            .iter()
            .map(|cycle| {
                let chain = cycle
                    .files
                    .iter()
                    .map(|f| {
                        f.file_name()
                            .map_or_else(|| f.to_string_lossy().into_owned(), |n| {
                                n.to_string_lossy().into_owned()
                            })
                    })
                    .collect::<Vec<_>>()
                    .join(" -> ");
                Violation::from_constraint(
                    constraint,
                    ctx.file.path.clone(),
                    format!("file participates in an import cycle: {chain}"),
                )
            })
            .collect())
    }
}
