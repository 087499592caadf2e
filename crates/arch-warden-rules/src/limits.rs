//! Numeric limit rules: file line count and import count ceilings.

use arch_warden_core::{rules, Constraint, RuleContext, RuleValidator, ValidatorError, Violation};

fn ceiling(constraint: &Constraint) -> Result<usize, ValidatorError> {
    let value = constraint
        .value
        .as_num()
        .filter(|n| *n >= 0.0 && n.fract() == 0.0)
        .ok_or_else(|| ValidatorError::MalformedValue {
            rule: constraint.rule.clone(),
            expected: "a non-negative integer limit",
            found: constraint.value.to_string(),
        })?;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(value as usize)
}

/// Caps the number of lines in a file.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxLines;

impl MaxLines {
    /// Creates the validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RuleValidator for MaxLines {
    fn rule(&self) -> &'static str {
        rules::MAX_LINES
    }

    fn description(&self) -> &'static str {
        "Caps the number of lines in a file"
    }

    fn validate(
        &self,
        constraint: &Constraint,
        ctx: &RuleContext<'_>,
    ) -> Result<Vec<Violation>, ValidatorError> {
        let limit = ceiling(constraint)?;
        let lines = ctx.file.content.lines().count();
        if lines <= limit {
            return Ok(Vec::new());
        }
        Ok(vec![Violation::from_constraint(
            constraint,
            ctx.file.path.clone(),
            format!("file has {lines} lines, limit is {limit}"),
        )])
    }
}

/// Caps the number of imports in a file.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxImports;

impl MaxImports {
    /// Creates the validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RuleValidator for MaxImports {
    fn rule(&self) -> &'static str {
        rules::MAX_IMPORTS
    }

    fn description(&self) -> &'static str {
        "Caps the number of imports in a file"
    }

    fn validate(
        &self,
        constraint: &Constraint,
        ctx: &RuleContext<'_>,
    ) -> Result<Vec<Violation>, ValidatorError> {
        let limit = ceiling(constraint)?;
        let imports = ctx.file.imports.len();
        if imports <= limit {
            return Ok(Vec::new());
        }
        Ok(vec![Violation::from_constraint(
            constraint,
            ctx.file.path.clone(),
            format!("file has {imports} imports, limit is {limit}"),
        )])
    }
}
