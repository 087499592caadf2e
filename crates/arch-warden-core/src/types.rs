//! Core types for constraints, violations, and validation reports.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Severity level for a constraint or violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Warning that should be addressed but does not fail validation on its own.
    Warning,
    /// Error that must be fixed.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// How a multi-value requirement is satisfied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Every listed value must be present.
    #[default]
    All,
    /// At least one listed value must be present.
    Any,
}

/// The heterogeneous payload of a constraint.
///
/// Each rule family expects one variant and rejects the others with a
/// malformed-value error, so validators can pattern-match exhaustively
/// instead of shape-checking at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstraintValue {
    /// A single string target (import specifier, pattern source, ...).
    Str(String),
    /// A list of string targets.
    List(Vec<String>),
    /// A numeric limit or ceiling.
    Num(f64),
    /// A structured per-rule configuration table.
    Map(serde_json::Map<String, serde_json::Value>),
}

impl ConstraintValue {
    /// Returns the canonical string form used for constraint identity.
    ///
    /// Objects serialize with sorted keys (serde_json's default map is
    /// ordered); list elements are sorted here so `["a", "b"]` and
    /// `["b", "a"]` occupy the same override slot. The declared element
    /// order is untouched - this form is for keying only.
    #[must_use]
    pub fn canonical(&self) -> String {
        match self {
            Self::Str(s) => serde_json::Value::String(s.clone()).to_string(),
            Self::List(items) => {
                let mut parts: Vec<String> = items
                    .iter()
                    .map(|s| serde_json::Value::String(s.clone()).to_string())
                    .collect();
                parts.sort();
                format!("[{}]", parts.join(","))
            }
            Self::Num(n) => serde_json::Number::from_f64(*n)
                .map_or_else(|| n.to_string(), |num| num.to_string()),
            Self::Map(map) => serde_json::Value::Object(map.clone()).to_string(),
        }
    }

    /// Returns the value as a list of strings, accepting both the single
    /// and list variants.
    #[must_use]
    pub fn as_str_list(&self) -> Option<Vec<String>> {
        match self {
            Self::Str(s) => Some(vec![s.clone()]),
            Self::List(items) => Some(items.clone()),
            _ => None,
        }
    }

    /// Returns the numeric payload, if this is a numeric value.
    #[must_use]
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Self::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the structured payload, if this is a table value.
    #[must_use]
    pub fn as_map(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConstraintValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
            Self::Num(n) => write!(f, "{n}"),
            Self::Map(map) => write!(f, "{}", serde_json::Value::Object(map.clone())),
        }
    }
}

/// One declarative rule instance attached to an architecture or mixin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Rule name (e.g. `forbid_import`).
    pub rule: String,
    /// Rule-dependent payload.
    pub value: ConstraintValue,
    /// Severity of violations produced by this constraint.
    pub severity: Severity,
    /// Optional regular expression used by pattern rules, independent of `value`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Which architecture or mixin introduced this constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Optional rationale surfaced alongside violations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why: Option<String>,
    /// Suggested alternatives surfaced alongside violations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
    /// How multi-value requirements are combined.
    #[serde(default)]
    pub match_mode: MatchMode,
}

impl Constraint {
    /// Creates a constraint with the given rule, value, and severity.
    #[must_use]
    pub fn new(rule: impl Into<String>, value: ConstraintValue, severity: Severity) -> Self {
        Self {
            rule: rule.into(),
            value,
            severity,
            pattern: None,
            source: None,
            why: None,
            alternatives: Vec::new(),
            match_mode: MatchMode::All,
        }
    }

    /// Sets the provenance of this constraint.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the pattern used by pattern rules.
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Returns the identity key of this constraint.
    ///
    /// Two constraints are the same override slot iff their `rule` and
    /// canonical `value` are equal; `rule` alone is not the unit of override.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}\u{1}{}", self.rule, self.value.canonical())
    }
}

/// A violation produced by a rule validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Rule name that fired.
    pub rule: String,
    /// Severity declared by the originating constraint.
    pub severity: Severity,
    /// File the violation was found in.
    pub file: PathBuf,
    /// Line number (1-indexed), when the violation is line-anchored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Human-readable message.
    pub message: String,
    /// The concrete target that matched (import specifier, pattern, file).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Provenance of the originating constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Rationale from the originating constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why: Option<String>,
    /// Suggested alternatives from the originating constraint.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
}

impl Violation {
    /// Creates a new violation.
    #[must_use]
    pub fn new(
        rule: impl Into<String>,
        severity: Severity,
        file: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            severity,
            file: file.into(),
            line: None,
            message: message.into(),
            target: None,
            source: None,
            why: None,
            alternatives: Vec::new(),
        }
    }

    /// Creates a violation from a constraint, copying its explanatory metadata.
    #[must_use]
    pub fn from_constraint(
        constraint: &Constraint,
        file: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule: constraint.rule.clone(),
            severity: constraint.severity,
            file: file.into(),
            line: None,
            message: message.into(),
            target: None,
            source: constraint.source.clone(),
            why: constraint.why.clone(),
            alternatives: constraint.alternatives.clone(),
        }
    }

    /// Anchors the violation to a line.
    #[must_use]
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Records the concrete target that matched.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file.display())?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        write!(f, ": {} [{}] {}", self.severity, self.rule, self.message)?;
        if let Some(why) = &self.why {
            write!(f, " ({why})")?;
        }
        Ok(())
    }
}

/// Converts a [`Violation`] into a miette diagnostic for rich terminal output.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("{message}")]
pub struct ViolationDiagnostic {
    message: String,
    #[help]
    help: Option<String>,
}

impl From<&Violation> for ViolationDiagnostic {
    fn from(v: &Violation) -> Self {
        let help = match (&v.why, v.alternatives.is_empty()) {
            (Some(why), false) => Some(format!("{why}; consider: {}", v.alternatives.join(", "))),
            (Some(why), true) => Some(why.clone()),
            (None, false) => Some(format!("consider: {}", v.alternatives.join(", "))),
            (None, true) => None,
        };
        Self {
            message: format!("[{}] {}", v.rule, v.message),
            help,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_error_above_warning() {
        assert!(Severity::Error > Severity::Warning);
    }

    #[test]
    fn canonical_sorts_list_elements() {
        let a = ConstraintValue::List(vec!["b".into(), "a".into()]);
        let b = ConstraintValue::List(vec!["a".into(), "b".into()]);
        assert_eq!(a.canonical(), b.canonical());
    }

    #[test]
    fn canonical_distinguishes_str_from_list() {
        let a = ConstraintValue::Str("axios".into());
        let b = ConstraintValue::List(vec!["axios".into()]);
        assert_ne!(a.canonical(), b.canonical());
    }

    #[test]
    fn canonical_sorts_map_keys() {
        let mut m1 = serde_json::Map::new();
        m1.insert("b".into(), serde_json::json!(1));
        m1.insert("a".into(), serde_json::json!(2));
        let mut m2 = serde_json::Map::new();
        m2.insert("a".into(), serde_json::json!(2));
        m2.insert("b".into(), serde_json::json!(1));
        assert_eq!(
            ConstraintValue::Map(m1).canonical(),
            ConstraintValue::Map(m2).canonical()
        );
    }

    #[test]
    fn constraint_key_includes_value() {
        let c1 = Constraint::new(
            "forbid_import",
            ConstraintValue::Str("axios".into()),
            Severity::Error,
        );
        let c2 = Constraint::new(
            "forbid_import",
            ConstraintValue::Str("request".into()),
            Severity::Error,
        );
        assert_ne!(c1.key(), c2.key());
    }

    #[test]
    fn constraint_key_ignores_severity() {
        let c1 = Constraint::new(
            "forbid_import",
            ConstraintValue::Str("axios".into()),
            Severity::Error,
        );
        let c2 = Constraint::new(
            "forbid_import",
            ConstraintValue::Str("axios".into()),
            Severity::Warning,
        );
        assert_eq!(c1.key(), c2.key());
    }

    #[test]
    fn value_as_str_list_accepts_both_shapes() {
        assert_eq!(
            ConstraintValue::Str("fs".into()).as_str_list(),
            Some(vec!["fs".to_string()])
        );
        assert_eq!(
            ConstraintValue::List(vec!["fs".into(), "net".into()]).as_str_list(),
            Some(vec!["fs".to_string(), "net".to_string()])
        );
        assert!(ConstraintValue::Num(3.0).as_str_list().is_none());
    }

    #[test]
    fn violation_display_includes_line_and_rule() {
        let v = Violation::new(
            "forbid_import",
            Severity::Error,
            "src/domain/user.ts",
            "import of axios is forbidden",
        )
        .at_line(3);
        let s = v.to_string();
        assert!(s.contains("src/domain/user.ts:3"));
        assert!(s.contains("[forbid_import]"));
    }

    #[test]
    fn violation_from_constraint_copies_metadata() {
        let mut c = Constraint::new(
            "forbid_import",
            ConstraintValue::Str("axios".into()),
            Severity::Warning,
        )
        .with_source("http-policy");
        c.why = Some("use the shared client".into());
        let v = Violation::from_constraint(&c, "a.ts", "msg");
        assert_eq!(v.severity, Severity::Warning);
        assert_eq!(v.source.as_deref(), Some("http-policy"));
        assert_eq!(v.why.as_deref(), Some("use the shared client"));
    }
}
