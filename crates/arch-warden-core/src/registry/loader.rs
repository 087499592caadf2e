//! DTO to domain model conversion with validation.

use crate::types::{Constraint, MatchMode, Severity};

use super::dto::{ArchitectureDto, ConstraintDto, MixinDto, MixinRefDto, RegistryDto};
use super::{ArchitectureNode, GlobPattern, InlineMode, MixinDef, MixinRef, Registry, RegistryError};
use std::path::PathBuf;

/// Rules whose `pattern` (or string value) must be a valid regex.
const PATTERN_RULES: &[&str] = &["forbid_pattern", "allow_pattern"];

/// Errors during registry loading.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The registry file could not be read.
    #[error("failed to read registry file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The registry file is not valid TOML.
    #[error("failed to parse registry: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// A field-level validation error.
    #[error("{context}: {source}")]
    Validation {
        /// Where the error occurred (e.g. `architectures[0].paths[1]`).
        context: String,
        /// The underlying model error.
        source: RegistryError,
    },

    /// Unknown severity string.
    #[error("{context}: unknown severity `{value}`, expected: error, warning")]
    UnknownSeverity {
        /// Where the error occurred.
        context: String,
        /// The invalid value.
        value: String,
    },

    /// Unknown inline governance mode.
    #[error("{context}: unknown inline mode `{value}`, expected: forbidden, only, allowed")]
    UnknownInlineMode {
        /// Where the error occurred.
        context: String,
        /// The invalid value.
        value: String,
    },

    /// Unknown match mode.
    #[error("{context}: unknown match mode `{value}`, expected: all, any")]
    UnknownMatchMode {
        /// Where the error occurred.
        context: String,
        /// The invalid value.
        value: String,
    },

    /// A pattern rule carries an invalid regular expression.
    #[error("{context}: invalid pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// Where the error occurred.
        context: String,
        /// The invalid pattern source.
        pattern: String,
        /// Why it failed to compile.
        reason: String,
    },

    /// Duplicate-id errors from registry construction.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Converts a [`RegistryDto`] into a validated [`Registry`].
///
/// # Errors
///
/// Returns the first error encountered during conversion.
pub fn load(dto: RegistryDto) -> Result<Registry, LoadError> {
    let architectures = dto
        .architectures
        .into_iter()
        .enumerate()
        .map(|(i, a)| convert_architecture(a, i))
        .collect::<Result<Vec<_>, _>>()?;

    let mixins = dto
        .mixins
        .into_iter()
        .enumerate()
        .map(|(i, m)| convert_mixin(m, i))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Registry::new(architectures, mixins)?)
}

fn convert_architecture(dto: ArchitectureDto, index: usize) -> Result<ArchitectureNode, LoadError> {
    let ctx = format!("architectures[{index}] ({})", dto.id);

    let paths = dto
        .paths
        .iter()
        .enumerate()
        .map(|(j, p)| {
            GlobPattern::new(p).map_err(|e| LoadError::Validation {
                context: format!("{ctx}.paths[{j}]"),
                source: e,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let constraints = convert_constraints(dto.constraints, &dto.id, &ctx)?;

    Ok(ArchitectureNode {
        id: dto.id,
        inherits: dto.inherits,
        paths,
        mixins: dto.mixins.into_iter().map(convert_mixin_ref).collect(),
        constraints,
        hints: dto.hints,
        layer: dto.layer,
        allowed_layers: dto.allowed_layers,
        expected_intents: dto.expected_intents,
        version: dto.version,
        deprecated_from: dto.deprecated_from,
        migration_guide: dto.migration_guide,
    })
}

fn convert_mixin(dto: MixinDto, index: usize) -> Result<MixinDef, LoadError> {
    let ctx = format!("mixins[{index}] ({})", dto.id);

    let inline = match dto.inline.as_deref() {
        None | Some("allowed") => InlineMode::Allowed,
        Some("forbidden") => InlineMode::Forbidden,
        Some("only") => InlineMode::Only,
        Some(other) => {
            return Err(LoadError::UnknownInlineMode {
                context: format!("{ctx}.inline"),
                value: other.to_string(),
            })
        }
    };

    let constraints = convert_constraints(dto.constraints, &dto.id, &ctx)?;

    Ok(MixinDef {
        id: dto.id,
        inline,
        compose: dto.compose.into_iter().map(convert_mixin_ref).collect(),
        constraints,
        hints: dto.hints,
    })
}

fn convert_mixin_ref(dto: MixinRefDto) -> MixinRef {
    match dto {
        MixinRefDto::Bare(id) => MixinRef { id, params: None },
        MixinRefDto::Detailed { id, params } => MixinRef { id, params },
    }
}

fn convert_constraints(
    dtos: Vec<ConstraintDto>,
    source_id: &str,
    ctx: &str,
) -> Result<Vec<Constraint>, LoadError> {
    dtos.into_iter()
        .enumerate()
        .map(|(j, c)| convert_constraint(c, source_id, &format!("{ctx}.constraints[{j}]")))
        .collect()
}

fn convert_constraint(
    dto: ConstraintDto,
    source_id: &str,
    ctx: &str,
) -> Result<Constraint, LoadError> {
    let severity = parse_severity(&dto.severity, ctx)?;

    let match_mode = match dto.match_mode.as_deref() {
        None | Some("all") => MatchMode::All,
        Some("any") => MatchMode::Any,
        Some(other) => {
            return Err(LoadError::UnknownMatchMode {
                context: format!("{ctx}.match"),
                value: other.to_string(),
            })
        }
    };

    if PATTERN_RULES.contains(&dto.rule.as_str()) {
        let pattern_source = dto.pattern.as_deref().or(match &dto.value {
            crate::types::ConstraintValue::Str(s) => Some(s.as_str()),
            _ => None,
        });
        if let Some(p) = pattern_source {
            regex::Regex::new(p).map_err(|e| LoadError::InvalidPattern {
                context: ctx.to_string(),
                pattern: p.to_string(),
                reason: e.to_string(),
            })?;
        }
    }

    let mut alternatives = dto.alternatives;
    if let Some(single) = dto.alternative {
        alternatives.insert(0, single);
    }

    Ok(Constraint {
        rule: dto.rule,
        value: dto.value,
        severity,
        pattern: dto.pattern,
        source: Some(source_id.to_string()),
        why: dto.why,
        alternatives,
        match_mode,
    })
}

fn parse_severity(value: &str, context: &str) -> Result<Severity, LoadError> {
    match value {
        "error" => Ok(Severity::Error),
        "warning" => Ok(Severity::Warning),
        _ => Err(LoadError::UnknownSeverity {
            context: context.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConstraintValue;
    use std::path::Path;

    fn parse_and_load(toml_str: &str) -> Result<Registry, LoadError> {
        Registry::from_toml_str(toml_str)
    }

    // -- Happy path --

    #[test]
    fn load_empty_registry() {
        let registry = parse_and_load("").unwrap();
        assert_eq!(registry.architecture_count(), 0);
    }

    #[test]
    fn load_full_registry() {
        let registry = parse_and_load(
            r#"
[[architectures]]
id = "base"
hints = ["Keep modules small."]

[[architectures]]
id = "domain"
inherits = "base"
paths = ["src/domain/**"]
layer = "domain"
allowed_layers = ["domain"]
mixins = ["no-http"]

[[architectures.constraints]]
rule = "forbid_import"
value = ["sqlx"]
severity = "error"
why = "Domain must be DB-agnostic."
alternative = "repository traits"

[[mixins]]
id = "no-http"
inline = "forbidden"

[[mixins.constraints]]
rule = "forbid_import"
value = "axios"
severity = "warning"
"#,
        )
        .unwrap();

        assert_eq!(registry.architecture_count(), 2);
        let domain = registry.architecture("domain").unwrap();
        assert_eq!(domain.inherits.as_deref(), Some("base"));
        assert_eq!(domain.mixins.len(), 1);
        assert_eq!(domain.constraints.len(), 1);
        let c = &domain.constraints[0];
        assert_eq!(c.source.as_deref(), Some("domain"));
        assert_eq!(c.alternatives, vec!["repository traits".to_string()]);
        assert_eq!(c.severity, Severity::Error);

        let mixin = registry.mixin("no-http").unwrap();
        assert_eq!(mixin.inline, InlineMode::Forbidden);
        assert_eq!(mixin.constraints[0].severity, Severity::Warning);
        assert_eq!(registry.classify(Path::new("src/domain/user.ts")), Some("domain"));
    }

    #[test]
    fn load_detailed_mixin_ref() {
        let registry = parse_and_load(
            r#"
[[architectures]]
id = "handlers"
mixins = [{ id = "rate-limited", params = { ceiling = 100 } }]

[[mixins]]
id = "rate-limited"
"#,
        )
        .unwrap();
        let node = registry.architecture("handlers").unwrap();
        assert_eq!(node.mixins[0].id, "rate-limited");
        assert!(node.mixins[0].params.is_some());
    }

    #[test]
    fn load_numeric_and_map_values() {
        let registry = parse_and_load(
            r#"
[[architectures]]
id = "handlers"

[[architectures.constraints]]
rule = "max_lines"
value = 300

[[architectures.constraints]]
rule = "require_coverage"
value = { sources = "src/**/*.ts", pattern = "export function (\\w+)", targets = "tests/**/*.ts" }
"#,
        )
        .unwrap();
        let node = registry.architecture("handlers").unwrap();
        assert_eq!(node.constraints[0].value.as_num(), Some(300.0));
        assert!(node.constraints[1].value.as_map().is_some());
    }

    #[test]
    fn load_defaults_severity_to_error() {
        let registry = parse_and_load(
            r#"
[[architectures]]
id = "domain"

[[architectures.constraints]]
rule = "forbid_import"
value = "axios"
"#,
        )
        .unwrap();
        assert_eq!(
            registry.architecture("domain").unwrap().constraints[0].severity,
            Severity::Error
        );
    }

    #[test]
    fn load_match_mode_any() {
        let registry = parse_and_load(
            r#"
[[architectures]]
id = "handlers"

[[architectures.constraints]]
rule = "require_import"
value = ["tracing", "log"]
match = "any"
"#,
        )
        .unwrap();
        assert_eq!(
            registry.architecture("handlers").unwrap().constraints[0].match_mode,
            MatchMode::Any
        );
    }

    // -- Error cases --

    #[test]
    fn load_rejects_unknown_severity() {
        let result = parse_and_load(
            r#"
[[architectures]]
id = "domain"

[[architectures.constraints]]
rule = "forbid_import"
value = "axios"
severity = "critical"
"#,
        );
        assert!(matches!(result, Err(LoadError::UnknownSeverity { .. })));
    }

    #[test]
    fn load_rejects_unknown_inline_mode() {
        let result = parse_and_load(
            r#"
[[mixins]]
id = "no-http"
inline = "never"
"#,
        );
        assert!(matches!(result, Err(LoadError::UnknownInlineMode { .. })));
    }

    #[test]
    fn load_rejects_bad_glob() {
        let result = parse_and_load(
            r#"
[[architectures]]
id = "domain"
paths = ["src/[**"]
"#,
        );
        assert!(matches!(result, Err(LoadError::Validation { .. })));
    }

    #[test]
    fn load_rejects_bad_pattern_regex() {
        let result = parse_and_load(
            r#"
[[architectures]]
id = "domain"

[[architectures.constraints]]
rule = "forbid_pattern"
value = "console.log"
pattern = "(unclosed"
"#,
        );
        assert!(matches!(result, Err(LoadError::InvalidPattern { .. })));
    }

    #[test]
    fn load_rejects_duplicate_ids() {
        let result = parse_and_load(
            r#"
[[architectures]]
id = "domain"

[[architectures]]
id = "domain"
"#,
        );
        assert!(matches!(
            result,
            Err(LoadError::Registry(RegistryError::DuplicateArchitecture { .. }))
        ));
    }

    #[test]
    fn constraint_value_variants_deserialize() {
        let registry = parse_and_load(
            r#"
[[architectures]]
id = "a"

[[architectures.constraints]]
rule = "forbid_import"
value = "one"

[[architectures.constraints]]
rule = "forbid_import"
value = ["two", "three"]
"#,
        )
        .unwrap();
        let cs = &registry.architecture("a").unwrap().constraints;
        assert_eq!(cs[0].value, ConstraintValue::Str("one".into()));
        assert_eq!(
            cs[1].value,
            ConstraintValue::List(vec!["two".into(), "three".into()])
        );
    }
}
