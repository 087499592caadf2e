//! Serde DTOs for the declarative registry file.
//!
//! These mirror the on-disk TOML shape; all invariants are enforced by the
//! loader when converting into the domain model.

use crate::types::ConstraintValue;
use serde::Deserialize;

/// Top-level registry document.
#[derive(Debug, Default, Deserialize)]
pub struct RegistryDto {
    /// Architecture declarations, in file order.
    #[serde(default)]
    pub architectures: Vec<ArchitectureDto>,
    /// Mixin declarations, in file order.
    #[serde(default)]
    pub mixins: Vec<MixinDto>,
}

/// One `[[architectures]]` entry.
#[derive(Debug, Deserialize)]
pub struct ArchitectureDto {
    /// Unique identifier.
    pub id: String,
    /// Optional parent architecture id.
    #[serde(default)]
    pub inherits: Option<String>,
    /// Glob patterns classifying files into this architecture.
    #[serde(default)]
    pub paths: Vec<String>,
    /// Registry-applied mixin references, in order.
    #[serde(default)]
    pub mixins: Vec<MixinRefDto>,
    /// Constraints declared directly on this node.
    #[serde(default)]
    pub constraints: Vec<ConstraintDto>,
    /// Free-text guidance strings.
    #[serde(default)]
    pub hints: Vec<String>,
    /// Layer classification metadata.
    #[serde(default)]
    pub layer: Option<String>,
    /// Layers this architecture may import from.
    #[serde(default)]
    pub allowed_layers: Vec<String>,
    /// Expected intents, passed through unresolved.
    #[serde(default)]
    pub expected_intents: Vec<String>,
    /// Version metadata.
    #[serde(default)]
    pub version: Option<String>,
    /// Deprecation start version.
    #[serde(default)]
    pub deprecated_from: Option<String>,
    /// Migration guidance.
    #[serde(default)]
    pub migration_guide: Option<String>,
}

/// One `[[mixins]]` entry.
#[derive(Debug, Deserialize)]
pub struct MixinDto {
    /// Unique identifier.
    pub id: String,
    /// Governance mode: `forbidden`, `only`, or `allowed` (default).
    #[serde(default)]
    pub inline: Option<String>,
    /// Mixins this mixin expands to.
    #[serde(default)]
    pub compose: Vec<MixinRefDto>,
    /// Constraints contributed by this mixin.
    #[serde(default)]
    pub constraints: Vec<ConstraintDto>,
    /// Hints contributed by this mixin.
    #[serde(default)]
    pub hints: Vec<String>,
}

/// A mixin reference: either a bare id string or an id with parameters.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MixinRefDto {
    /// `mixins = ["no-io"]`
    Bare(String),
    /// `mixins = [{ id = "no-io", params = { strict = true } }]`
    Detailed {
        /// The referenced mixin id.
        id: String,
        /// Inline parameters passed through unresolved.
        #[serde(default)]
        params: Option<serde_json::Map<String, serde_json::Value>>,
    },
}

/// One constraint entry under an architecture or mixin.
#[derive(Debug, Deserialize)]
pub struct ConstraintDto {
    /// Rule name.
    pub rule: String,
    /// Rule-dependent payload.
    pub value: ConstraintValue,
    /// Severity string, defaulting to `error`.
    #[serde(default = "default_severity")]
    pub severity: String,
    /// Optional regular expression for pattern rules.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Optional rationale.
    #[serde(default)]
    pub why: Option<String>,
    /// Single suggested alternative (merged with `alternatives`).
    #[serde(default)]
    pub alternative: Option<String>,
    /// Suggested alternatives.
    #[serde(default)]
    pub alternatives: Vec<String>,
    /// Match mode for multi-value requirements: `all` (default) or `any`.
    #[serde(default, rename = "match")]
    pub match_mode: Option<String>,
}

fn default_severity() -> String {
    "error".to_string()
}
