//! The rule registry: architecture nodes and mixin definitions.
//!
//! The registry is loaded once from a declarative file, handed to the
//! resolver as an in-memory structure, and never mutated during a run.
//! Resolution produces new structures.

mod dto;
mod loader;

pub use dto::RegistryDto;
pub use loader::{load, LoadError};

use crate::types::Constraint;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// A validated glob pattern classifying files into an architecture.
///
/// Compiled once at construction and reused for all match calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobPattern {
    raw: String,
    compiled: glob::Pattern,
}

impl GlobPattern {
    /// Creates a new glob pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is empty or has invalid glob syntax.
    pub fn new(pattern: &str) -> Result<Self, RegistryError> {
        if pattern.is_empty() {
            return Err(RegistryError::EmptyGlobPattern);
        }
        let compiled =
            glob::Pattern::new(pattern).map_err(|e| RegistryError::InvalidGlobPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            raw: pattern.to_string(),
            compiled,
        })
    }

    /// Tests whether a relative file path matches this pattern.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        if self.compiled.matches(&path_str) {
            return true;
        }
        // For `dir/**` patterns, also accept prefix + separator so directory
        // globs match regardless of how the glob crate treats `**` here.
        if let Some(prefix) = self.raw.strip_suffix("/**") {
            let normalized = prefix.trim_end_matches('/');
            if path_str.starts_with(normalized)
                && path_str
                    .as_bytes()
                    .get(normalized.len())
                    .is_some_and(|&b| b == b'/')
            {
                return true;
            }
        }
        false
    }

    /// Returns the pattern as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for GlobPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Governance mode controlling how a mixin may be applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InlineMode {
    /// May be applied from the registry's static list or inline.
    #[default]
    Allowed,
    /// Must only be applied via the registry's static `mixins` list.
    Forbidden,
    /// Must only be applied ad hoc as an inline mixin.
    Only,
}

impl fmt::Display for InlineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed => write!(f, "allowed"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::Only => write!(f, "only"),
        }
    }
}

/// A reference to a mixin: a bare id, optionally with inline parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MixinRef {
    /// The referenced mixin id.
    pub id: String,
    /// Optional inline parameters attached at the reference site,
    /// passed through to downstream consumers unresolved.
    pub params: Option<serde_json::Map<String, serde_json::Value>>,
}

impl MixinRef {
    /// Creates a bare reference to a mixin id.
    #[must_use]
    pub fn bare(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            params: None,
        }
    }
}

/// A named rule bundle applied to classified source files.
#[derive(Debug, Clone)]
pub struct ArchitectureNode {
    /// Unique identifier.
    pub id: String,
    /// Optional single parent; chains of these form linear inheritance.
    pub inherits: Option<String>,
    /// Glob patterns classifying files into this architecture.
    pub paths: Vec<GlobPattern>,
    /// Mixins applied from the registry, in list order.
    pub mixins: Vec<MixinRef>,
    /// Constraints declared directly on this node, in declaration order.
    pub constraints: Vec<Constraint>,
    /// Free-text guidance strings.
    pub hints: Vec<String>,
    /// Layer this architecture belongs to, for layer boundary checks.
    pub layer: Option<String>,
    /// Layers files of this architecture may import from.
    pub allowed_layers: Vec<String>,
    /// Expected intents, passed through unresolved.
    pub expected_intents: Vec<String>,
    /// Version metadata, passed through unresolved.
    pub version: Option<String>,
    /// Deprecation start version, passed through unresolved.
    pub deprecated_from: Option<String>,
    /// Migration guidance, passed through unresolved.
    pub migration_guide: Option<String>,
}

/// A named, reusable bundle of constraints and hints.
#[derive(Debug, Clone)]
pub struct MixinDef {
    /// Unique identifier.
    pub id: String,
    /// Governance mode for inline application.
    pub inline: InlineMode,
    /// Other mixins this mixin expands to, applied before its own payload.
    pub compose: Vec<MixinRef>,
    /// Constraints contributed by this mixin.
    pub constraints: Vec<Constraint>,
    /// Hints contributed by this mixin.
    pub hints: Vec<String>,
}

/// An in-memory registry of architecture nodes and mixin definitions.
///
/// Iteration order is declaration order; classification gives the first
/// declared architecture whose path globs match.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    architectures: IndexMap<String, ArchitectureNode>,
    mixins: IndexMap<String, MixinDef>,
}

impl Registry {
    /// Builds a registry, rejecting duplicate ids.
    ///
    /// # Errors
    ///
    /// Returns an error on a duplicate architecture or mixin id.
    pub fn new(
        architectures: Vec<ArchitectureNode>,
        mixins: Vec<MixinDef>,
    ) -> Result<Self, RegistryError> {
        let mut arch_map = IndexMap::with_capacity(architectures.len());
        for node in architectures {
            if arch_map.contains_key(&node.id) {
                return Err(RegistryError::DuplicateArchitecture { id: node.id });
            }
            arch_map.insert(node.id.clone(), node);
        }
        let mut mixin_map = IndexMap::with_capacity(mixins.len());
        for def in mixins {
            if mixin_map.contains_key(&def.id) {
                return Err(RegistryError::DuplicateMixin { id: def.id });
            }
            mixin_map.insert(def.id.clone(), def);
        }
        Ok(Self {
            architectures: arch_map,
            mixins: mixin_map,
        })
    }

    /// Loads a registry from a declarative TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml_str(content: &str) -> Result<Self, LoadError> {
        let dto: RegistryDto = toml::from_str(content).map_err(|e| LoadError::Parse {
            message: e.to_string(),
        })?;
        load(dto)
    }

    /// Loads a registry from a declarative TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails validation.
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    /// Gets an architecture node by id.
    #[must_use]
    pub fn architecture(&self, id: &str) -> Option<&ArchitectureNode> {
        self.architectures.get(id)
    }

    /// Gets a mixin definition by id.
    #[must_use]
    pub fn mixin(&self, id: &str) -> Option<&MixinDef> {
        self.mixins.get(id)
    }

    /// Iterates architecture nodes in declaration order.
    pub fn architectures(&self) -> impl Iterator<Item = &ArchitectureNode> {
        self.architectures.values()
    }

    /// Iterates mixin definitions in declaration order.
    pub fn mixins(&self) -> impl Iterator<Item = &MixinDef> {
        self.mixins.values()
    }

    /// Returns the number of declared architectures.
    #[must_use]
    pub fn architecture_count(&self) -> usize {
        self.architectures.len()
    }

    /// Classifies a project-relative path into an architecture.
    ///
    /// The first declared architecture whose globs match wins.
    #[must_use]
    pub fn classify(&self, relative_path: &Path) -> Option<&str> {
        self.architectures
            .values()
            .find(|node| node.paths.iter().any(|p| p.matches(relative_path)))
            .map(|node| node.id.as_str())
    }

    /// Returns true if any node- or mixin-level constraint uses the rule.
    ///
    /// This is the cheap one-time scan behind the coverage and similarity
    /// skip paths; callers memoize the answer per run.
    #[must_use]
    pub fn has_rule(&self, rule: &str) -> bool {
        self.architectures
            .values()
            .flat_map(|n| n.constraints.iter())
            .chain(self.mixins.values().flat_map(|m| m.constraints.iter()))
            .any(|c| c.rule == rule)
    }

    /// Returns the effective layer of an architecture, child-first along
    /// the inheritance chain.
    #[must_use]
    pub fn effective_layer(&self, arch_id: &str) -> Option<&str> {
        self.walk_chain(arch_id, |node| node.layer.as_deref())
    }

    /// Returns the effective allowed layers of an architecture, child-first
    /// along the inheritance chain.
    #[must_use]
    pub fn effective_allowed_layers(&self, arch_id: &str) -> Option<&[String]> {
        self.walk_chain(arch_id, |node| {
            if node.allowed_layers.is_empty() {
                None
            } else {
                Some(node.allowed_layers.as_slice())
            }
        })
    }

    /// Walks the inheritance chain child-first until `pick` yields a value.
    /// Stops silently on unknown parents or cycles; the resolver reports
    /// those as typed errors.
    fn walk_chain<'a, T>(
        &'a self,
        arch_id: &str,
        pick: impl Fn(&'a ArchitectureNode) -> Option<T>,
    ) -> Option<T> {
        let mut visited = HashSet::new();
        let mut current = arch_id;
        while visited.insert(current.to_string()) {
            let node = self.architecture(current)?;
            if let Some(value) = pick(node) {
                return Some(value);
            }
            current = node.inherits.as_deref()?;
        }
        None
    }
}

/// Errors in registry model construction.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    /// Glob pattern is empty.
    #[error("glob pattern must not be empty")]
    EmptyGlobPattern,

    /// Glob pattern has invalid syntax.
    #[error("invalid glob pattern `{pattern}`: {reason}")]
    InvalidGlobPattern {
        /// The invalid pattern.
        pattern: String,
        /// Why it's invalid.
        reason: String,
    },

    /// Two architectures share an id.
    #[error("duplicate architecture id `{id}`")]
    DuplicateArchitecture {
        /// The duplicated id.
        id: String,
    },

    /// Two mixins share an id.
    #[error("duplicate mixin id `{id}`")]
    DuplicateMixin {
        /// The duplicated id.
        id: String,
    },
}


#[cfg(test)]
mod tests {
    use super::test_support::{arch, mixin};
    use super::*;
    use crate::types::{ConstraintValue, Severity};

    #[test]
    fn glob_pattern_matches_directory_tree() {
        let pat = GlobPattern::new("src/domain/**").unwrap();
        assert!(pat.matches(Path::new("src/domain/user.ts")));
        assert!(pat.matches(Path::new("src/domain/sub/deep.ts")));
        assert!(!pat.matches(Path::new("src/infra/db.ts")));
    }

    #[test]
    fn glob_pattern_empty_rejected() {
        assert!(matches!(
            GlobPattern::new(""),
            Err(RegistryError::EmptyGlobPattern)
        ));
    }

    #[test]
    fn registry_rejects_duplicate_architecture() {
        let result = Registry::new(vec![arch("domain"), arch("domain")], vec![]);
        assert!(matches!(
            result,
            Err(RegistryError::DuplicateArchitecture { .. })
        ));
    }

    #[test]
    fn registry_rejects_duplicate_mixin() {
        let result = Registry::new(vec![], vec![mixin("no-io"), mixin("no-io")]);
        assert!(matches!(result, Err(RegistryError::DuplicateMixin { .. })));
    }

    #[test]
    fn classify_prefers_declaration_order() {
        let mut first = arch("domain");
        first.paths = vec![GlobPattern::new("src/**").unwrap()];
        let mut second = arch("infra");
        second.paths = vec![GlobPattern::new("src/infra/**").unwrap()];
        let registry = Registry::new(vec![first, second], vec![]).unwrap();
        // Both match; the first declared wins.
        assert_eq!(registry.classify(Path::new("src/infra/db.ts")), Some("domain"));
    }

    #[test]
    fn classify_returns_none_without_match() {
        let mut node = arch("domain");
        node.paths = vec![GlobPattern::new("src/domain/**").unwrap()];
        let registry = Registry::new(vec![node], vec![]).unwrap();
        assert_eq!(registry.classify(Path::new("scripts/build.sh")), None);
    }

    #[test]
    fn has_rule_scans_nodes_and_mixins() {
        let mut node = arch("domain");
        node.constraints.push(Constraint::new(
            "forbid_import",
            ConstraintValue::Str("axios".into()),
            Severity::Error,
        ));
        let mut m = mixin("covered");
        m.constraints.push(Constraint::new(
            "require_coverage",
            ConstraintValue::Num(0.8),
            Severity::Error,
        ));
        let registry = Registry::new(vec![node], vec![m]).unwrap();
        assert!(registry.has_rule("forbid_import"));
        assert!(registry.has_rule("require_coverage"));
        assert!(!registry.has_rule("max_similarity"));
    }

    #[test]
    fn effective_layer_walks_inheritance() {
        let mut base = arch("base");
        base.layer = Some("domain".into());
        base.allowed_layers = vec!["domain".into()];
        let mut child = arch("entities");
        child.inherits = Some("base".into());
        let registry = Registry::new(vec![base, child], vec![]).unwrap();
        assert_eq!(registry.effective_layer("entities"), Some("domain"));
        assert_eq!(
            registry.effective_allowed_layers("entities"),
            Some(&["domain".to_string()][..])
        );
    }

    #[test]
    fn effective_layer_stops_on_inheritance_cycle() {
        let mut a = arch("a");
        a.inherits = Some("b".into());
        let mut b = arch("b");
        b.inherits = Some("a".into());
        let registry = Registry::new(vec![a, b], vec![]).unwrap();
        assert_eq!(registry.effective_layer("a"), None);
    }
}
