//! The architecture resolution engine.
//!
//! Turns a registry of architecture and mixin definitions into one
//! conflict-resolved constraint set per architecture: walks inheritance
//! root-to-leaf, folds in mixins (registry-declared first, caller-supplied
//! inline mixins last), merges constraints by `(rule, value)` identity with
//! later-write-wins override, resolves pattern directives, and records every
//! override, governance violation, and mixin contradiction as an
//! informational conflict.
//!
//! The engine is stateless; callers memoize results per architecture id for
//! the lifetime of a validation run.

use crate::dispatch::rules;
use crate::registry::{ArchitectureNode, InlineMode, Registry};
use crate::types::{Constraint, ConstraintValue, Severity};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::debug;

/// Typed failures of [`resolve`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    /// The requested architecture, or one of its ancestors, is not declared.
    #[error("architecture not found: `{arch_id}` (chain: {})", format_chain(.chain, .arch_id))]
    ArchitectureNotFound {
        /// The missing id.
        arch_id: String,
        /// The inheritance chain walked before the miss.
        chain: Vec<String>,
    },

    /// A referenced mixin (registry, composed, or inline) is not declared.
    #[error("mixin not found: `{mixin_id}` (applied by `{applied_by}`)")]
    MixinNotFound {
        /// The missing mixin id.
        mixin_id: String,
        /// The architecture or mixin that referenced it, or `inline`.
        applied_by: String,
    },

    /// The `inherits` chain revisits an architecture.
    #[error("circular inheritance: {}", .cycle.join(" -> "))]
    CircularInheritance {
        /// The ids forming the cycle, ending with the repeated id.
        cycle: Vec<String>,
    },

    /// A mixin `compose` expansion revisits a mixin.
    #[error("circular mixin composition: {}", .cycle.join(" -> "))]
    CircularComposition {
        /// The ids forming the cycle, ending with the repeated id.
        cycle: Vec<String>,
    },
}

fn format_chain(chain: &[String], arch_id: &str) -> String {
    if chain.is_empty() {
        arch_id.to_string()
    } else {
        format!("{} -> {arch_id}", chain.join(" -> "))
    }
}

/// What a conflict record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// A later constraint replaced an earlier one in the same slot.
    Override,
    /// A mixin declared `inline = "forbidden"` was supplied inline.
    MixinInlineForbidden,
    /// A mixin declared `inline = "only"` was applied from the registry.
    MixinInlineOnly,
    /// Two inline mixins contributed mutually exclusive constraints.
    MixinConflict,
}

/// One override, contradiction, or governance violation found during
/// resolution. Informational; never blocks resolution.
#[derive(Debug, Clone, Serialize)]
pub struct ConflictRecord {
    /// Rule involved, or the governance conflict name.
    pub rule: String,
    /// Value involved (for governance conflicts, the mixin id).
    pub value: ConstraintValue,
    /// Severity of the record.
    pub severity: Severity,
    /// What happened.
    pub resolution: ConflictKind,
    /// Human-readable explanation.
    pub detail: String,
}

/// Options for one resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Ad-hoc mixins applied last, in the order given, with the highest
    /// override precedence.
    pub inline_mixins: Vec<String>,
}

/// The conflict-resolved rule set of one architecture.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedArchitecture {
    /// The resolved architecture id.
    pub arch_id: String,
    /// Inheritance chain, self-first, root-last.
    pub inheritance_chain: Vec<String>,
    /// Every applied mixin id, in application order (composed mixins
    /// precede the mixin that composes them).
    pub applied_mixins: Vec<String>,
    /// Final constraint list after overrides and directive resolution.
    pub constraints: Vec<Constraint>,
    /// Hints deduplicated by exact text, first-seen order.
    pub hints: Vec<String>,
    /// Conflicts discovered during resolution, in application order.
    pub conflicts: Vec<ConflictRecord>,
    /// Effective layer, child-first along the chain.
    pub layer: Option<String>,
    /// Effective allowed layers, child-first along the chain.
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

impl ResolvedArchitecture {
    /// Returns the constraints using the given rule.
    pub fn constraints_for<'a>(&'a self, rule: &'a str) -> impl Iterator<Item = &'a Constraint> + 'a {
        self.constraints.iter().filter(move |c| c.rule == rule)
    }
}

/// Where a mixin application originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MixinOrigin {
    Registry,
    Inline,
}

#[derive(Default)]
struct MergeState {
    merged: IndexMap<String, Constraint>,
    conflicts: Vec<ConflictRecord>,
    hints: IndexSet<String>,
    applied_mixins: Vec<String>,
    inline_contrib: Vec<(String, Constraint)>,
}

impl MergeState {
    /// Inserts a constraint, replacing any prior entry in the same
    /// `(rule, value)` slot and recording the override.
    fn insert(&mut self, constraint: Constraint) {
        let key = constraint.key();
        if let Some(previous) = self.merged.get(&key) {
            self.conflicts.push(ConflictRecord {
                rule: constraint.rule.clone(),
                value: constraint.value.clone(),
                severity: constraint.severity,
                resolution: ConflictKind::Override,
                detail: format!(
                    "`{}` ({}) overridden by `{}` ({})",
                    previous.source.as_deref().unwrap_or("unknown"),
                    previous.severity,
                    constraint.source.as_deref().unwrap_or("unknown"),
                    constraint.severity,
                ),
            });
        }
        self.merged.insert(key, constraint);
    }
}

/// Resolves an architecture into one effective rule set.
///
/// # Errors
///
/// Fails with [`ResolveError::ArchitectureNotFound`] if `arch_id` or any
/// ancestor is absent, [`ResolveError::MixinNotFound`] if any referenced
/// mixin (inline ones included) is absent, and the circular variants on
/// inheritance or composition cycles.
pub fn resolve(
    registry: &Registry,
    arch_id: &str,
    options: &ResolveOptions,
) -> Result<ResolvedArchitecture, ResolveError> {
    let chain = inheritance_chain(registry, arch_id)?;
    let chain_ids: Vec<String> = chain.iter().map(|n| n.id.clone()).collect();
    debug!(arch_id, chain = ?chain_ids, "resolving architecture");

    let mut state = MergeState::default();

    // Root-to-leaf, so more specific nodes override more general ones.
    for node in chain.iter().rev() {
        for mref in &node.mixins {
            let mut stack = IndexSet::new();
            apply_mixin(
                registry,
                &mref.id,
                &node.id,
                MixinOrigin::Registry,
                &mut state,
                &mut stack,
            )?;
        }
        for constraint in &node.constraints {
            state.insert(with_source(constraint, &node.id));
        }
        for hint in &node.hints {
            state.hints.insert(hint.clone());
        }
    }

    // Inline mixins apply last: highest override precedence.
    for mixin_id in &options.inline_mixins {
        let mut stack = IndexSet::new();
        apply_mixin(
            registry,
            mixin_id,
            "inline",
            MixinOrigin::Inline,
            &mut state,
            &mut stack,
        )?;
    }

    record_inline_conflicts(&mut state);
    resolve_pattern_directives(&mut state.merged);

    Ok(ResolvedArchitecture {
        arch_id: arch_id.to_string(),
        inheritance_chain: chain_ids,
        applied_mixins: state.applied_mixins,
        constraints: state.merged.into_values().collect(),
        hints: state.hints.into_iter().collect(),
        conflicts: state.conflicts,
        layer: first_some(&chain, |n| n.layer.clone()),
        allowed_layers: first_some(&chain, |n| {
            (!n.allowed_layers.is_empty()).then(|| n.allowed_layers.clone())
        })
        .unwrap_or_default(),
        expected_intents: first_some(&chain, |n| {
            (!n.expected_intents.is_empty()).then(|| n.expected_intents.clone())
        })
        .unwrap_or_default(),
        version: first_some(&chain, |n| n.version.clone()),
        deprecated_from: first_some(&chain, |n| n.deprecated_from.clone()),
        migration_guide: first_some(&chain, |n| n.migration_guide.clone()),
    })
}

/// Walks `inherits` from `arch_id`, returning nodes self-first, root-last.
fn inheritance_chain<'r>(
    registry: &'r Registry,
    arch_id: &str,
) -> Result<Vec<&'r ArchitectureNode>, ResolveError> {
    let mut chain = Vec::new();
    let mut visited: IndexSet<String> = IndexSet::new();
    let mut current = arch_id.to_string();
    loop {
        if let Some(start) = visited.get_index_of(&current) {
            let mut cycle: Vec<String> = visited.iter().skip(start).cloned().collect();
            cycle.push(current);
            return Err(ResolveError::CircularInheritance { cycle });
        }
        let node =
            registry
                .architecture(&current)
                .ok_or_else(|| ResolveError::ArchitectureNotFound {
                    arch_id: current.clone(),
                    chain: visited.iter().cloned().collect(),
                })?;
        visited.insert(current.clone());
        chain.push(node);
        match &node.inherits {
            Some(parent) => current = parent.clone(),
            None => break,
        }
    }
    Ok(chain)
}

/// Applies one mixin: governance check, `compose` expansion (depth-first,
/// sharing the inheritance cycle-guard shape), then its own payload.
fn apply_mixin(
    registry: &Registry,
    mixin_id: &str,
    applied_by: &str,
    origin: MixinOrigin,
    state: &mut MergeState,
    stack: &mut IndexSet<String>,
) -> Result<(), ResolveError> {
    if let Some(start) = stack.get_index_of(mixin_id) {
        let mut cycle: Vec<String> = stack.iter().skip(start).cloned().collect();
        cycle.push(mixin_id.to_string());
        return Err(ResolveError::CircularComposition { cycle });
    }
    let def = registry
        .mixin(mixin_id)
        .ok_or_else(|| ResolveError::MixinNotFound {
            mixin_id: mixin_id.to_string(),
            applied_by: applied_by.to_string(),
        })?;
    stack.insert(mixin_id.to_string());

    match (def.inline, origin) {
        (InlineMode::Forbidden, MixinOrigin::Inline) => {
            state.conflicts.push(ConflictRecord {
                rule: "mixin_inline_forbidden".to_string(),
                value: ConstraintValue::Str(mixin_id.to_string()),
                severity: Severity::Warning,
                resolution: ConflictKind::MixinInlineForbidden,
                detail: format!(
                    "mixin `{mixin_id}` must only be applied via the registry's mixins list"
                ),
            });
        }
        (InlineMode::Only, MixinOrigin::Registry) => {
            state.conflicts.push(ConflictRecord {
                rule: "mixin_inline_only".to_string(),
                value: ConstraintValue::Str(mixin_id.to_string()),
                severity: Severity::Warning,
                resolution: ConflictKind::MixinInlineOnly,
                detail: format!(
                    "mixin `{mixin_id}` must only be applied inline, not from `{applied_by}`"
                ),
            });
        }
        _ => {}
    }

    for sub in &def.compose {
        apply_mixin(registry, &sub.id, mixin_id, origin, state, stack)?;
    }

    for constraint in &def.constraints {
        let constraint = with_source(constraint, mixin_id);
        if origin == MixinOrigin::Inline {
            state
                .inline_contrib
                .push((mixin_id.to_string(), constraint.clone()));
        }
        state.insert(constraint);
    }
    for hint in &def.hints {
        state.hints.insert(hint.clone());
    }

    state.applied_mixins.push(mixin_id.to_string());
    stack.shift_remove(mixin_id);
    Ok(())
}

/// Detects mutually exclusive constraints contributed by different inline
/// mixins: an `allow_*` against a `forbid_*`, or a `forbid_*` against a
/// `require_*`, over an intersecting target.
fn record_inline_conflicts(state: &mut MergeState) {
    let mut seen: IndexSet<String> = IndexSet::new();
    for (i, (mixin_a, a)) in state.inline_contrib.iter().enumerate() {
        for (mixin_b, b) in state.inline_contrib.iter().skip(i + 1) {
            if mixin_a == mixin_b {
                continue;
            }
            let Some((stem_a, polarity_a)) = split_rule(&a.rule) else {
                continue;
            };
            let Some((stem_b, polarity_b)) = split_rule(&b.rule) else {
                continue;
            };
            if stem_a != stem_b || !polarities_conflict(polarity_a, polarity_b) {
                continue;
            }
            let (Some(targets_a), Some(targets_b)) =
                (a.value.as_str_list(), b.value.as_str_list())
            else {
                continue;
            };
            for target in targets_a.iter().filter(|t| targets_b.contains(t)) {
                if !seen.insert(format!("{stem_a}\u{1}{target}")) {
                    continue;
                }
                let severity = a.severity.max(b.severity);
                state.conflicts.push(ConflictRecord {
                    rule: "mixin_conflict".to_string(),
                    value: ConstraintValue::Str(target.clone()),
                    severity,
                    resolution: ConflictKind::MixinConflict,
                    detail: format!(
                        "inline mixins `{mixin_a}` ({}) and `{mixin_b}` ({}) disagree on `{target}`",
                        a.rule, b.rule,
                    ),
                });
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    Allow,
    Forbid,
    Require,
}

fn split_rule(rule: &str) -> Option<(&str, Polarity)> {
    rule.strip_prefix("allow_")
        .map(|stem| (stem, Polarity::Allow))
        .or_else(|| rule.strip_prefix("forbid_").map(|stem| (stem, Polarity::Forbid)))
        .or_else(|| {
            rule.strip_prefix("require_")
                .map(|stem| (stem, Polarity::Require))
        })
}

fn polarities_conflict(a: Polarity, b: Polarity) -> bool {
    matches!(
        (a, b),
        (Polarity::Allow, Polarity::Forbid)
            | (Polarity::Forbid, Polarity::Allow)
            | (Polarity::Forbid, Polarity::Require)
            | (Polarity::Require, Polarity::Forbid)
    )
}

/// Resolves `allow_pattern` directives against accumulated `forbid_pattern`
/// entries, then removes every `allow_pattern` from the final list.
fn resolve_pattern_directives(merged: &mut IndexMap<String, Constraint>) {
    let allows: Vec<Constraint> = merged
        .values()
        .filter(|c| c.rule == rules::ALLOW_PATTERN)
        .cloned()
        .collect();
    if allows.is_empty() {
        return;
    }
    for allow in &allows {
        let matched: Vec<String> = merged
            .iter()
            .filter(|(_, c)| c.rule == rules::FORBID_PATTERN && directive_matches(allow, c))
            .map(|(key, _)| key.clone())
            .collect();
        for key in matched {
            merged.shift_remove(&key);
        }
    }
    merged.retain(|_, c| c.rule != rules::ALLOW_PATTERN);
}

/// Match by `pattern` field when both sides carry one; otherwise by value.
fn directive_matches(allow: &Constraint, forbid: &Constraint) -> bool {
    match (&allow.pattern, &forbid.pattern) {
        (Some(a), Some(f)) => a == f,
        _ => allow.value.canonical() == forbid.value.canonical(),
    }
}

fn with_source(constraint: &Constraint, source: &str) -> Constraint {
    let mut c = constraint.clone();
    if c.source.is_none() {
        c.source = Some(source.to_string());
    }
    c
}

fn first_some<T>(
    chain: &[&ArchitectureNode],
    pick: impl Fn(&ArchitectureNode) -> Option<T>,
) -> Option<T> {
    chain.iter().find_map(|n| pick(n))
}
