//! # arch-warden-core
//!
//! Core framework for declarative architecture governance.
//!
//! This crate provides the registry model, the architecture resolution
//! engine, the rule validator dispatch contract, and the project validation
//! orchestrator:
//!
//! - [`Registry`] holds architecture nodes and mixin definitions
//! - [`resolve`] merges inheritance, mixins, and overrides into one
//!   effective rule set per architecture
//! - [`RuleValidator`] and [`ValidatorRegistry`] dispatch constraints to
//!   their validators
//! - [`Orchestrator`] drives whole-project validation over an import graph
//!
//! ## Example
//!
//! ```ignore
//! use arch_warden_core::{resolve, Registry, ResolveOptions};
//!
//! let registry = Registry::from_file("arch-warden.toml".as_ref())?;
//! let resolved = resolve(&registry, "domain", &ResolveOptions::default())?;
//! for constraint in &resolved.constraints {
//!     println!("{}: {}", constraint.rule, constraint.value);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod checks;
mod context;
mod dispatch;
mod graph;
mod orchestrator;
pub mod registry;
mod report;
mod resolver;
mod types;

/// Utility helpers for rule implementations.
pub mod utils;

pub use context::{FileContext, ProjectView};
pub use dispatch::{rules, RuleContext, RuleValidator, ValidatorBox, ValidatorError, ValidatorRegistry};
pub use graph::{GraphBuild, GraphBuilder, GraphError, GraphNode, ImportGraph, ImportRef, Importer};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, OrchestratorError, ValidateOptions};
pub use registry::{
    ArchitectureNode, GlobPattern, InlineMode, LoadError, MixinDef, MixinRef, Registry,
    RegistryError,
};
pub use report::{
    BatchReport, BatchSummary, CacheStats, CoverageGap, CoverageSummary, CycleReport,
    EdgeViolation, FileReport, FileStatus, ProjectStats, SimilarityViolation,
};
pub use resolver::{
    resolve, ConflictKind, ConflictRecord, ResolveError, ResolveOptions, ResolvedArchitecture,
};
pub use types::{Constraint, ConstraintValue, MatchMode, Severity, Violation, ViolationDiagnostic};
