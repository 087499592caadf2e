//! # arch-warden
//!
//! Declarative architecture governance for multi-language codebases.
//!
//! Source files are classified into named architectures; each architecture's
//! inherited and mixed-in constraints are resolved into one effective rule
//! set; files and whole projects are validated against those rules,
//! including whole-project rules (import cycles, importability, layer and
//! package boundaries, coverage, near-duplicate detection).
//!
//! ## Quick Start: `cargo test` Integration
//!
//! ```toml
//! [dev-dependencies]
//! arch-warden = "0.1"
//! ```
//!
//! ```rust,ignore
//! // tests/architecture.rs
//! arch_warden::enforce!();
//! ```
//!
//! This validates the whole project as part of `cargo test`. Declare
//! architectures and mixins in `arch-warden.toml`.
//!
//! ## Programmatic Usage
//!
//! ```rust,ignore
//! use arch_warden::{default_orchestrator, Registry, ValidateOptions};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(Registry::from_file("arch-warden.toml".as_ref())?);
//! let orchestrator = default_orchestrator("./", registry)?;
//! let report = orchestrator.validate_project(&ValidateOptions::default()).await?;
//! report.has_failures();
//! ```

#![forbid(unsafe_code)]

// Re-export core types and traits
pub use arch_warden_core::*;

// Re-export the enforce macro for arch_warden::enforce!()
pub use arch_warden_macros::enforce;

// Re-export the default graph builder
pub use arch_warden_graph::DefaultGraphBuilder;

/// Built-in rule validators and project-level checks.
pub mod rules_impl {
    pub use arch_warden_rules::*;
}

mod runner;

pub use runner::default_orchestrator;

#[doc(hidden)]
pub mod __internal {
    pub use crate::runner::run_enforce;
}
