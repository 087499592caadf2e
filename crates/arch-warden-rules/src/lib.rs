//! # arch-warden-rules
//!
//! Built-in rule validators and project-level checks for arch-warden.
//!
//! [`standard_registry`] wires every built-in validator into a dispatch
//! registry; the boundary, coverage, and similarity types implement the
//! collaborator interfaces from `arch-warden-core`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod boundaries;
mod circular;
mod coverage;
mod forbid_import;
mod forbid_pattern;
mod importable_by;
mod limits;
mod require_import;
mod similarity;

pub use boundaries::{LayerBoundary, PackageBoundary};
pub use circular::ForbidCircularImports;
pub use coverage::DefaultCoverageValidator;
pub use forbid_import::ForbidImport;
pub use forbid_pattern::ForbidPattern;
pub use importable_by::ImportableBy;
pub use limits::{MaxImports, MaxLines};
pub use require_import::RequireImport;
pub use similarity::DefaultSimilarityAnalyzer;

use arch_warden_core::ValidatorRegistry;

/// Builds a dispatch registry containing every built-in rule validator.
#[must_use]
pub fn standard_registry() -> ValidatorRegistry {
    ValidatorRegistry::new()
        .with(ForbidImport::new())
        .with(RequireImport::new())
        .with(ForbidPattern::new())
        .with(MaxLines::new())
        .with(MaxImports::new())
        .with(ForbidCircularImports::new())
        .with(ImportableBy::new())
}
