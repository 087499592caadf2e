//! # arch-warden-graph
//!
//! Default import graph builder for arch-warden: gitignore-aware file
//! discovery, line-based multi-language import scanning, project-local
//! specifier resolution, reverse-edge indexing, and cycle detection.
//!
//! The orchestrator consumes the graph through the interface in
//! `arch-warden-core`; this crate is one implementation of it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod scanner;

pub use builder::DefaultGraphBuilder;
pub use scanner::{ImportScanner, Language, RawImport};
