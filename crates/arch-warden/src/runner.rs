//! Internal runner for `enforce!()` macro integration.
//!
//! This module is `#[doc(hidden)]` and not part of the public API.
//! It is called by the generated test function from `arch_warden::enforce!()`.

use arch_warden_core::{
    Orchestrator, OrchestratorError, Registry, Severity, ValidateOptions,
};
use arch_warden_graph::DefaultGraphBuilder;
use arch_warden_rules::{
    standard_registry, DefaultCoverageValidator, DefaultSimilarityAnalyzer, LayerBoundary,
    PackageBoundary,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Config file names to search for, in priority order.
const CONFIG_CANDIDATES: &[&str] = &["arch-warden.toml", ".arch-warden.toml"];

/// Run settings read from the same TOML file as the registry.
#[derive(Debug, Default, Deserialize)]
struct RunSettings {
    #[serde(default)]
    fail_on: Option<String>,
    #[serde(default)]
    validate: ValidateSettings,
}

/// The `[validate]` table.
#[derive(Debug, Default, Deserialize)]
struct ValidateSettings {
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    arch_ignore: Vec<String>,
    #[serde(default)]
    skip_rules: Vec<String>,
}

/// Builds an orchestrator wired to every default collaborator: the graph
/// builder, the standard rule validators, and the package/layer/coverage/
/// similarity checks.
///
/// # Errors
///
/// Returns an error if the orchestrator cannot be assembled.
pub fn default_orchestrator(
    root: impl Into<PathBuf>,
    registry: Arc<Registry>,
) -> Result<Orchestrator, OrchestratorError> {
    Orchestrator::builder()
        .root(root)
        .registry(registry)
        .validators(Arc::new(standard_registry()))
        .graph_builder(Arc::new(DefaultGraphBuilder::new()))
        .package_boundary(Arc::new(PackageBoundary::new()))
        .layer_boundary(Arc::new(LayerBoundary::new()))
        .coverage(Arc::new(DefaultCoverageValidator::new()))
        .similarity(Arc::new(DefaultSimilarityAnalyzer::new()))
        .build()
}

/// Runs whole-project validation as part of `cargo test`.
///
/// Called by the `enforce!()` macro-generated test function.
/// Panics with a formatted report if findings at or above the `fail_on`
/// severity exist.
///
/// # Panics
///
/// Panics on findings, on registry errors, or if the pipeline cannot run.
pub fn run_enforce(config_path: Option<&str>, fail_on: Option<&str>) {
    let root = find_project_root();
    let content = read_config_content(&root, config_path);

    let registry = if content.is_empty() {
        Registry::default()
    } else {
        Registry::from_toml_str(&content)
            .unwrap_or_else(|e| panic!("arch-warden: registry error: {e}"))
    };
    let settings: RunSettings = if content.is_empty() {
        RunSettings::default()
    } else {
        toml::from_str(&content)
            .unwrap_or_else(|e| panic!("arch-warden: failed to parse settings: {e}"))
    };
    let effective_fail_on = resolve_fail_on(fail_on, &settings);

    let orchestrator = default_orchestrator(&root, Arc::new(registry))
        .unwrap_or_else(|e| panic!("arch-warden: failed to build orchestrator: {e}"));
    let options = ValidateOptions {
        include: settings.validate.include,
        exclude: settings.validate.exclude,
        arch_ignore: settings.validate.arch_ignore,
        skip_rules: settings.validate.skip_rules,
        ..ValidateOptions::default()
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| panic!("arch-warden: failed to start runtime: {e}"));
    let report = runtime
        .block_on(orchestrator.validate_project(&options))
        .unwrap_or_else(|e| panic!("arch-warden: validation failed: {e}"));

    if report.has_findings_at(effective_fail_on) {
        panic!("{}", report.format_report());
    }
}

/// Reads the raw TOML content from the config file.
///
/// Returns an empty string if no config file is found.
fn read_config_content(root: &Path, explicit_path: Option<&str>) -> String {
    if let Some(path) = explicit_path {
        let full_path = if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            root.join(path)
        };
        return std::fs::read_to_string(&full_path).unwrap_or_else(|e| {
            panic!(
                "arch-warden: failed to read config from {}: {e}",
                full_path.display()
            );
        });
    }

    for candidate in CONFIG_CANDIDATES {
        let path = root.join(candidate);
        if path.exists() {
            return std::fs::read_to_string(&path).unwrap_or_else(|e| {
                panic!(
                    "arch-warden: failed to read config from {}: {e}",
                    path.display()
                );
            });
        }
    }

    String::new()
}

/// Checks whether a `Cargo.toml` file defines a `[workspace]` section
/// by parsing as TOML, avoiding false positives from comments or strings.
fn has_workspace_section(cargo_toml: &Path) -> bool {
    let Ok(content) = std::fs::read_to_string(cargo_toml) else {
        return false;
    };
    let Ok(table) = content.parse::<toml::Table>() else {
        return false;
    };
    table.contains_key("workspace")
}

/// Finds the project root by looking for `Cargo.toml` from `CARGO_MANIFEST_DIR`.
fn find_project_root() -> PathBuf {
    // CARGO_MANIFEST_DIR points to the crate containing the test,
    // which may be a workspace member. Walk up to find workspace root.
    if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
        let manifest_path = PathBuf::from(&manifest_dir);

        let mut candidate = manifest_path.as_path();
        loop {
            let cargo_toml = candidate.join("Cargo.toml");
            if cargo_toml.exists() && has_workspace_section(&cargo_toml) {
                return candidate.to_path_buf();
            }
            match candidate.parent() {
                Some(parent) => candidate = parent,
                None => break,
            }
        }

        // No workspace root found, use manifest dir itself
        return manifest_path;
    }

    // Fallback: current directory
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Resolves the effective `fail_on` severity from macro arg > config > default.
fn resolve_fail_on(macro_arg: Option<&str>, settings: &RunSettings) -> Severity {
    let name = macro_arg
        .or(settings.fail_on.as_deref())
        .unwrap_or("error");

    match name {
        "error" => Severity::Error,
        "warning" => Severity::Warning,
        other => {
            panic!("arch-warden: unknown severity `{other}`. Valid values: error, warning")
        }
    }
}
