//! Check command implementation.

use anyhow::{Context, Result};
use arch_warden_core::{Orchestrator, Registry, ValidateOptions};
use arch_warden_graph::DefaultGraphBuilder;
use arch_warden_rules::{
    standard_registry, DefaultCoverageValidator, DefaultSimilarityAnalyzer, LayerBoundary,
    PackageBoundary,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::OutputFormat;

/// The `[validate]` table of the registry file.
#[derive(Debug, Default, Deserialize)]
struct ValidateSettings {
    #[serde(default)]
    validate: ValidateTable,
}

#[derive(Debug, Default, Deserialize)]
struct ValidateTable {
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    arch_ignore: Vec<String>,
    #[serde(default)]
    skip_rules: Vec<String>,
}

/// Runs the check command.
pub fn run(
    path: &Path,
    format: OutputFormat,
    files: &[PathBuf],
    skip_rules: Option<String>,
    exclude: Vec<String>,
    config: Option<&Path>,
) -> Result<()> {
    let source = crate::config_resolver::resolve(path, config);
    let (registry, mut options) = match source.path() {
        None => (Registry::default(), ValidateOptions::default()),
        Some(p) => {
            if source.is_global() {
                tracing::info!("Using global registry: {}", p.display());
            }
            let content = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read registry: {}", p.display()))?;
            let registry = Registry::from_toml_str(&content)
                .with_context(|| format!("Failed to load registry: {}", p.display()))?;
            let settings: ValidateSettings = toml::from_str(&content)
                .with_context(|| format!("Failed to parse settings: {}", p.display()))?;
            let options = ValidateOptions {
                include: settings.validate.include,
                exclude: settings.validate.exclude,
                arch_ignore: settings.validate.arch_ignore,
                skip_rules: settings.validate.skip_rules,
                ..ValidateOptions::default()
            };
            (registry, options)
        }
    };

    options.exclude.extend(exclude);
    if let Some(skipped) = skip_rules {
        options
            .skip_rules
            .extend(skipped.split(',').map(|s| s.trim().to_string()));
    }

    let root = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let orchestrator = Orchestrator::builder()
        .root(root)
        .registry(Arc::new(registry))
        .validators(Arc::new(standard_registry()))
        .graph_builder(Arc::new(DefaultGraphBuilder::new()))
        .package_boundary(Arc::new(PackageBoundary::new()))
        .layer_boundary(Arc::new(LayerBoundary::new()))
        .coverage(Arc::new(DefaultCoverageValidator::new()))
        .similarity(Arc::new(DefaultSimilarityAnalyzer::new()))
        .build()
        .context("Failed to build orchestrator")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;
    let report = runtime
        .block_on(async {
            if files.is_empty() {
                orchestrator.validate_project(&options).await
            } else {
                orchestrator.validate_files(files, &options).await
            }
        })
        .context("Validation failed")?;

    super::output::print(&report, format)?;

    if report.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}
