//! arch-warden CLI tool.
//!
//! Usage:
//! ```bash
//! arch-warden check [OPTIONS] [PATH]
//! arch-warden list-rules
//! arch-warden init
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Architecture governance for multi-language codebases
#[derive(Parser)]
#[command(name = "arch-warden")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the registry file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a project against its architecture registry
    Check {
        /// Project root to validate (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Validate only these files (relative to the project root)
        #[arg(long)]
        files: Vec<PathBuf>,

        /// Skip specific rules (comma-separated rule names)
        #[arg(long)]
        skip_rules: Option<String>,

        /// Exclude patterns (can be specified multiple times)
        #[arg(short, long)]
        exclude: Vec<String>,
    },

    /// List the built-in rule validators
    ListRules,

    /// Write a starter registry file
    Init {
        /// Overwrite an existing registry
        #[arg(long)]
        force: bool,
    },
}

/// Output format for validation reports.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One-line-per-violation compact format.
    Compact,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Check {
            path,
            format,
            files,
            skip_rules,
            exclude,
        } => commands::check::run(
            &path,
            format,
            &files,
            skip_rules,
            exclude,
            cli.config.as_deref(),
        ),
        Commands::ListRules => {
            commands::list_rules::run();
            Ok(())
        }
        Commands::Init { force } => commands::init::run(force),
    }
}
