//! CLI argument parsing using clap derive API
//!
//! Purely declarative: no I/O happens here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use gridrun_core::config::DeployOverrides;

/// gridrun -- deploy a browser grid to Kubernetes, run the test job and
/// collect its report.
///
/// Without a subcommand the full deployment pipeline runs.
#[derive(Parser, Debug)]
#[command(name = "gridrun", version, about, long_about = None)]
pub struct Cli {
    /// Path to gridrun.toml (default: ./gridrun.toml when present).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format for the final summary.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(flatten)]
    pub deploy: DeployArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- deploy ----

/// Deployment flags.
#[derive(Args, Debug, Default)]
pub struct DeployArgs {
    /// Number of browser nodes; clamped into 1..=5.
    #[arg(long, allow_negative_numbers = true)]
    pub node_count: Option<i64>,

    /// Directory holding the Kubernetes manifests.
    #[arg(long)]
    pub manifests_dir: Option<PathBuf>,

    /// Directory receiving the test report.
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Namespace for every resource of the run.
    #[arg(long)]
    pub namespace: Option<String>,

    /// Delete the namespace and exit instead of deploying.
    #[arg(long)]
    pub cleanup: bool,
}

impl DeployArgs {
    pub fn overrides(&self) -> DeployOverrides {
        DeployOverrides {
            node_count: self.node_count,
            manifests_dir: self.manifests_dir.clone(),
            report_dir: self.report_dir.clone(),
            namespace: self.namespace.clone(),
        }
    }
}

// ---- config ----

/// Manage gridrun configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only one section (general, cluster, grid, readiness, job, report).
        #[arg(long)]
        section: Option<String>,
    },
}
