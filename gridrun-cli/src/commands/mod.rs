//! Command handlers -- one module per entry point

pub mod config;
pub mod deploy;
pub mod teardown;

use std::path::{Path, PathBuf};

use tracing::debug;

use gridrun_core::config::GridrunConfig;

use crate::error::CliError;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "gridrun.toml";

/// Resolves which config file, if any, should be loaded.
///
/// An explicit path is always used (and must exist). Otherwise
/// `gridrun.toml` is used when present.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.is_file().then_some(default)
        }
    }
}

/// Loads the effective configuration: file (if any) + env overrides + defaults.
pub async fn load_config(path: Option<&Path>) -> Result<GridrunConfig, CliError> {
    let config = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config file");
            GridrunConfig::load(path).await?
        }
        None => {
            debug!("no config file, using defaults and environment");
            GridrunConfig::from_env()?
        }
    };
    Ok(config)
}

/// Human-readable source label for reports.
pub fn source_label(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults + environment)".to_owned())
}
