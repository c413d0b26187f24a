//! Subcommands of the `cdset` binary.

pub mod config;
pub mod extract;
pub mod inspect;
pub mod rules;

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use tracing::debug;

use cdset_core::CdsConfig;

/// Report format shared by the commands that print records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    Text,
    /// JSON report
    Json,
}

/// Default configuration location: `<config_dir>/cdset/config.json`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cdset")
        .join("config.json")
}

/// The `--config` path if given, else the default location.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load the configuration. An explicit path must exist; a missing default
/// file means built-in defaults.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<CdsConfig> {
    let path = config_path(explicit);
    if explicit.is_some() || path.exists() {
        debug!("Loading config from {}", path.display());
        return CdsConfig::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path.display(), e));
    }
    Ok(CdsConfig::default())
}

/// File name of `path` for display.
pub fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}
