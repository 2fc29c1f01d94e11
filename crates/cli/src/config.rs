//! User configuration for rdiff-prune
//!
//! Config is read from `$RDIFF_PRUNE_CONFIG` if set, otherwise from
//! `~/.config/rdiff-prune/config.toml` (Linux) or the platform's config
//! directory. A missing file means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::commit::DEFAULT_SPACE_MARGIN;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PruneConfig {
    /// Plan review settings
    pub review: ReviewConfig,

    /// Metadata installation settings
    pub install: InstallConfig,
}

/// Plan review settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Command used to page the plan listing (default: print it)
    pub pager: Option<String>,

    /// Also list mirror and increment entries to be removed (default: true)
    pub show_removals: bool,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            pager: None,
            show_removals: true,
        }
    }
}

/// Metadata installation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Headroom required on top of kept backups, in bytes (default: 10 MiB)
    pub space_margin_bytes: u64,

    /// gzip level for recompressed metadata (default: 6)
    pub compression_level: u32,

    /// Rewrite metadata files on all cores (default: true)
    pub parallel_rewrite: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            space_margin_bytes: DEFAULT_SPACE_MARGIN,
            compression_level: 6,
            parallel_rewrite: true,
        }
    }
}

impl PruneConfig {
    /// Pager to use: `RDIFF_PRUNE_PAGER`, then `PAGER`, then the config file
    ///
    /// An empty variable disables paging.
    pub fn pager(&self) -> Option<String> {
        let from_env = std::env::var("RDIFF_PRUNE_PAGER").or_else(|_| std::env::var("PAGER"));
        match from_env {
            Ok(value) => Some(value).filter(|v| !v.trim().is_empty()),
            Err(_) => self.review.pager.clone(),
        }
    }
}

/// Get the config file path
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("RDIFF_PRUNE_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|c| c.join("rdiff-prune").join("config.toml"))
}

/// Load configuration from the default location
pub fn load() -> Result<PruneConfig> {
    match config_file_path() {
        Some(path) => load_from(&path),
        None => {
            tracing::debug!("Could not determine config directory, using defaults");
            Ok(PruneConfig::default())
        }
    }
}

/// Load configuration from `path`, falling back to defaults if it is absent
pub fn load_from(path: &Path) -> Result<PruneConfig> {
    if !path.exists() {
        tracing::debug!("Config not found at {}, using defaults", path.display());
        return Ok(PruneConfig::default());
    }

    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read config at {}", path.display()))?;
    let config: PruneConfig =
        toml::from_str(&content).with_context(|| format!("Failed to parse config at {}", path.display()))?;

    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}
