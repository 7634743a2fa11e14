//! Configuration loading and root folder resolution
//!
//! The root folder is resolved in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. OS-dependent compiled default (fallback)
//!
//! Service settings live in `<root>/config.toml`, loaded separately by
//! [`load_toml_config`]. A missing TOML file is never fatal: a warning is
//! logged and defaults apply.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "PROCURA_ROOT_FOLDER";

/// Logging configuration (`[logging]` table)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolve the root folder holding the database and TOML file
///
/// The CLI argument wins over the environment variable, which wins over the
/// OS default.
pub fn resolve_root_folder(cli_arg: Option<&Path>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        info!("Root folder: {} (from command line)", path.display());
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            info!("Root folder: {} (from {})", path, env_var_name);
            return PathBuf::from(path);
        }
    }

    // Priority 3: OS-dependent compiled default
    let folder = default_root_folder();
    info!("Root folder: {} (compiled default)", folder.display());
    folder
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/procura (or /var/lib/procura for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("procura"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/procura"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("procura"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/procura"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("procura"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\procura"))
    } else {
        PathBuf::from("./procura_data")
    }
}

/// Create the root folder if it does not exist yet
pub fn ensure_root_folder(root: &Path) -> Result<()> {
    if !root.exists() {
        std::fs::create_dir_all(root)?;
        info!("Created root folder: {}", root.display());
    }
    Ok(())
}

/// Load a TOML configuration file into `T`
///
/// A missing file yields `T::default()` with a warning. A file that exists
/// but cannot be parsed is a configuration error.
pub fn load_toml_config<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded TOML configuration from {}", path.display());
    Ok(config)
}
