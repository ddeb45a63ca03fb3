//! Path resolution for distenv
//!
//! # Environment Variables
//!
//! - `DISTENV_CONFIG_DIR` - Override config directory
//! - `DISTENV_CACHE_DIR` - Override cache directory (repository clones)
//!
//! For config_dir():
//! 1. `DISTENV_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/distenv` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\distenv`
//!    - macOS/Linux: `~/.config/distenv`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "DISTENV_CONFIG_DIR";

/// Environment variable for cache directory override
pub const ENV_CACHE_DIR: &str = "DISTENV_CACHE_DIR";

/// Get the distenv config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!("Using config dir from {ENV_CONFIG_DIR}: {}", path.display());
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("distenv");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join("distenv");
            log::debug!("Using Windows config dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("distenv");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Path of the config file
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Directory where remote repositories are cloned
pub fn repo_cache_dir() -> Result<PathBuf> {
    let base = match std::env::var(ENV_CACHE_DIR) {
        Ok(dir) => expand(&dir),
        Err(_) => dirs::cache_dir()
            .context("Could not determine cache directory")?
            .join("distenv"),
    };
    Ok(base.join("repos"))
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

/// Expand a path that came in as a `PathBuf`
pub fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => expand(s),
        None => path.to_path_buf(),
    }
}
