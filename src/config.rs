//! User configuration (`config.toml`)
//!
//! Every key is optional; missing keys fall back to built-in defaults.
//!
//! ```toml
//! dists_repo = "git://github.com/LuaDist/Repository.git"
//! allow_dists = "source"
//! jobs = 1
//! install_timeout_secs = 1800
//! retries = 3
//! ```

use anyhow::{Context, Result};
use distkit::BackendConfig;
use reconcile::DistPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

pub const DEFAULT_JOBS: usize = 1;
pub const DEFAULT_INSTALL_TIMEOUT_SECS: u64 = 1800;
pub const DEFAULT_RETRIES: u32 = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Repository used when a request names none
    pub dists_repo: Option<String>,
    /// Default dist policy
    pub allow_dists: Option<DistPolicy>,
    /// Parallel installs
    pub jobs: Option<usize>,
    /// Per-package install timeout; 0 disables it
    pub install_timeout_secs: Option<u64>,
    /// Attempts per install on network errors
    pub retries: Option<u32>,
    /// Command that deploys LuaDist into a fresh environment
    pub bootstrap_command: Option<String>,
    /// Installed-dist registry, relative to `<env>/LuaDist`
    pub registry_dir: Option<String>,
    /// git executable
    pub git: Option<String>,
}

impl Config {
    /// Load the user config, or defaults when there is none
    pub fn load() -> Result<Self> {
        let path = paths::config_file()?;
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Settings for the LuaDist backend
    pub fn backend_config(&self) -> Result<BackendConfig> {
        let mut backend = BackendConfig {
            cache_dir: paths::repo_cache_dir()?,
            ..BackendConfig::default()
        };
        if let Some(command) = &self.bootstrap_command {
            backend.bootstrap_command = command.clone();
        }
        if let Some(dir) = &self.registry_dir {
            backend.registry_dir = PathBuf::from(dir);
        }
        if let Some(git) = &self.git {
            backend.git = git.clone();
        }
        Ok(backend)
    }
}
