//! Core types for LuaDist deployments.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default repository used by LuaDist itself.
pub const DEFAULT_REPOSITORY: &str = "git://github.com/LuaDist/Repository.git";

/// Default bootstrap command for a fresh deployment.
pub const DEFAULT_BOOTSTRAP_COMMAND: &str = "curl -fksSL https://tinyurl.com/luadist | bash";

/// Default location of the installed-dist registry, relative to the deployment.
pub const DEFAULT_REGISTRY_DIR: &str = "share/luadist-git/dists";

/// How a dist is distributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistType {
    /// Built from source on install
    Source,
    /// Prebuilt for a platform
    Binary,
}

impl DistType {
    /// Classify a dist by the `type` field of its metadata.
    ///
    /// LuaDist writes `"source"` for source dists and a platform tag such as
    /// `"Linux-x86_64"` for binaries.
    pub fn from_field(value: Option<&str>) -> Self {
        match value {
            Some(t) if t.eq_ignore_ascii_case("source") => DistType::Source,
            Some(_) => DistType::Binary,
            None => DistType::Source,
        }
    }
}

impl std::fmt::Display for DistType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistType::Source => write!(f, "source"),
            DistType::Binary => write!(f, "binary"),
        }
    }
}

/// A dist advertised by a repository manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dist {
    /// Dist name (e.g., "luasocket")
    pub name: String,
    /// Version string as published
    pub version: String,
    /// Target architecture ("Universal" for source dists)
    pub arch: String,
    /// Raw `type` field
    pub platform: String,
}

impl Dist {
    /// Distribution type derived from the platform field.
    pub fn dist_type(&self) -> DistType {
        DistType::from_field(Some(&self.platform))
    }
}

/// A dist installed in a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledDist {
    /// Dist name
    pub name: String,
    /// Installed version, when the registry records one
    pub version: Option<String>,
    /// How it was installed
    pub dist_type: DistType,
}

/// Which dist types an install may pick from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOptions {
    /// Allow source dists (`-source=`)
    pub allow_source: bool,
    /// Allow binary dists (`-binary=`)
    pub allow_binary: bool,
    /// Kill the install after this long
    pub timeout: Option<Duration>,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            allow_source: true,
            allow_binary: true,
            timeout: None,
        }
    }
}

/// Settings for the LuaDist CLI backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Shell command that deploys LuaDist into the working directory
    pub bootstrap_command: String,
    /// Registry directory relative to `<env>/LuaDist`
    pub registry_dir: PathBuf,
    /// Git executable used for remote repositories
    pub git: String,
    /// Where remote repositories are cloned
    pub cache_dir: PathBuf,
}

impl Default for BackendConfig {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("distenv")
            .join("repos");
        Self {
            bootstrap_command: DEFAULT_BOOTSTRAP_COMMAND.to_string(),
            registry_dir: PathBuf::from(DEFAULT_REGISTRY_DIR),
            git: "git".to_string(),
            cache_dir,
        }
    }
}

/// Configuration for retry logic.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(120),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings.
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_factor,
            ..Default::default()
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}
