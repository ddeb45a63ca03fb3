//! # distkit
//!
//! Pure Rust library for driving LuaDist deployments.
//!
//! This crate provides functionality for:
//! - Deploying LuaDist into a directory (bootstrap)
//! - Reading the installed-dist registry of a deployment
//! - Reading repository manifests, cloning remote repositories with git
//! - Installing dists with retry on transient network errors
//!
//! ## Example
//!
//! ```no_run
//! use distkit::{BackendConfig, Client, InstallOptions};
//! use std::path::Path;
//!
//! let client = Client::new(BackendConfig::default());
//! let env = Path::new("/opt/lua");
//!
//! client.ensure_environment(env).expect("bootstrap failed");
//! for dist in client.list_installed(env).expect("unreadable registry") {
//!     println!("{} ({})", dist.name, dist.dist_type);
//! }
//!
//! let repo = distkit::DEFAULT_REPOSITORY;
//! client
//!     .install_with_retry(env, "md5", repo, &InstallOptions::default())
//!     .expect("install failed");
//! ```

pub mod backend;
pub mod error;
pub mod lua;
pub mod manifest;
pub mod process;
pub mod repo;
pub mod retry;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use manifest::Manifest;
pub use types::{
    BackendConfig, DEFAULT_BOOTSTRAP_COMMAND, DEFAULT_REGISTRY_DIR, DEFAULT_REPOSITORY, Dist,
    DistType, InstallOptions, InstalledDist, RetryConfig,
};

use backend::{Backend, luadist::LuaDistBackend};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// High-level client for LuaDist operations.
///
/// Repository manifests are loaded once per client and shared between
/// lookups; the installed registry is read fresh on every call.
pub struct Client {
    backend: Box<dyn Backend>,
    retry: RetryConfig,
    manifests: Mutex<HashMap<String, CachedManifest>>,
}

/// Outcome of the first load of a repository's manifest
type CachedManifest = std::result::Result<Arc<Manifest>, String>;

impl Client {
    /// Create a client backed by the real `luadist` executable.
    pub fn new(config: BackendConfig) -> Self {
        Self::with_backend(Box::new(LuaDistBackend::new(config)))
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            retry: RetryConfig::default(),
            manifests: Mutex::new(HashMap::new()),
        }
    }

    /// Set the retry policy used by [`install_with_retry`](Self::install_with_retry).
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    // =========================================================================
    // Deployment
    // =========================================================================

    /// Check if `env` holds a LuaDist deployment.
    pub fn is_deployed(&self, env: &Path) -> bool {
        self.backend.is_deployed(env)
    }

    /// Deploy LuaDist into `env` unless it is already there.
    ///
    /// Returns `true` when a deployment was created.
    pub fn ensure_environment(&self, env: &Path) -> Result<bool> {
        if self.backend.is_deployed(env) {
            return Ok(false);
        }
        self.backend.bootstrap(env)?;
        Ok(true)
    }

    /// List dists installed in `env`.
    pub fn list_installed(&self, env: &Path) -> Result<Vec<InstalledDist>> {
        self.backend.list_installed(env)
    }

    // =========================================================================
    // Repository
    // =========================================================================

    /// Manifest of `repo`, loaded on first use.
    ///
    /// A failed load is remembered too: later lookups against the same
    /// repository fail with [`Error::RepositoryUnavailable`] instead of
    /// fetching again.
    pub fn manifest(&self, repo: &str) -> Result<Arc<Manifest>> {
        let mut cache = self.manifests.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache.get(repo) {
            return cached.clone().map_err(|message| Error::RepositoryUnavailable {
                repo: repo.to_string(),
                message,
            });
        }
        match self.backend.manifest(repo) {
            Ok(manifest) => {
                let manifest = Arc::new(manifest);
                cache.insert(repo.to_string(), Ok(Arc::clone(&manifest)));
                Ok(manifest)
            }
            Err(e) => {
                let message = match &e {
                    Error::RepositoryUnavailable { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                cache.insert(repo.to_string(), Err(message));
                Err(e)
            }
        }
    }

    /// Distribution types `repo` publishes for `name`.
    ///
    /// Returns [`Error::NotFound`] when the repository has no such dist.
    pub fn available_types(&self, repo: &str, name: &str) -> Result<Vec<DistType>> {
        let types = self.manifest(repo)?.available_types(name);
        if types.is_empty() {
            return Err(Error::NotFound {
                name: name.to_string(),
            });
        }
        Ok(types)
    }

    // =========================================================================
    // Install
    // =========================================================================

    /// Install a dist, retrying transient network failures.
    pub fn install_with_retry(
        &self,
        env: &Path,
        name: &str,
        repo: &str,
        options: &InstallOptions,
    ) -> Result<()> {
        retry::with_retry(&self.retry, Some(&retry::LogCallback), || {
            self.backend.install(env, name, repo, options)
        })
    }

    /// Command line an install would run.
    pub fn install_command(
        &self,
        env: &Path,
        name: &str,
        repo: &str,
        options: &InstallOptions,
    ) -> String {
        self.backend.install_command(env, name, repo, options)
    }
}
