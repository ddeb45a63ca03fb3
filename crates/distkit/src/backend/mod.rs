//! Backend abstraction for LuaDist operations.
//!
//! The [`Backend`] trait is the seam between the [`Client`](crate::Client)
//! and the real `luadist` executable, so tests can substitute an in-memory
//! implementation.

pub mod luadist;

use crate::error::Result;
use crate::manifest::Manifest;
use crate::types::{InstallOptions, InstalledDist};
use std::path::Path;

/// Backend trait for LuaDist operations.
pub trait Backend: Send + Sync {
    /// Whether `env` holds a LuaDist deployment.
    fn is_deployed(&self, env: &Path) -> bool;

    /// Deploy LuaDist into an existing directory.
    fn bootstrap(&self, env: &Path) -> Result<()>;

    /// Dists recorded in the deployment's registry.
    ///
    /// A directory without a deployment has nothing installed.
    fn list_installed(&self, env: &Path) -> Result<Vec<InstalledDist>>;

    /// Load the manifest of a repository.
    fn manifest(&self, repo: &str) -> Result<Manifest>;

    /// Install one dist into the deployment.
    fn install(&self, env: &Path, name: &str, repo: &str, options: &InstallOptions) -> Result<()>;

    /// Command line `install` would run, for reporting.
    fn install_command(&self, env: &Path, name: &str, repo: &str, options: &InstallOptions) -> String {
        let mut parts = vec![luadist::luadist_path(env).display().to_string()];
        parts.extend(luadist::install_args(name, repo, options));
        parts.join(" ")
    }
}
