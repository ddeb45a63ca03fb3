//! Boundary to the external package manager
//!
//! The engine never touches an environment's registry directly. Everything it
//! knows about installed packages, repository contents and installs comes
//! through this trait, which keeps the core testable with in-memory fakes.

use crate::error::ManagerError;
use crate::filter::DistPolicy;
use crate::types::{DistributionKind, InstalledPackage, PackageName};
use std::path::Path;
use std::time::Duration;

/// A single install invocation
#[derive(Debug, Clone, Copy)]
pub struct InstallRequest<'a> {
    pub package: &'a PackageName,
    pub env_dir: &'a Path,
    pub repo: &'a str,
    /// Artifact kinds the manager may pick from
    pub policy: DistPolicy,
    pub timeout: Option<Duration>,
}

/// Operations the engine needs from the external package manager.
///
/// Implementations must be safe to call from several install workers at
/// once; the engine does not serialize calls to [`install`](Self::install).
pub trait PackageManager: Send + Sync {
    /// List packages installed in an existing environment directory
    fn installed(&self, env_dir: &Path) -> Result<Vec<InstalledPackage>, ManagerError>;

    /// Artifact kinds the repository offers for a package.
    ///
    /// Returns [`ManagerError::NotFound`] when the package is unknown.
    fn available_kinds(
        &self,
        repo: &str,
        package: &PackageName,
    ) -> Result<Vec<DistributionKind>, ManagerError>;

    /// Make the environment ready to receive installs.
    ///
    /// Returns `true` when something had to be created.
    fn prepare_environment(&self, env_dir: &Path) -> Result<bool, ManagerError>;

    /// Install one package into the environment
    fn install(&self, request: &InstallRequest<'_>) -> Result<(), ManagerError>;

    /// Human-readable command line for an install, used in reports
    fn describe_install(&self, request: &InstallRequest<'_>) -> String {
        format!(
            "install {} into {} from {}",
            request.package,
            request.env_dir.display(),
            request.repo
        )
    }
}
