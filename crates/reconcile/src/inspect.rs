//! Environment inspector - reads what an environment currently holds

use crate::error::{Error, Result};
use crate::manager::PackageManager;
use crate::types::CurrentState;
use std::path::Path;

/// Determine which packages are installed in `env_dir`.
///
/// A directory that does not exist yet is a valid empty environment. A path
/// that exists but is not a directory, or whose registry the manager cannot
/// read, aborts the pass.
pub fn inspect(manager: &dyn PackageManager, env_dir: &Path) -> Result<CurrentState> {
    if !env_dir.exists() {
        log::debug!(
            "Environment {} does not exist yet, nothing installed",
            env_dir.display()
        );
        return Ok(CurrentState::default());
    }

    if !env_dir.is_dir() {
        return Err(Error::EnvironmentUnreadable {
            path: env_dir.to_path_buf(),
            message: "path exists but is not a directory".to_string(),
        });
    }

    let packages = manager
        .installed(env_dir)
        .map_err(|e| Error::EnvironmentUnreadable {
            path: env_dir.to_path_buf(),
            message: e.to_string(),
        })?;

    log::debug!(
        "Found {} installed packages in {}",
        packages.len(),
        env_dir.display()
    );
    Ok(CurrentState::new(packages))
}
