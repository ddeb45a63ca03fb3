//! Installer driver - runs the planned installs with partial-failure semantics

use crate::context::ProgressCallback;
use crate::error::{Error, ManagerError, Result};
use crate::filter::DistPolicy;
use crate::manager::{InstallRequest, PackageManager};
use crate::types::{ExecuteOptions, FailureReason, InstallOutcome, PackageName};
use rayon::prelude::*;
use std::fs;
use std::path::Path;

/// What the driver did during one pass
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    /// Outcome per package, in plan order
    pub results: Vec<(PackageName, InstallOutcome)>,
    /// Whether the environment had to be created
    pub environment_created: bool,
    /// External invocations, for reporting
    pub commands: Vec<String>,
}

/// Install every package in `to_install` into `env_dir`.
///
/// The environment is prepared first; if that fails nothing is installed and
/// the pass aborts. After that each install is independent: a failed package
/// is recorded and the driver moves on. An empty list returns immediately
/// without touching the filesystem.
pub fn install<P: ProgressCallback + ?Sized>(
    manager: &dyn PackageManager,
    env_dir: &Path,
    to_install: &[PackageName],
    repo: &str,
    policy: DistPolicy,
    opts: &ExecuteOptions,
    progress: &P,
) -> Result<InstallReport> {
    if to_install.is_empty() {
        return Ok(InstallReport::default());
    }

    let environment_created = prepare(manager, env_dir)?;

    let requests: Vec<InstallRequest<'_>> = to_install
        .iter()
        .map(|package| InstallRequest {
            package,
            env_dir,
            repo,
            policy,
            timeout: opts.install_timeout,
        })
        .collect();
    let commands = requests
        .iter()
        .map(|r| manager.describe_install(r))
        .collect();

    progress.on_batch_start(requests.len());

    let outcomes: Vec<InstallOutcome> = if opts.jobs <= 1 || requests.len() == 1 {
        requests
            .iter()
            .map(|r| install_one(manager, r, progress))
            .collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(opts.jobs)
            .build()
            .map_err(|e| Error::ThreadPool(e.to_string()))?;

        // Indexed collect keeps plan order regardless of completion order
        pool.install(|| {
            requests
                .par_iter()
                .map(|r| install_one(manager, r, progress))
                .collect::<Vec<_>>()
        })
    };

    progress.on_batch_complete();

    Ok(InstallReport {
        results: to_install.iter().cloned().zip(outcomes).collect(),
        environment_created,
        commands,
    })
}

/// Make sure the environment directory exists and is ready
fn prepare(manager: &dyn PackageManager, env_dir: &Path) -> Result<bool> {
    let setup_failed = |message: String| Error::EnvironmentSetupFailed {
        path: env_dir.to_path_buf(),
        message,
    };

    if !env_dir.is_absolute() {
        return Err(setup_failed("path is not absolute".to_string()));
    }

    let existed = env_dir.is_dir();
    fs::create_dir_all(env_dir).map_err(|e| setup_failed(e.to_string()))?;

    let bootstrapped = manager
        .prepare_environment(env_dir)
        .map_err(|e| setup_failed(e.to_string()))?;

    if bootstrapped {
        log::info!("Prepared environment {}", env_dir.display());
    }
    Ok(!existed || bootstrapped)
}

/// Run a single install and translate the manager's answer
fn install_one<P: ProgressCallback + ?Sized>(
    manager: &dyn PackageManager,
    request: &InstallRequest<'_>,
    progress: &P,
) -> InstallOutcome {
    let package = request.package;
    progress.on_install_start(package);

    let outcome = match manager.install(request) {
        Ok(()) => {
            log::info!("{package}: installed");
            InstallOutcome::Success
        }
        Err(ManagerError::Timeout(after)) => {
            log::warn!("{package}: install timed out after {}s", after.as_secs());
            InstallOutcome::Failed(FailureReason::Timeout { after })
        }
        Err(ManagerError::NotFound(_)) => {
            log::warn!("{package}: not found during install");
            InstallOutcome::Failed(FailureReason::NotFound)
        }
        Err(ManagerError::Failed(message)) => {
            log::warn!("{package}: install failed: {message}");
            InstallOutcome::Failed(FailureReason::InstallFailed { message })
        }
    };

    progress.on_install_complete(package, &outcome);
    outcome
}
