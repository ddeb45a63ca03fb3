//! # Reconcile
//!
//! Idempotent reconciliation of a package environment against a desired
//! package list.
//!
//! A pass runs strictly forward:
//!
//! 1. **Inspect** - read what the environment holds ([`inspect()`])
//! 2. **Plan** - classify every desired package as satisfied, rejected,
//!    unavailable or to install ([`planner::plan`])
//! 3. **Install** - drive the external package manager, best effort
//!    ([`executor::install`])
//! 4. **Report** - fold everything into a [`ReconciliationResult`]
//!    ([`report::report`])
//!
//! ## Idempotency
//!
//! A package that is already installed is never touched again, and is never
//! re-checked against the distribution policy. Re-running a successful pass
//! with the same inputs installs nothing and reports `changed == false`.
//!
//! ## Example
//!
//! ```ignore
//! use reconcile::{DesiredState, DistPolicy, Request, reconcile_simple};
//!
//! let request = Request {
//!     env_dir: "/opt/lua".into(),
//!     desired: DesiredState::parse(["md5", "luasocket"])?,
//!     policy: "source".parse::<DistPolicy>()?,
//!     repo: "git://github.com/LuaDist/Repository.git".into(),
//! };
//!
//! let result = reconcile_simple(&my_manager, &request)?;
//! if result.changed {
//!     println!("installed: {:?}", result.installed);
//! }
//! ```
//!
//! The external tool is reached only through the [`PackageManager`] trait,
//! so the engine can be driven by any backend, including in-memory fakes.
//!
//! Concurrent passes against the same environment directory are not
//! coordinated; callers must serialize them.

pub mod context;
pub mod error;
pub mod executor;
pub mod filter;
pub mod inspect;
pub mod manager;
pub mod planner;
pub mod report;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{NoProgress, ProgressCallback};
pub use error::{Error, ManagerError, Result};
pub use executor::InstallReport;
pub use filter::DistPolicy;
pub use inspect::inspect;
pub use manager::{InstallRequest, PackageManager};
pub use planner::Plan;
pub use types::{
    CurrentState, DesiredState, DistributionKind, ExecuteOptions, Failure, FailureReason,
    InstallOutcome, InstalledPackage, PackageName, ReconciliationResult,
};

use std::path::PathBuf;

/// One reconciliation request, already validated
#[derive(Debug, Clone)]
pub struct Request {
    /// Environment directory; must be absolute for installs to proceed
    pub env_dir: PathBuf,
    pub desired: DesiredState,
    pub policy: DistPolicy,
    /// Repository location understood by the package manager
    pub repo: String,
}

/// Run a full reconciliation pass
pub fn reconcile<P: ProgressCallback + ?Sized>(
    manager: &dyn PackageManager,
    request: &Request,
    opts: &ExecuteOptions,
    progress: &P,
) -> Result<ReconciliationResult> {
    let (_, plan) = plan_only(manager, request)?;
    apply_plan(manager, request, &plan, opts, progress)
}

/// Install and report a plan previously built by [`plan_only`].
///
/// Lets a caller show the plan (and ask for confirmation) before anything
/// is installed, without planning twice.
pub fn apply_plan<P: ProgressCallback + ?Sized>(
    manager: &dyn PackageManager,
    request: &Request,
    plan: &Plan,
    opts: &ExecuteOptions,
    progress: &P,
) -> Result<ReconciliationResult> {
    let installs = executor::install(
        manager,
        &request.env_dir,
        &plan.to_install,
        &request.repo,
        request.policy,
        opts,
        progress,
    )?;

    let result = report::report(&request.desired, plan, installs);
    log::info!(
        "Reconciled {} ({} packages): {} installed, {} skipped, {} failed",
        request.env_dir.display(),
        result.total(),
        result.installed.len(),
        result.skipped.len(),
        result.failed.len()
    );
    Ok(result)
}

/// Inspect and plan without installing anything
pub fn plan_only(manager: &dyn PackageManager, request: &Request) -> Result<(CurrentState, Plan)> {
    let current = inspect(manager, &request.env_dir)?;
    let plan = planner::plan(
        &request.desired,
        &current,
        request.policy,
        manager,
        &request.repo,
    );
    Ok((current, plan))
}

/// Reconcile with default options and no progress reporting
pub fn reconcile_simple(
    manager: &dyn PackageManager,
    request: &Request,
) -> Result<ReconciliationResult> {
    reconcile(manager, request, &ExecuteOptions::default(), &NoProgress)
}
