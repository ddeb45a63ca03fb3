//! Progress callbacks
//!
//! These let the engine report install progress without depending on a
//! particular terminal UI.

use crate::types::{InstallOutcome, PackageName};

/// Progress callback for the installer driver
///
/// Install workers may run in parallel, so callbacks take `&self` and must
/// be `Sync`.
pub trait ProgressCallback: Sync {
    /// Called once before the first install with the number of packages
    fn on_batch_start(&self, count: usize);

    /// Called when an install starts
    fn on_install_start(&self, package: &PackageName);

    /// Called when an install finishes
    fn on_install_complete(&self, package: &PackageName, outcome: &InstallOutcome);

    /// Called after the last install
    fn on_batch_complete(&self);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_batch_start(&self, _count: usize) {}
    fn on_install_start(&self, _package: &PackageName) {}
    fn on_install_complete(&self, _package: &PackageName, _outcome: &InstallOutcome) {}
    fn on_batch_complete(&self) {}
}
