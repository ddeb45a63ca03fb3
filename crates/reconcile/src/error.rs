//! Error types for reconciliation.
//!
//! Only request validation and the two environment errors abort a pass.
//! Per-package problems are carried as [`FailureReason`](crate::FailureReason)
//! inside the result instead.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that abort a reconciliation pass.
#[derive(Debug, Error)]
pub enum Error {
    /// The current state of the environment cannot be determined
    #[error("cannot read environment {}: {message}", path.display())]
    EnvironmentUnreadable { path: PathBuf, message: String },

    /// The environment directory cannot be created or prepared
    #[error("cannot set up environment {}: {message}", path.display())]
    EnvironmentSetupFailed { path: PathBuf, message: String },

    /// Unrecognized `allow_dists` value
    #[error("invalid dist policy '{0}' (expected one of: all, source, binary)")]
    InvalidPolicy(String),

    /// Package name rejected at the request boundary
    #[error("invalid package name '{name}': {reason}")]
    InvalidPackageName { name: String, reason: &'static str },

    /// Worker pool could not be built
    #[error("failed to create install thread pool: {0}")]
    ThreadPool(String),
}

/// Errors reported by a [`PackageManager`](crate::PackageManager) implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ManagerError {
    /// The package does not exist in the repository
    #[error("package not found: {0}")]
    NotFound(String),

    /// The operation did not finish in time
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Any other failure reported by the external tool
    #[error("{0}")]
    Failed(String),
}

/// Result type for reconciliation.
pub type Result<T> = std::result::Result<T, Error>;
