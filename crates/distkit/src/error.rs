//! Error types for LuaDist operations.
//!
//! Errors are categorized to enable smart retry logic and appropriate
//! user feedback. Output from the `luadist` tool is classified into the same
//! categories so callers never have to parse it themselves.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Categories of LuaDist errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network-related errors (transient, retryable)
    Network,
    /// Package not found in the repository
    NotFound,
    /// Permission denied on the deployment directory
    Permission,
    /// The command ran out of time
    Timeout,
    /// No LuaDist deployment at the given path
    NotDeployed,
    /// Malformed manifest or registry entry
    Parse,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::NotFound => "Package not found",
            Self::Permission => "Permission denied",
            Self::Timeout => "Timed out",
            Self::NotDeployed => "LuaDist not deployed",
            Self::Parse => "Malformed metadata",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your internet connection and try again",
            Self::NotFound => "Make sure the package exists in the configured repository",
            Self::Permission => "Check directory permissions of the environment",
            Self::Timeout => "Raise the install timeout or check for a stuck build",
            Self::NotDeployed => "Run an install to bootstrap the environment",
            Self::Parse => "Inspect the reported file for syntax errors",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur during LuaDist operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network-related error (fetch, clone, DNS, etc.)
    #[error("network error: {message}")]
    Network {
        /// Detailed error message from the failed network operation
        message: String,
    },

    /// Package not found in the repository
    #[error("package not found: {name}")]
    NotFound {
        /// Name of the package that could not be found
        name: String,
    },

    /// Permission denied
    #[error("permission denied: {message}")]
    Permission {
        /// Details about what permission was denied
        message: String,
    },

    /// Command exceeded its time limit and was killed
    #[error("timed out after {}s", after.as_secs())]
    Timeout {
        /// Time limit that was exceeded
        after: Duration,
    },

    /// No `luadist` executable in the deployment
    #[error("LuaDist not deployed at {}", .0.display())]
    NotDeployed(PathBuf),

    /// Bootstrapping a deployment failed
    #[error("cannot create LuaDist environment: {message}")]
    BootstrapFailed {
        /// Output of the bootstrap command
        message: String,
    },

    /// Repository could not be fetched or has no manifest
    #[error("repository {repo} unavailable: {message}")]
    RepositoryUnavailable {
        /// Repository location as given
        repo: String,
        /// What went wrong
        message: String,
    },

    /// Invalid Lua table syntax in a manifest or dist.info
    #[error("invalid syntax in {} at line {line}: {message}", path.display())]
    Parse {
        /// File being parsed (empty when parsing a string)
        path: PathBuf,
        /// Line number where the parse error occurred (1-indexed)
        line: usize,
        /// Description of the syntax error
        message: String,
    },

    /// Command execution failed
    #[error("command failed: {message}")]
    CommandFailed {
        /// Description of what command failed
        message: String,
        /// Output of the failed command
        output: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Get the error category for retry logic.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Network { .. } => ErrorCategory::Network,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Permission { .. } => ErrorCategory::Permission,
            Error::Timeout { .. } => ErrorCategory::Timeout,
            Error::NotDeployed(_) => ErrorCategory::NotDeployed,
            Error::Parse { .. } => ErrorCategory::Parse,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Create an error from `luadist` command output.
    ///
    /// LuaDist prints most diagnostics on stdout, so both streams are
    /// expected to be passed in combined.
    pub fn from_luadist_output(output: &str, package_name: Option<&str>) -> Self {
        let lower = output.to_lowercase();

        // Permission errors
        if lower.contains("permission denied")
            || lower.contains("operation not permitted")
            || lower.contains("cannot write")
            || lower.contains("read-only file system")
        {
            return Error::Permission {
                message: output.trim().to_string(),
            };
        }

        // Not found errors
        if lower.contains("no suitable")
            || lower.contains("not found in")
            || lower.contains("no such package")
            || lower.contains("cannot find package")
            || lower.contains("unknown package")
        {
            return Error::NotFound {
                name: package_name.unwrap_or("unknown").to_string(),
            };
        }

        // Network errors. The output includes build logs, so only phrases
        // that git and curl print for transport failures count.
        if lower.contains("could not resolve host")
            || lower.contains("connection refused")
            || lower.contains("connection timed out")
            || lower.contains("unable to access")
            || lower.contains("failed to fetch")
        {
            return Error::Network {
                message: output.trim().to_string(),
            };
        }

        Error::CommandFailed {
            message: format!(
                "luadist command failed{}",
                package_name
                    .map(|n| format!(" for {n}"))
                    .unwrap_or_default()
            ),
            output: output.trim().to_string(),
        }
    }
}

/// Result type for LuaDist operations.
pub type Result<T> = std::result::Result<T, Error>;
