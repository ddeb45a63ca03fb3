//! Core types for package-environment reconciliation

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;

/// Name of a package within a repository.
///
/// Names are opaque and case-sensitive. They are validated once at the
/// request boundary so the rest of the engine can pass them to the external
/// tool without re-checking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageName(String);

impl PackageName {
    /// Validate and wrap a package name
    pub fn new(name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidPackageName {
                name,
                reason: "name is empty",
            });
        }
        if name.chars().any(char::is_whitespace) {
            return Err(Error::InvalidPackageName {
                name,
                reason: "name contains whitespace",
            });
        }
        // The external tool parses leading dashes as variables (-source=true)
        if name.starts_with('-') {
            return Err(Error::InvalidPackageName {
                name,
                reason: "name starts with '-'",
            });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PackageName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PackageName> for String {
    fn from(name: PackageName) -> Self {
        name.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How a package artifact is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionKind {
    /// Compiled from source at install time
    Source,
    /// Pre-built for a platform
    Binary,
}

impl fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Binary => f.write_str("binary"),
        }
    }
}

/// A package found in an environment's registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub name: PackageName,
    pub kind: DistributionKind,
    /// Informational only; presence is matched by name
    pub version: Option<String>,
}

impl InstalledPackage {
    pub fn new(name: PackageName, kind: DistributionKind) -> Self {
        Self {
            name,
            kind,
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Snapshot of what an environment currently holds.
///
/// Built fresh by the inspector on every pass and dropped at the end of it.
#[derive(Debug, Clone, Default)]
pub struct CurrentState {
    packages: HashMap<PackageName, InstalledPackage>,
}

impl CurrentState {
    pub fn new(packages: impl IntoIterator<Item = InstalledPackage>) -> Self {
        Self {
            packages: packages
                .into_iter()
                .map(|p| (p.name.clone(), p))
                .collect(),
        }
    }

    pub fn contains(&self, name: &PackageName) -> bool {
        self.packages.contains_key(name)
    }

    pub fn get(&self, name: &PackageName) -> Option<&InstalledPackage> {
        self.packages.get(name)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Installed packages sorted by name
    pub fn sorted(&self) -> Vec<&InstalledPackage> {
        let mut packages: Vec<_> = self.packages.values().collect();
        packages.sort_by(|a, b| a.name.cmp(&b.name));
        packages
    }
}

/// Ordered list of packages requested for one pass.
///
/// Duplicates are collapsed keeping the first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredState {
    packages: Vec<PackageName>,
}

impl DesiredState {
    pub fn new(packages: impl IntoIterator<Item = PackageName>) -> Self {
        let mut seen = HashSet::new();
        let packages = packages
            .into_iter()
            .filter(|p| seen.insert(p.clone()))
            .collect();
        Self { packages }
    }

    /// Validate raw names from a request
    pub fn parse<I, S>(names: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let packages = names
            .into_iter()
            .map(PackageName::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(packages))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageName> {
        self.packages.iter()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Why a desired package did not end up installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Every available artifact kind is disallowed by the policy
    PolicyViolation {
        available: Vec<DistributionKind>,
    },
    /// The package does not exist in the repository
    NotFound,
    /// The external install (or the repository lookup) reported failure
    InstallFailed { message: String },
    /// The install exceeded its allotted time
    Timeout { after: Duration },
}

impl FailureReason {
    /// Reason code used in the response record.
    ///
    /// Timeouts report as `InstallFailed`; the detail and the logs keep
    /// them apart.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PolicyViolation { .. } => "PolicyViolation",
            Self::NotFound => "NotFound",
            Self::InstallFailed { .. } | Self::Timeout { .. } => "InstallFailed",
        }
    }

    /// Human-readable detail
    pub fn detail(&self) -> String {
        match self {
            Self::PolicyViolation { available } => {
                let kinds: Vec<String> = available.iter().map(ToString::to_string).collect();
                format!("only {} dists available", kinds.join("/"))
            }
            Self::NotFound => "not found in repository".to_string(),
            Self::InstallFailed { message } => message.clone(),
            Self::Timeout { after } => format!("timed out after {}s", after.as_secs()),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.detail())
    }
}

/// Outcome of a single install invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Success,
    Failed(FailureReason),
}

impl InstallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// A package that could not be installed, with the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub package: PackageName,
    pub reason: FailureReason,
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationResult {
    /// True iff `installed` is non-empty
    pub changed: bool,
    /// Newly installed in this pass, in desired order
    pub installed: Vec<PackageName>,
    /// Already present before this pass, in desired order
    pub skipped: Vec<PackageName>,
    /// Rejected or failed packages, in desired order
    pub failed: Vec<Failure>,
    /// Notes about side effects outside the package list
    pub messages: Vec<String>,
    /// External install invocations performed
    pub commands: Vec<String>,
}

impl ReconciliationResult {
    /// Check if the pass finished without any per-package failure
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Look up the failure reason of a package
    #[cfg(test)]
    pub(crate) fn failure(&self, name: &str) -> Option<&FailureReason> {
        self.failed
            .iter()
            .find(|f| f.package.as_str() == name)
            .map(|f| &f.reason)
    }

    /// Total number of desired packages accounted for
    pub fn total(&self) -> usize {
        self.installed.len() + self.skipped.len() + self.failed.len()
    }
}

/// Options for the installer driver
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Number of parallel install workers
    pub jobs: usize,
    /// Per-package install timeout
    pub install_timeout: Option<Duration>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            install_timeout: None,
        }
    }
}
