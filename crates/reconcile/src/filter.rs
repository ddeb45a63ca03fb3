//! Distribution filter - which artifact kinds a request accepts

use crate::error::Error;
use crate::types::DistributionKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Policy on how packages may be distributed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DistPolicy {
    /// Source and binary dists
    #[default]
    All,
    /// Source dists only
    SourceOnly,
    /// Binary dists only
    BinaryOnly,
}

impl DistPolicy {
    /// Check whether an artifact kind is allowed under this policy
    pub fn accepts(self, kind: DistributionKind) -> bool {
        match self {
            Self::All => true,
            Self::SourceOnly => kind == DistributionKind::Source,
            Self::BinaryOnly => kind == DistributionKind::Binary,
        }
    }

    /// Check whether any of the available kinds is allowed
    pub fn accepts_any(self, available: &[DistributionKind]) -> bool {
        available.iter().any(|&kind| self.accepts(kind))
    }

    pub fn allows_source(self) -> bool {
        self.accepts(DistributionKind::Source)
    }

    pub fn allows_binary(self) -> bool {
        self.accepts(DistributionKind::Binary)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::SourceOnly => "source",
            Self::BinaryOnly => "binary",
        }
    }
}

impl FromStr for DistPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "source" => Ok(Self::SourceOnly),
            "binary" => Ok(Self::BinaryOnly),
            other => Err(Error::InvalidPolicy(other.to_string())),
        }
    }
}

impl TryFrom<String> for DistPolicy {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DistPolicy> for String {
    fn from(policy: DistPolicy) -> Self {
        policy.as_str().to_string()
    }
}

impl fmt::Display for DistPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
