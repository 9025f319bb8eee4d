//! Market configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What deleting a listing does to it and its orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Remove the listing and every order placed against it.
    #[default]
    Cascade,
    /// Mark the listing deleted and inactive; keep its orders.
    SoftDelete,
}

impl DeletePolicy {
    /// Configuration spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cascade => "cascade",
            Self::SoftDelete => "soft_delete",
        }
    }
}

impl fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeletePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cascade" | "hard" => Ok(Self::Cascade),
            "soft_delete" | "soft-delete" | "soft" => Ok(Self::SoftDelete),
            other => Err(format!("unknown delete policy: {other}")),
        }
    }
}

/// Market configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarketConfig {
    /// Listing deletion behavior.
    ///
    /// Default: [`DeletePolicy::Cascade`]
    pub delete_policy: DeletePolicy,
}

impl MarketConfig {
    /// Set the delete policy.
    #[must_use]
    pub const fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parsing() {
        assert_eq!("cascade".parse(), Ok(DeletePolicy::Cascade));
        assert_eq!("Soft".parse(), Ok(DeletePolicy::SoftDelete));
        assert_eq!(" soft_delete ".parse(), Ok(DeletePolicy::SoftDelete));
        assert!("archive".parse::<DeletePolicy>().is_err());
    }

    #[test]
    fn test_default_is_cascade() {
        assert_eq!(MarketConfig::default().delete_policy, DeletePolicy::Cascade);
    }
}
