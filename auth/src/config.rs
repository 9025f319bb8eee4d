//! Identity configuration.
//!
//! Configuration values are supplied by the application; the defaults mirror
//! the reference behavior (1 hour sessions, 6 character minimum secret).

use chrono::Duration;

/// Identity & Session configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// How long an issued session stays valid.
    ///
    /// Default: 1 hour
    pub session_ttl: Duration,

    /// Minimum secret length, in characters.
    ///
    /// Default: 6
    pub min_secret_length: usize,

    /// bcrypt work factor.
    ///
    /// Default: 12. Tests use 4, the bcrypt minimum.
    pub hash_cost: u32,

    /// The reserved administrator created at startup.
    pub admin: AdminBootstrap,
}

impl AuthConfig {
    /// Create a configuration with the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set session time-to-live.
    #[must_use]
    pub const fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Set the minimum secret length.
    #[must_use]
    pub const fn with_min_secret_length(mut self, min: usize) -> Self {
        self.min_secret_length = min;
        self
    }

    /// Set the bcrypt cost.
    #[must_use]
    pub const fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    /// Set the administrator bootstrap settings.
    #[must_use]
    pub fn with_admin(mut self, admin: AdminBootstrap) -> Self {
        self.admin = admin;
        self
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::hours(1),
            min_secret_length: 6,
            hash_cost: bcrypt::DEFAULT_COST,
            admin: AdminBootstrap::default(),
        }
    }
}

/// Settings for the bootstrap administrator.
#[derive(Clone)]
pub struct AdminBootstrap {
    /// Handle given to the administrator created on first start.
    pub handle: String,

    /// Contact address for the administrator.
    pub address: String,

    /// Initial secret. When `None`, a random secret is generated and handed
    /// back to the caller exactly once.
    pub secret: Option<String>,
}

impl Default for AdminBootstrap {
    fn default() -> Self {
        Self {
            handle: "admin".to_string(),
            address: "admin@bazaar.local".to_string(),
            secret: None,
        }
    }
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("handle", &self.handle)
            .field("address", &self.address)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_policy() {
        let config = AuthConfig::default();
        assert_eq!(config.session_ttl, Duration::hours(1));
        assert_eq!(config.min_secret_length, 6);
        assert_eq!(config.admin.handle, "admin");
    }

    #[test]
    fn test_builder() {
        let config = AuthConfig::new()
            .with_session_ttl(Duration::minutes(5))
            .with_min_secret_length(10)
            .with_hash_cost(4);
        assert_eq!(config.session_ttl, Duration::minutes(5));
        assert_eq!(config.min_secret_length, 10);
        assert_eq!(config.hash_cost, 4);
    }

    #[test]
    fn test_admin_secret_is_redacted_in_debug() {
        let admin = AdminBootstrap {
            secret: Some("hunter22".to_string()),
            ..AdminBootstrap::default()
        };
        let rendered = format!("{admin:?}");
        assert!(!rendered.contains("hunter22"));
        assert!(rendered.contains("<redacted>"));
    }
}
