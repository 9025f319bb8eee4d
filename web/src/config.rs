//! Server configuration.
//!
//! Loaded from environment variables with defaults. [`Config::from_lookup`]
//! takes any lookup function, so loading is testable without touching the
//! process environment.

use bazaar_auth::{AdminBootstrap, AuthConfig};
use bazaar_market::{DeletePolicy, MarketConfig};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// A variable was set to something unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value for {name}: {value:?}")]
pub struct ConfigError {
    /// Variable name.
    pub name: &'static str,
    /// Offending value.
    pub value: String,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listener
    pub server: ServerConfig,
    /// PostgreSQL; `None` runs on in-memory stores
    pub database: Option<DatabaseConfig>,
    /// Identity & Session policy
    pub auth: AuthConfig,
    /// Market policy
    pub market: MarketConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Grace period for in-flight requests on shutdown
    pub shutdown_timeout: Duration,
}

impl ServerConfig {
    /// Socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `host` is not an IP address.
    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError {
                name: "HOST",
                value: self.host.clone(),
            })
    }
}

/// PostgreSQL configuration.
#[derive(Clone)]
pub struct DatabaseConfig {
    /// Connection URL
    pub url: String,
    /// Pool size
    pub max_connections: u32,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &redact_url(&self.url))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Drop credentials from a connection URL for logging.
#[must_use]
pub fn redact_url(url: &str) -> String {
    match (url.split_once("://"), url.rsplit_once('@')) {
        (Some((scheme, _)), Some((_, host))) => format!("{scheme}://***@{host}"),
        _ => url.to_string(),
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a variable that is set but unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a variable that is set but unparseable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let server = ServerConfig {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse(&var, "PORT", 8080)?,
            shutdown_timeout: Duration::from_secs(parse(&var, "SHUTDOWN_TIMEOUT", 30)?),
        };

        let database = match var("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse(&var, "DATABASE_MAX_CONNECTIONS", 10)?,
            }),
            None => None,
        };

        let defaults = AuthConfig::default();
        let ttl_secs: i64 = parse(&var, "AUTH_SESSION_TTL", defaults.session_ttl.num_seconds())?;
        let session_ttl = chrono::Duration::try_seconds(ttl_secs)
            .filter(|ttl| *ttl > chrono::Duration::zero())
            .ok_or_else(|| ConfigError {
                name: "AUTH_SESSION_TTL",
                value: ttl_secs.to_string(),
            })?;
        let admin_defaults = AdminBootstrap::default();
        let auth = AuthConfig::default()
            .with_session_ttl(session_ttl)
            .with_min_secret_length(parse(
                &var,
                "AUTH_MIN_SECRET_LENGTH",
                defaults.min_secret_length,
            )?)
            .with_hash_cost(parse(&var, "AUTH_BCRYPT_COST", defaults.hash_cost)?)
            .with_admin(AdminBootstrap {
                handle: var("ADMIN_HANDLE").unwrap_or(admin_defaults.handle),
                address: var("ADMIN_EMAIL").unwrap_or(admin_defaults.address),
                secret: var("ADMIN_PASSWORD"),
            });

        let market = MarketConfig::default().with_delete_policy(parse(
            &var,
            "LISTING_DELETE_POLICY",
            DeletePolicy::default(),
        )?);

        Ok(Self {
            server,
            database,
            auth,
            market,
        })
    }
}

fn parse<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError { name, value }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.shutdown_timeout, Duration::from_secs(30));
        assert!(config.database.is_none());
        assert_eq!(config.auth.session_ttl, chrono::Duration::hours(1));
        assert_eq!(config.auth.min_secret_length, 6);
        assert_eq!(config.auth.admin.handle, "admin");
        assert!(config.auth.admin.secret.is_none());
        assert_eq!(config.market.delete_policy, DeletePolicy::Cascade);
        assert_eq!(config.server.addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PORT", "9000"),
            ("DATABASE_URL", "postgres://u:p@db:5432/bazaar"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("AUTH_SESSION_TTL", "120"),
            ("AUTH_BCRYPT_COST", "4"),
            ("ADMIN_HANDLE", "root"),
            ("ADMIN_PASSWORD", "hunter22"),
            ("LISTING_DELETE_POLICY", "soft_delete"),
        ])
        .unwrap();
        assert_eq!(config.server.port, 9000);
        let db = config.database.unwrap();
        assert_eq!(db.max_connections, 4);
        assert_eq!(config.auth.session_ttl, chrono::Duration::minutes(2));
        assert_eq!(config.auth.hash_cost, 4);
        assert_eq!(config.auth.admin.handle, "root");
        assert_eq!(config.auth.admin.secret.as_deref(), Some("hunter22"));
        assert_eq!(config.market.delete_policy, DeletePolicy::SoftDelete);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = load(&[("PORT", "eighty")]).unwrap_err();
        assert_eq!(err.name, "PORT");
        assert_eq!(load(&[("AUTH_SESSION_TTL", "0")]).unwrap_err().name, "AUTH_SESSION_TTL");
        assert_eq!(
            load(&[("LISTING_DELETE_POLICY", "shred")]).unwrap_err().name,
            "LISTING_DELETE_POLICY"
        );
    }

    #[test]
    fn test_blank_is_unset() {
        let config = load(&[("DATABASE_URL", "  "), ("PORT", "")]).unwrap();
        assert!(config.database.is_none());
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_redact_url() {
        assert_eq!(
            redact_url("postgres://user:pw@db:5432/bazaar"),
            "postgres://***@db:5432/bazaar"
        );
        assert_eq!(redact_url("postgres://db/bazaar"), "postgres://db/bazaar");
    }
}
