//! Session store trait.

use crate::error::Result;
use crate::state::{Session, SessionKey};
use async_trait::async_trait;
use bazaar_core::PrincipalId;
use chrono::{DateTime, Utc};

/// Session store.
///
/// # Implementation Notes
///
/// - Keyed by [`SessionKey`] (token digest); raw tokens are never stored
/// - Expiry is decided by the caller's clock, not by the store
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a new session.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    async fn insert(&self, session: &Session) -> Result<()>;

    /// Look up a session, expired or not.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    async fn get(&self, key: &SessionKey) -> Result<Option<Session>>;

    /// Remove one session. Removing a missing session is not an error.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    async fn remove(&self, key: &SessionKey) -> Result<()>;

    /// Remove every session of a principal.
    ///
    /// # Returns
    ///
    /// Number of sessions removed.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    async fn remove_for_principal(&self, principal_id: PrincipalId) -> Result<usize>;

    /// Remove sessions whose expiry is at or before `now`.
    ///
    /// # Returns
    ///
    /// Number of sessions removed.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}
