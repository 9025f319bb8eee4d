//! In-memory session store.

use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::state::{Session, SessionKey};
use async_trait::async_trait;
use bazaar_core::PrincipalId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory session store.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<SessionKey, Session>>>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired included.
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    /// Returns `true` if no sessions are stored.
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<SessionKey, Session>>> {
        self.sessions
            .lock()
            .map_err(|_| AuthError::Infrastructure("session table lock poisoned".to_string()))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: &Session) -> Result<()> {
        self.lock()?.insert(session.key, session.clone());
        Ok(())
    }

    async fn get(&self, key: &SessionKey) -> Result<Option<Session>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn remove(&self, key: &SessionKey) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn remove_for_principal(&self, principal_id: PrincipalId) -> Result<usize> {
        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|_, s| s.principal_id != principal_id);
        Ok(before - sessions.len())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(principal_id: PrincipalId, token: &str, expires_at: DateTime<Utc>) -> Session {
        Session {
            key: SessionKey::of(token),
            principal_id,
            issued_at: expires_at - Duration::hours(1),
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_remove_for_principal_only_touches_that_principal() {
        let store = InMemorySessionStore::new();
        let alice = PrincipalId::new();
        let bob = PrincipalId::new();
        let later = Utc::now() + Duration::hours(1);

        store.insert(&session(alice, "a1", later)).await.unwrap();
        store.insert(&session(alice, "a2", later)).await.unwrap();
        store.insert(&session(bob, "b1", later)).await.unwrap();

        assert_eq!(store.remove_for_principal(alice).await.unwrap(), 2);
        assert_eq!(store.len().unwrap(), 1);
        assert!(store.get(&SessionKey::of("b1")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = InMemorySessionStore::new();
        let now = Utc::now();
        let id = PrincipalId::new();

        store.insert(&session(id, "old", now - Duration::minutes(1))).await.unwrap();
        store.insert(&session(id, "edge", now)).await.unwrap();
        store.insert(&session(id, "live", now + Duration::minutes(1))).await.unwrap();

        assert_eq!(store.purge_expired(now).await.unwrap(), 2);
        assert!(store.get(&SessionKey::of("live")).await.unwrap().is_some());
    }
}
