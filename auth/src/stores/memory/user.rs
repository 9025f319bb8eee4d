//! In-memory user repository.

use crate::error::{AuthError, Result};
use crate::providers::UserRepository;
use crate::state::Principal;
use async_trait::async_trait;
use bazaar_core::PrincipalId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Tables {
    by_id: HashMap<PrincipalId, Principal>,
    handles: HashMap<String, PrincipalId>,
    addresses: HashMap<String, PrincipalId>,
}

impl Tables {
    /// Fails if `handle` or `address` belongs to someone other than `id`.
    fn check_unique(&self, id: PrincipalId, handle: &str, address: &str) -> Result<()> {
        if self.handles.get(handle).is_some_and(|owner| *owner != id) {
            return Err(AuthError::DuplicateHandle);
        }
        if self.addresses.get(address).is_some_and(|owner| *owner != id) {
            return Err(AuthError::DuplicateAddress);
        }
        Ok(())
    }

    fn index(&mut self, principal: &Principal) {
        self.handles.insert(principal.handle.clone(), principal.id);
        self.addresses.insert(principal.address.clone(), principal.id);
    }

    fn unindex(&mut self, principal: &Principal) {
        self.handles.remove(&principal.handle);
        self.addresses.remove(&principal.address);
    }
}

/// In-memory user repository.
///
/// All three indexes sit behind one lock, so a uniqueness check and the
/// write that follows it are atomic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryUserRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| AuthError::Infrastructure("user table lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, principal: &Principal) -> Result<()> {
        let mut tables = self.lock()?;
        tables.check_unique(principal.id, &principal.handle, &principal.address)?;
        tables.index(principal);
        tables.by_id.insert(principal.id, principal.clone());
        Ok(())
    }

    async fn update(&self, principal: &Principal) -> Result<()> {
        let mut tables = self.lock()?;
        let Some(previous) = tables.by_id.get(&principal.id).cloned() else {
            return Err(AuthError::NotFound);
        };
        tables.check_unique(principal.id, &principal.handle, &principal.address)?;
        tables.unindex(&previous);
        tables.index(principal);
        tables.by_id.insert(principal.id, principal.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>> {
        Ok(self.lock()?.by_id.get(&id).cloned())
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Option<Principal>> {
        let tables = self.lock()?;
        Ok(tables
            .handles
            .get(handle)
            .and_then(|id| tables.by_id.get(id))
            .cloned())
    }

    async fn find_by_address(&self, address: &str) -> Result<Option<Principal>> {
        let tables = self.lock()?;
        Ok(tables
            .addresses
            .get(address)
            .and_then(|id| tables.by_id.get(id))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Principal>> {
        let mut principals: Vec<Principal> = self.lock()?.by_id.values().cloned().collect();
        principals.sort_by_key(|p| p.created_at);
        Ok(principals)
    }

    async fn delete(&self, id: PrincipalId) -> Result<bool> {
        let mut tables = self.lock()?;
        match tables.by_id.remove(&id) {
            Some(principal) => {
                tables.unindex(&principal);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::state::{Role, SecretHash};
    use chrono::Utc;

    fn principal(handle: &str, address: &str) -> Principal {
        Principal {
            id: PrincipalId::new(),
            handle: handle.to_string(),
            address: address.to_string(),
            secret_hash: SecretHash::default(),
            role: Role::Member,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicates_rejected() {
        let repo = InMemoryUserRepository::new();
        repo.insert(&principal("alice", "alice@x.com")).await.unwrap();

        assert_eq!(
            repo.insert(&principal("alice", "other@x.com")).await,
            Err(AuthError::DuplicateHandle)
        );
        assert_eq!(
            repo.insert(&principal("bob", "alice@x.com")).await,
            Err(AuthError::DuplicateAddress)
        );
    }

    #[tokio::test]
    async fn test_update_reindexes() {
        let repo = InMemoryUserRepository::new();
        let mut alice = principal("alice", "alice@x.com");
        repo.insert(&alice).await.unwrap();

        alice.handle = "alicia".to_string();
        repo.update(&alice).await.unwrap();

        assert!(repo.find_by_handle("alice").await.unwrap().is_none());
        assert_eq!(repo.find_by_handle("alicia").await.unwrap().map(|p| p.id), Some(alice.id));

        // The released handle is free again.
        repo.insert(&principal("alice", "new@x.com")).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_cannot_steal_handle() {
        let repo = InMemoryUserRepository::new();
        repo.insert(&principal("alice", "alice@x.com")).await.unwrap();
        let mut bob = principal("bob", "bob@x.com");
        repo.insert(&bob).await.unwrap();

        bob.handle = "alice".to_string();
        assert_eq!(repo.update(&bob).await, Err(AuthError::DuplicateHandle));
    }

    #[tokio::test]
    async fn test_delete_frees_identifiers() {
        let repo = InMemoryUserRepository::new();
        let alice = principal("alice", "alice@x.com");
        repo.insert(&alice).await.unwrap();

        assert!(repo.delete(alice.id).await.unwrap());
        assert!(!repo.delete(alice.id).await.unwrap());
        assert!(repo.find_by_address("alice@x.com").await.unwrap().is_none());
    }
}
