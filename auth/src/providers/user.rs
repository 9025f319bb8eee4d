//! User repository trait.

use crate::error::Result;
use crate::state::Principal;
use async_trait::async_trait;
use bazaar_core::PrincipalId;

/// Principal storage.
///
/// Uniqueness of handle and address is enforced here, atomically with the
/// write, so two concurrent registrations of the same handle cannot both
/// succeed.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new principal.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Handle already taken → `AuthError::DuplicateHandle`
    /// - Address already taken → `AuthError::DuplicateAddress`
    /// - Storage fails → `AuthError::Infrastructure`
    async fn insert(&self, principal: &Principal) -> Result<()>;

    /// Replace an existing principal's record.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Principal not found → `AuthError::NotFound`
    /// - New handle/address collides with another principal
    /// - Storage fails
    async fn update(&self, principal: &Principal) -> Result<()>;

    /// Get principal by ID.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>>;

    /// Get principal by exact handle.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    async fn find_by_handle(&self, handle: &str) -> Result<Option<Principal>>;

    /// Get principal by normalized address.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    async fn find_by_address(&self, address: &str) -> Result<Option<Principal>>;

    /// All principals, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    async fn list(&self) -> Result<Vec<Principal>>;

    /// Delete a principal.
    ///
    /// # Returns
    ///
    /// `true` if a principal was removed.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    async fn delete(&self, id: PrincipalId) -> Result<bool>;
}
