//! Lookup seam between the market and the identity component.

use async_trait::async_trait;

use crate::error::ErrorKind;
use crate::ids::PrincipalId;

/// Answers whether a principal exists.
///
/// The market component checks listing owners against this trait instead of
/// depending on the identity crate's storage.
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    /// Returns `true` if `principal_id` names a registered principal.
    ///
    /// # Errors
    ///
    /// Returns a message describing the storage failure; callers surface it
    /// as an [`ErrorKind::Infrastructure`] error.
    async fn principal_exists(&self, principal_id: PrincipalId) -> Result<bool, DirectoryError>;
}

/// Failure reported by a [`PrincipalDirectory`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("principal directory unavailable: {0}")]
pub struct DirectoryError(pub String);

impl DirectoryError {
    /// Always [`ErrorKind::Infrastructure`].
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Infrastructure
    }
}

/// Releases what a principal owns in another component.
///
/// Called by the identity component before a principal is deleted, so the
/// principal never disappears while resources still name them as owner.
#[async_trait]
pub trait OwnerCleanup: Send + Sync {
    /// Remove everything owned by `owner_id`.
    ///
    /// # Returns
    ///
    /// The number of resources removed.
    ///
    /// # Errors
    ///
    /// Returns a [`CleanupError`] if the owning store fails. Nothing is
    /// assumed about partial progress; callers must not delete the principal.
    async fn purge_owner(&self, owner_id: PrincipalId) -> Result<usize, CleanupError>;
}

/// Failure reported by an [`OwnerCleanup`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("owned resources not released: {0}")]
pub struct CleanupError(pub String);
