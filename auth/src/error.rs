//! Error types for identity and session operations.

use bazaar_core::ErrorKind;
use thiserror::Error;

/// Result type alias for identity operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Every way an identity or session operation can fail.
///
/// Expected conditions (bad credentials, duplicates, missing principals) are
/// ordinary variants; only [`AuthError::Infrastructure`] signals that a
/// collaborator broke.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Validation Errors
    // ═══════════════════════════════════════════════════════════

    /// A required field was empty.
    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the missing field
        field: &'static str,
    },

    /// The contact address is not a syntactically valid email.
    #[error("Invalid email address format")]
    InvalidAddressFormat,

    /// The secret is shorter than the configured policy allows.
    #[error("Password must be at least {min_length} characters")]
    WeakSecret {
        /// Minimum accepted length in characters
        min_length: usize,
    },

    // ═══════════════════════════════════════════════════════════
    // Conflicts
    // ═══════════════════════════════════════════════════════════

    /// Another principal already uses this handle.
    #[error("Username already exists")]
    DuplicateHandle,

    /// Another principal already uses this address.
    #[error("Email already exists")]
    DuplicateAddress,

    // ═══════════════════════════════════════════════════════════
    // Authentication Errors
    // ═══════════════════════════════════════════════════════════

    /// Unknown identifier or wrong secret. The two are never distinguished.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// No live session backs the presented token.
    #[error("Authentication required")]
    Unauthenticated,

    // ═══════════════════════════════════════════════════════════
    // Authorization Errors
    // ═══════════════════════════════════════════════════════════

    /// The caller is not allowed to perform this operation.
    #[error("Unauthorized access")]
    Forbidden,

    /// The referenced principal does not exist.
    #[error("User not found")]
    NotFound,

    /// An administrator tried to delete their own account.
    #[error("Cannot delete your own account")]
    SelfDeletion,

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Storage or hashing failed (should not be exposed to users).
    #[error("Identity backend error: {0}")]
    Infrastructure(String),
}

impl AuthError {
    /// Classify this error for the presentation layer.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bazaar_auth::AuthError;
    /// # use bazaar_core::ErrorKind;
    /// assert_eq!(AuthError::DuplicateHandle.kind(), ErrorKind::Conflict);
    /// assert_eq!(AuthError::InvalidCredentials.kind(), ErrorKind::Unauthenticated);
    /// ```
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField { .. }
            | Self::InvalidAddressFormat
            | Self::WeakSecret { .. }
            | Self::SelfDeletion => ErrorKind::Validation,
            Self::DuplicateHandle | Self::DuplicateAddress => ErrorKind::Conflict,
            Self::InvalidCredentials | Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Forbidden => ErrorKind::Forbidden,
            Self::NotFound => ErrorKind::NotFound,
            Self::Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }

    /// Returns `true` if this error is due to invalid user input.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bazaar_auth::AuthError;
    /// assert!(AuthError::WeakSecret { min_length: 6 }.is_user_error());
    /// assert!(!AuthError::Infrastructure("db down".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        self.kind().is_client_error()
    }
}
