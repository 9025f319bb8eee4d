//! Error taxonomy shared by every component.
//!
//! Component errors (`AuthError`, `MarketError`) keep their own precise
//! variants and expose a `kind()` that classifies them here. The presentation
//! layer translates an [`ErrorKind`] into a transport response in one place.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad classification of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A field is missing or malformed.
    Validation,
    /// The caller did not present a live session or valid credentials.
    Unauthenticated,
    /// The referenced entity does not exist.
    NotFound,
    /// The request collides with existing state (duplicates, stock).
    Conflict,
    /// The caller is authenticated but not allowed to do this.
    Forbidden,
    /// The entity is not in a state that permits the operation.
    State,
    /// Storage or another collaborator failed unexpectedly.
    Infrastructure,
}

impl ErrorKind {
    /// Stable machine-readable code for clients.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Unauthenticated => "UNAUTHORIZED",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Forbidden => "FORBIDDEN",
            Self::State => "INVALID_STATE",
            Self::Infrastructure => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Returns `true` for failures the caller can fix by changing the request.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bazaar_core::ErrorKind;
    /// assert!(ErrorKind::Validation.is_client_error());
    /// assert!(!ErrorKind::Infrastructure.is_client_error());
    /// ```
    #[must_use]
    pub const fn is_client_error(self) -> bool {
        !matches!(self, Self::Infrastructure)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
