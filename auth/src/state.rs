//! Identity types: principals, sessions and login identifiers.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bazaar_core::{Actor, PrincipalId};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Number of random bytes in a session token.
const TOKEN_BYTES: usize = 32;

// ═══════════════════════════════════════════════════════════════════════
// Principals
// ═══════════════════════════════════════════════════════════════════════

/// Principal role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Ordinary marketplace member.
    Member,
    /// Administrator.
    Admin,
}

impl Role {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
        }
    }

    /// Parse the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "member" => Some(Self::Member),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// One-way representation of a principal's secret (a bcrypt hash).
///
/// `Debug` never prints the hash.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretHash(String);

impl SecretHash {
    /// Wrap an existing hash string.
    #[must_use]
    pub const fn new(hash: String) -> Self {
        Self(hash)
    }

    /// The encoded hash.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretHash(<redacted>)")
    }
}

/// A registered user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// Principal ID.
    pub id: PrincipalId,
    /// Unique handle (username).
    pub handle: String,
    /// Unique contact address (email), stored lowercased.
    pub address: String,
    /// Hashed secret. Never serialized.
    #[serde(skip)]
    pub secret_hash: SecretHash,
    /// Role.
    pub role: Role,
    /// When the principal registered.
    pub created_at: DateTime<Utc>,
    /// Last profile change.
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    /// Returns `true` for administrators.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The actor this principal acts as.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor {
            principal_id: self.id,
            is_admin: self.is_admin(),
        }
    }
}

/// Requested profile changes. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    /// New handle.
    #[serde(default)]
    pub handle: Option<String>,
    /// New contact address.
    #[serde(default)]
    pub address: Option<String>,
    /// New secret.
    #[serde(default)]
    pub secret: Option<String>,
}

impl ProfileUpdate {
    /// Returns `true` when no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.handle.is_none() && self.address.is_none() && self.secret.is_none()
    }
}

/// How a caller identifies themself at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginIdentifier {
    /// The unique handle.
    Handle(String),
    /// The unique contact address.
    Address(String),
}

impl LoginIdentifier {
    /// Pick `Address` when the input contains `@`, `Handle` otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use bazaar_auth::LoginIdentifier;
    ///
    /// assert_eq!(
    ///     LoginIdentifier::infer("alice@x.com"),
    ///     LoginIdentifier::Address("alice@x.com".into())
    /// );
    /// assert_eq!(LoginIdentifier::infer("alice"), LoginIdentifier::Handle("alice".into()));
    /// ```
    #[must_use]
    pub fn infer(input: &str) -> Self {
        if input.contains('@') {
            Self::Address(input.to_string())
        } else {
            Self::Handle(input.to_string())
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Sessions
// ═══════════════════════════════════════════════════════════════════════

/// Opaque bearer credential handed to the client.
///
/// Only its [`SessionKey`] is ever stored.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a fresh token from 32 bytes of OS-seeded randomness.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// The encoded token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage key for this token.
    #[must_use]
    pub fn key(&self) -> SessionKey {
        SessionKey::of(&self.0)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// SHA-256 digest of a session token; the key sessions are stored under.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey([u8; 32]);

impl SessionKey {
    /// Digest a presented token.
    #[must_use]
    pub fn of(token: &str) -> Self {
        Self(Sha256::digest(token.as_bytes()).into())
    }

    /// Rebuild a key read back from storage.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Prefix only; enough to correlate log lines.
        write!(
            f,
            "SessionKey({:02x}{:02x}{:02x}{:02x}..)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

/// A stored session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Digest of the token.
    pub key: SessionKey,
    /// Principal the session authenticates.
    pub principal_id: PrincipalId,
    /// When the session was issued.
    pub issued_at: DateTime<Utc>,
    /// When the session stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Returns `true` once `now` reaches `expires_at`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Result of a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    /// Bearer token. Shown to the client once.
    pub token: SessionToken,
    /// The authenticated principal.
    pub principal: Principal,
    /// Token expiry.
    pub expires_at: DateTime<Utc>,
}
