//! # Bazaar Identity & Session
//!
//! Registers and authenticates principals, issues opaque session tokens, and
//! answers the two questions every other component asks: *who is this caller*
//! and *are they an administrator*.
//!
//! ## Features
//!
//! - **One-way credentials**: secrets are stored only as bcrypt hashes
//! - **Opaque sessions**: 256-bit random tokens, stored by digest, with a fixed TTL
//! - **Fail-closed resolution**: missing, malformed and expired tokens are indistinguishable
//! - **Pluggable storage**: in-memory stores by default, PostgreSQL behind the `postgres` feature
//!
//! ## Architecture
//!
//! ```text
//! IdentityService ──► UserRepository  (principals)
//!        │        └─► SessionStore    (token digest → principal, expiry)
//!        └──────────► Clock           (expiry checks)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use bazaar_auth::{AuthConfig, IdentityService, LoginIdentifier};
//!
//! let identity = IdentityService::in_memory(AuthConfig::default());
//!
//! let alice = identity.register("alice", "alice@x.com", "secret1").await?;
//! let session = identity
//!     .authenticate(LoginIdentifier::infer("alice"), "secret1")
//!     .await?;
//!
//! let me = identity.current_principal(session.token.as_str()).await?;
//! assert_eq!(me.id, alice.id);
//! assert!(!identity.is_admin(session.token.as_str()).await);
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod config;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod providers;
pub mod state;
pub mod stores;
pub mod utils;

// Re-export main types for convenience
pub use config::{AdminBootstrap, AuthConfig};
pub use error::{AuthError, Result};
pub use identity::{BootstrapOutcome, IdentityService};
pub use state::{
    IssuedSession, LoginIdentifier, Principal, ProfileUpdate, Role, Session, SessionKey,
    SessionToken,
};
