//! Storage traits for the identity component.
//!
//! These traits define the interface for storage backends:
//!
//! - **User Repository**: principal records with unique handle and address
//! - **Session Store**: live sessions keyed by token digest
//!
//! Implementations live in [`crate::stores`].

pub mod session;
pub mod user;

pub use session::SessionStore;
pub use user::UserRepository;
