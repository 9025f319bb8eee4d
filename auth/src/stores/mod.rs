//! Storage implementations for the identity component.
//!
//! - **In-memory** (default) - `Arc<Mutex<_>>` maps, used by tests and by the
//!   server when no database is configured
//! - **PostgreSQL** (`postgres` feature) - persistent principals and sessions

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

// Re-exports
pub use memory::{InMemorySessionStore, InMemoryUserRepository};
#[cfg(feature = "postgres")]
pub use postgres::{PostgresSessionStore, PostgresUserRepository};
