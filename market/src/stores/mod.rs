//! Storage implementations for the market.
//!
//! - **In-memory** (default) - one lock over listings and orders
//! - **PostgreSQL** (`postgres` feature) - conditional updates inside transactions

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

// Re-exports
pub use memory::InMemoryMarketStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresMarketStore;
