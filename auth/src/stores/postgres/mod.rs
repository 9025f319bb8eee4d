//! PostgreSQL storage implementations.
//!
//! This module provides persistent storage using PostgreSQL for:
//! - Principals (`principals` table, unique handle and address constraints)
//! - Sessions (`sessions` table, keyed by token digest)
//!
//! # Example
//!
//! ```no_run
//! use bazaar_auth::stores::postgres::{self, PostgresUserRepository};
//! use sqlx::PgPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgresql://localhost/bazaar").await?;
//! postgres::migrate(&pool).await?;
//! let repo = PostgresUserRepository::new(pool);
//! # Ok(())
//! # }
//! ```

pub mod session;
pub mod user;

use crate::error::{AuthError, Result};
use sqlx::PgPool;

// Re-exports
pub use session::PostgresSessionStore;
pub use user::PostgresUserRepository;

/// Apply the identity schema migrations.
///
/// The market crate shares the migration table, so migrations applied by it
/// are ignored here.
///
/// # Errors
///
/// Returns error if migrations fail.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    let mut migrator = sqlx::migrate!("./migrations");
    migrator.set_ignore_missing(true);
    migrator
        .run(pool)
        .await
        .map_err(|e| AuthError::Infrastructure(format!("Migration failed: {e}")))
}

pub(crate) fn db_error(context: &str, e: &sqlx::Error) -> AuthError {
    tracing::error!(error = %e, "{context}");
    AuthError::Infrastructure(format!("{context}: {e}"))
}
