//! PostgreSQL session store.

use super::db_error;
use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::state::{Session, SessionKey};
use async_trait::async_trait;
use bazaar_core::PrincipalId;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

/// PostgreSQL session store.
#[derive(Clone)]
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    /// Create a new store over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn insert(&self, session: &Session) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO sessions (token_digest, principal_id, issued_at, expires_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(session.key.as_bytes().as_slice())
        .bind(session.principal_id.as_uuid())
        .bind(session.issued_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create session", &e))?;
        Ok(())
    }

    async fn get(&self, key: &SessionKey) -> Result<Option<Session>> {
        let row = sqlx::query(
            r"
            SELECT principal_id, issued_at, expires_at
            FROM sessions
            WHERE token_digest = $1
            ",
        )
        .bind(key.as_bytes().as_slice())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get session", &e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let decode = |e: sqlx::Error| db_error("Failed to decode session", &e);
        Ok(Some(Session {
            key: *key,
            principal_id: PrincipalId::from_uuid(row.try_get("principal_id").map_err(decode)?),
            issued_at: row.try_get("issued_at").map_err(decode)?,
            expires_at: row.try_get("expires_at").map_err(decode)?,
        }))
    }

    async fn remove(&self, key: &SessionKey) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token_digest = $1")
            .bind(key.as_bytes().as_slice())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete session", &e))?;
        Ok(())
    }

    async fn remove_for_principal(&self, principal_id: PrincipalId) -> Result<usize> {
        let result = sqlx::query("DELETE FROM sessions WHERE principal_id = $1")
            .bind(principal_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete sessions", &e))?;
        usize::try_from(result.rows_affected())
            .map_err(|e| AuthError::Infrastructure(format!("Row count overflow: {e}")))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to purge sessions", &e))?;
        usize::try_from(result.rows_affected())
            .map_err(|e| AuthError::Infrastructure(format!("Row count overflow: {e}")))
    }
}
