//! PostgreSQL user repository implementation.

use super::db_error;
use crate::error::{AuthError, Result};
use crate::providers::UserRepository;
use crate::state::{Principal, Role, SecretHash};
use async_trait::async_trait;
use bazaar_core::PrincipalId;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const SELECT_PRINCIPAL: &str =
    "SELECT id, handle, address, secret_hash, role, created_at, updated_at FROM principals";

/// PostgreSQL user repository.
#[derive(Clone)]
pub struct PostgresUserRepository {
    /// PostgreSQL connection pool.
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Create a new PostgreSQL user repository.
    ///
    /// # Arguments
    ///
    /// * `pool` - PostgreSQL connection pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, clause: &str, value: &str) -> Result<Option<Principal>> {
        let sql = format!("{SELECT_PRINCIPAL} WHERE {clause} = $1");
        sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to get principal", &e))?
            .map(|row| principal_from_row(&row))
            .transpose()
    }
}

/// Translate a unique violation into the matching duplicate error.
fn write_error(context: &str, e: &sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = e {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some("principals_address_key") => AuthError::DuplicateAddress,
                _ => AuthError::DuplicateHandle,
            };
        }
    }
    db_error(context, e)
}

fn principal_from_row(row: &PgRow) -> Result<Principal> {
    let decode = |e: sqlx::Error| db_error("Failed to decode principal", &e);
    let role: String = row.try_get("role").map_err(decode)?;
    let role = Role::parse(&role)
        .ok_or_else(|| AuthError::Infrastructure(format!("Unknown role in storage: {role}")))?;

    Ok(Principal {
        id: PrincipalId::from_uuid(row.try_get("id").map_err(decode)?),
        handle: row.try_get("handle").map_err(decode)?,
        address: row.try_get("address").map_err(decode)?,
        secret_hash: SecretHash::new(row.try_get("secret_hash").map_err(decode)?),
        role,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn insert(&self, principal: &Principal) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO principals
                (id, handle, address, secret_hash, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(principal.id.as_uuid())
        .bind(&principal.handle)
        .bind(&principal.address)
        .bind(principal.secret_hash.as_str())
        .bind(principal.role.as_str())
        .bind(principal.created_at)
        .bind(principal.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("Failed to create principal", &e))?;

        Ok(())
    }

    async fn update(&self, principal: &Principal) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE principals
            SET handle = $2,
                address = $3,
                secret_hash = $4,
                role = $5,
                updated_at = $6
            WHERE id = $1
            ",
        )
        .bind(principal.id.as_uuid())
        .bind(&principal.handle)
        .bind(&principal.address)
        .bind(principal.secret_hash.as_str())
        .bind(principal.role.as_str())
        .bind(principal.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("Failed to update principal", &e))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>> {
        let sql = format!("{SELECT_PRINCIPAL} WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to get principal", &e))?
            .map(|row| principal_from_row(&row))
            .transpose()
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Option<Principal>> {
        self.fetch_one_where("handle", handle).await
    }

    async fn find_by_address(&self, address: &str) -> Result<Option<Principal>> {
        self.fetch_one_where("address", address).await
    }

    async fn list(&self) -> Result<Vec<Principal>> {
        let sql = format!("{SELECT_PRINCIPAL} ORDER BY created_at ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list principals", &e))?;
        rows.iter().map(principal_from_row).collect()
    }

    async fn delete(&self, id: PrincipalId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM principals WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete principal", &e))?;
        Ok(result.rows_affected() > 0)
    }
}
