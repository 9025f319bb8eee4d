//! PostgreSQL market store.
//!
//! Stock changes are single conditional `UPDATE ... RETURNING` statements;
//! order placement and cancellation wrap theirs in a transaction together
//! with the order write. An update that matches no row locks the listing
//! before reporting why, so the reason reflects the row as it stands.
//!
//! # Example
//!
//! ```no_run
//! use bazaar_market::stores::PostgresMarketStore;
//! use sqlx::PgPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgresql://localhost/bazaar").await?;
//! let store = PostgresMarketStore::new(pool);
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::DeletePolicy;
use crate::error::{MarketError, Result};
use crate::repository::MarketRepository;
use crate::types::{
    Listing, ListingChanges, ListingQuery, Order, OrderDraft, OrderScope, OrderStatus,
    PaymentMethod, PaymentStatus,
};
use async_trait::async_trait;
use bazaar_core::{ListingId, OrderId, PrincipalId};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

const LISTING_COLUMNS: &str = "id, owner_id, category, quantity, price, description, contact, \
                               active, created_at, updated_at, deleted_at";

const ORDER_COLUMNS: &str = "id, listing_id, seller_id, buyer_id, quantity, unit_price, total, \
                             status, payment_method, payment_status, shipping_address, \
                             created_at, updated_at";

/// PostgreSQL market store.
#[derive(Clone)]
pub struct PostgresMarketStore {
    /// PostgreSQL connection pool.
    pool: PgPool,
}

impl PostgresMarketStore {
    /// Create a new store over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the market schema migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        let mut migrator = sqlx::migrate!("./migrations");
        migrator.set_ignore_missing(true);
        migrator
            .run(&self.pool)
            .await
            .map_err(|e| MarketError::Infrastructure(format!("Migration failed: {e}")))
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", &e))
    }
}

fn db_error(context: &str, e: &sqlx::Error) -> MarketError {
    tracing::error!(error = %e, "{context}");
    MarketError::Infrastructure(format!("{context}: {e}"))
}

fn to_u32(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| MarketError::Infrastructure(format!("{column} out of range: {value}")))
}

fn to_usize(value: u64) -> Result<usize> {
    usize::try_from(value)
        .map_err(|e| MarketError::Infrastructure(format!("Row count overflow: {e}")))
}

fn listing_from_row(row: &PgRow) -> Result<Listing> {
    let decode = |e: sqlx::Error| db_error("Failed to decode listing", &e);
    Ok(Listing {
        id: ListingId::from_uuid(row.try_get("id").map_err(decode)?),
        owner_id: PrincipalId::from_uuid(row.try_get("owner_id").map_err(decode)?),
        category: row.try_get("category").map_err(decode)?,
        quantity: to_u32(row.try_get("quantity").map_err(decode)?, "quantity")?,
        price: row.try_get("price").map_err(decode)?,
        description: row.try_get("description").map_err(decode)?,
        contact: row.try_get("contact").map_err(decode)?,
        active: row.try_get("active").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
        deleted_at: row.try_get("deleted_at").map_err(decode)?,
    })
}

fn order_from_row(row: &PgRow) -> Result<Order> {
    let decode = |e: sqlx::Error| db_error("Failed to decode order", &e);
    let unknown = |column: &str, value: &str| {
        MarketError::Infrastructure(format!("Unknown {column} in storage: {value}"))
    };

    let status: String = row.try_get("status").map_err(decode)?;
    let method: String = row.try_get("payment_method").map_err(decode)?;
    let payment: String = row.try_get("payment_status").map_err(decode)?;

    Ok(Order {
        id: OrderId::from_uuid(row.try_get("id").map_err(decode)?),
        listing_id: ListingId::from_uuid(row.try_get("listing_id").map_err(decode)?),
        seller_id: PrincipalId::from_uuid(row.try_get("seller_id").map_err(decode)?),
        buyer_id: PrincipalId::from_uuid(row.try_get("buyer_id").map_err(decode)?),
        quantity: to_u32(row.try_get("quantity").map_err(decode)?, "quantity")?,
        unit_price: row.try_get("unit_price").map_err(decode)?,
        total: row.try_get("total").map_err(decode)?,
        status: OrderStatus::parse(&status).ok_or_else(|| unknown("status", &status))?,
        payment_method: PaymentMethod::parse(&method)
            .ok_or_else(|| unknown("payment method", &method))?,
        payment_status: PaymentStatus::parse(&payment)
            .ok_or_else(|| unknown("payment status", &payment))?,
        shipping_address: row.try_get("shipping_address").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

/// Why a debit of `requested` units cannot apply to a listing in this state.
///
/// `None` means the stock now covers the request.
fn debit_refusal(
    owner_id: PrincipalId,
    quantity: u32,
    deleted: bool,
    requested: u32,
    buyer_id: Option<PrincipalId>,
) -> Option<MarketError> {
    if deleted {
        return Some(MarketError::ListingNotFound);
    }
    if buyer_id == Some(owner_id) {
        return Some(MarketError::BuyerIsSeller);
    }
    (quantity < requested).then_some(MarketError::InsufficientStock {
        requested: i64::from(requested),
        available: quantity,
    })
}

/// Lock the listing a conditional debit missed and say why it missed.
///
/// `None` means a concurrent credit restored the stock after the update ran;
/// the row is now locked by `tx`, so retrying the update is decisive.
async fn lock_failed_debit(
    tx: &mut Transaction<'static, Postgres>,
    id: ListingId,
    requested: u32,
    buyer_id: Option<PrincipalId>,
) -> Result<Option<MarketError>> {
    let row = sqlx::query(
        "SELECT owner_id, quantity, deleted_at FROM listings WHERE id = $1 FOR UPDATE",
    )
    .bind(id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| db_error("Failed to lock listing", &e))?;

    let Some(row) = row else {
        return Ok(Some(MarketError::ListingNotFound));
    };
    let decode = |e: sqlx::Error| db_error("Failed to decode listing", &e);
    let deleted_at: Option<DateTime<Utc>> = row.try_get("deleted_at").map_err(decode)?;
    let owner = PrincipalId::from_uuid(row.try_get("owner_id").map_err(decode)?);
    let quantity = to_u32(row.try_get("quantity").map_err(decode)?, "quantity")?;
    Ok(debit_refusal(
        owner,
        quantity,
        deleted_at.is_some(),
        requested,
        buyer_id,
    ))
}

fn unconverged_debit() -> MarketError {
    MarketError::Infrastructure("listing debit missed a locked row".to_string())
}

#[async_trait]
impl MarketRepository for PostgresMarketStore {
    async fn insert_listing(&self, listing: &Listing) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO listings
                (id, owner_id, category, quantity, price, description, contact,
                 active, created_at, updated_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(listing.id.as_uuid())
        .bind(listing.owner_id.as_uuid())
        .bind(&listing.category)
        .bind(i64::from(listing.quantity))
        .bind(listing.price)
        .bind(&listing.description)
        .bind(&listing.contact)
        .bind(listing.active)
        .bind(listing.created_at)
        .bind(listing.updated_at)
        .bind(listing.deleted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create listing", &e))?;
        Ok(())
    }

    async fn get_listing(&self, id: ListingId) -> Result<Option<Listing>> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to get listing", &e))?
            .map(|row| listing_from_row(&row))
            .transpose()
    }

    async fn query_listings(&self, query: &ListingQuery) -> Result<Vec<Listing>> {
        let sql = format!(
            r"
            SELECT {LISTING_COLUMNS} FROM listings
            WHERE active
              AND ($1::text IS NULL OR category = $1)
              AND ($2::uuid IS NULL OR owner_id = $2)
              AND ($3::text IS NULL OR strpos(category, $3) > 0)
              AND ($4::float8 IS NULL OR price >= $4)
              AND ($5::float8 IS NULL OR price <= $5)
            ORDER BY created_at DESC, seq DESC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(query.filter.category.as_deref())
            .bind(query.filter.owner.map(|o| *o.as_uuid()))
            .bind(query.filter.text.as_deref())
            .bind(query.min_price)
            .bind(query.max_price)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to query listings", &e))?;
        rows.iter().map(listing_from_row).collect()
    }

    async fn listings_by_owner(&self, owner_id: PrincipalId) -> Result<Vec<Listing>> {
        let sql = format!(
            "SELECT {LISTING_COLUMNS} FROM listings \
             WHERE owner_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at DESC, seq DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(owner_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list owner listings", &e))?;
        rows.iter().map(listing_from_row).collect()
    }

    async fn update_listing(
        &self,
        id: ListingId,
        changes: &ListingChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Listing>> {
        let sql = format!(
            r"
            UPDATE listings
            SET category = COALESCE($2, category),
                quantity = COALESCE($3, quantity),
                active = COALESCE($3, quantity) > 0,
                price = COALESCE($4, price),
                description = COALESCE($5, description),
                contact = COALESCE($6, contact),
                updated_at = $7
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {LISTING_COLUMNS}
            "
        );
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(changes.category.as_deref())
            .bind(changes.quantity.map(i64::from))
            .bind(changes.price)
            .bind(changes.description.as_deref())
            .bind(changes.contact.as_deref())
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to update listing", &e))?
            .map(|row| listing_from_row(&row))
            .transpose()
    }

    async fn debit(&self, id: ListingId, amount: u32, now: DateTime<Utc>) -> Result<Listing> {
        let mut tx = self.begin().await?;
        let sql = format!(
            r"
            UPDATE listings
            SET quantity = quantity - $2,
                active = (quantity - $2) > 0,
                updated_at = $3
            WHERE id = $1 AND deleted_at IS NULL AND quantity >= $2
            RETURNING {LISTING_COLUMNS}
            "
        );
        let mut locked = false;
        let row = loop {
            let row = sqlx::query(&sql)
                .bind(id.as_uuid())
                .bind(i64::from(amount))
                .bind(now)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to debit listing", &e))?;
            if let Some(row) = row {
                break row;
            }
            match lock_failed_debit(&mut tx, id, amount, None).await? {
                Some(reason) => return Err(reason),
                None if !locked => locked = true,
                None => return Err(unconverged_debit()),
            }
        };
        let listing = listing_from_row(&row)?;
        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit debit", &e))?;
        Ok(listing)
    }

    async fn credit(&self, id: ListingId, amount: u32, now: DateTime<Utc>) -> Result<Listing> {
        let sql = format!(
            r"
            UPDATE listings
            SET quantity = quantity + $2,
                active = (quantity + $2) > 0 AND deleted_at IS NULL,
                updated_at = $3
            WHERE id = $1
            RETURNING {LISTING_COLUMNS}
            "
        );
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(i64::from(amount))
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to credit listing", &e))?
            .map(|row| listing_from_row(&row))
            .transpose()?
            .ok_or(MarketError::ListingNotFound)
    }

    async fn delete_listing(
        &self,
        id: ListingId,
        policy: DeletePolicy,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = match policy {
            DeletePolicy::Cascade => sqlx::query("DELETE FROM listings WHERE id = $1")
                .bind(id.as_uuid())
                .execute(&self.pool)
                .await,
            DeletePolicy::SoftDelete => sqlx::query(
                "UPDATE listings SET deleted_at = $2, active = FALSE, updated_at = $2 \
                 WHERE id = $1 AND deleted_at IS NULL",
            )
            .bind(id.as_uuid())
            .bind(now)
            .execute(&self.pool)
            .await,
        }
        .map_err(|e| db_error("Failed to delete listing", &e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_owner_listings(
        &self,
        owner_id: PrincipalId,
        policy: DeletePolicy,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let result = match policy {
            DeletePolicy::Cascade => sqlx::query("DELETE FROM listings WHERE owner_id = $1")
                .bind(owner_id.as_uuid())
                .execute(&self.pool)
                .await,
            DeletePolicy::SoftDelete => sqlx::query(
                "UPDATE listings SET deleted_at = $2, active = FALSE, updated_at = $2 \
                 WHERE owner_id = $1 AND deleted_at IS NULL",
            )
            .bind(owner_id.as_uuid())
            .bind(now)
            .execute(&self.pool)
            .await,
        }
        .map_err(|e| db_error("Failed to delete owner listings", &e))?;
        to_usize(result.rows_affected())
    }

    async fn commit_order(&self, draft: &OrderDraft) -> Result<Order> {
        let mut tx = self.begin().await?;

        let mut locked = false;
        let debited = loop {
            let debited = sqlx::query(
                r"
                UPDATE listings
                SET quantity = quantity - $2,
                    active = (quantity - $2) > 0,
                    updated_at = $3
                WHERE id = $1
                  AND deleted_at IS NULL
                  AND quantity >= $2
                  AND owner_id <> $4
                RETURNING owner_id, price
                ",
            )
            .bind(draft.listing_id.as_uuid())
            .bind(i64::from(draft.quantity))
            .bind(draft.created_at)
            .bind(draft.buyer_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to debit listing", &e))?;
            if let Some(debited) = debited {
                break debited;
            }
            match lock_failed_debit(&mut tx, draft.listing_id, draft.quantity, Some(draft.buyer_id))
                .await?
            {
                Some(reason) => return Err(reason),
                None if !locked => locked = true,
                None => return Err(unconverged_debit()),
            }
        };
        let decode = |e: sqlx::Error| db_error("Failed to decode listing", &e);
        let seller_id = PrincipalId::from_uuid(debited.try_get("owner_id").map_err(decode)?);
        let unit_price: f64 = debited.try_get("price").map_err(decode)?;

        let order = Order::from_draft(draft, seller_id, unit_price);
        sqlx::query(
            r"
            INSERT INTO orders
                (id, listing_id, seller_id, buyer_id, quantity, unit_price, total,
                 status, payment_method, payment_status, shipping_address,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ",
        )
        .bind(order.id.as_uuid())
        .bind(order.listing_id.as_uuid())
        .bind(order.seller_id.as_uuid())
        .bind(order.buyer_id.as_uuid())
        .bind(i64::from(order.quantity))
        .bind(order.unit_price)
        .bind(order.total)
        .bind(order.status.as_str())
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.shipping_address.as_deref())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to create order", &e))?;

        // Dropping `tx` on any error above rolls the debit back.
        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit order", &e))?;
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to get order", &e))?
            .map(|row| order_from_row(&row))
            .transpose()
    }

    async fn list_orders(&self, scope: OrderScope) -> Result<Vec<Order>> {
        let (clause, principal) = match scope {
            OrderScope::Buyer(id) => ("WHERE buyer_id = $1", Some(id)),
            OrderScope::Seller(id) => ("WHERE seller_id = $1", Some(id)),
            OrderScope::All => ("", None),
        };
        let sql =
            format!("SELECT {ORDER_COLUMNS} FROM orders {clause} ORDER BY created_at DESC, seq DESC");
        let mut query = sqlx::query(&sql);
        if let Some(principal) = principal {
            query = query.bind(*principal.as_uuid());
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list orders", &e))?;
        rows.iter().map(order_from_row).collect()
    }

    async fn transition_order(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        restock: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>> {
        let mut tx = self.begin().await?;
        let sql = format!(
            "UPDATE orders SET status = $3, updated_at = $4 \
             WHERE id = $1 AND status = $2 RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(now)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to update order status", &e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let order = order_from_row(&row)?;

        if restock {
            sqlx::query(
                r"
                UPDATE listings
                SET quantity = quantity + $2,
                    active = (quantity + $2) > 0 AND deleted_at IS NULL,
                    updated_at = $3
                WHERE id = $1
                ",
            )
            .bind(order.listing_id.as_uuid())
            .bind(i64::from(order.quantity))
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to restock listing", &e))?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit status change", &e))?;
        Ok(Some(order))
    }

    async fn update_payment(
        &self,
        id: OrderId,
        from: PaymentStatus,
        to: PaymentStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>> {
        let sql = format!(
            "UPDATE orders SET payment_status = $3, updated_at = $4 \
             WHERE id = $1 AND payment_status = $2 RETURNING {ORDER_COLUMNS}"
        );
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to update payment status", &e))?
            .map(|row| order_from_row(&row))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_refusal_reasons() {
        let owner = PrincipalId::new();
        let buyer = PrincipalId::new();

        assert_eq!(
            debit_refusal(owner, 5, true, 1, Some(buyer)),
            Some(MarketError::ListingNotFound)
        );
        assert_eq!(
            debit_refusal(owner, 5, false, 1, Some(owner)),
            Some(MarketError::BuyerIsSeller)
        );
        assert_eq!(
            debit_refusal(owner, 2, false, 3, Some(buyer)),
            Some(MarketError::InsufficientStock {
                requested: 3,
                available: 2
            })
        );
    }

    #[test]
    fn test_restored_stock_is_not_a_refusal() {
        let owner = PrincipalId::new();
        assert_eq!(debit_refusal(owner, 3, false, 3, None), None);
        assert_eq!(debit_refusal(owner, 9, false, 3, Some(PrincipalId::new())), None);
    }
}
