//! Storage trait for listings and orders.
//!
//! Listings and orders live behind one trait because order placement and
//! cancellation must change both in a single unit.

use crate::config::DeletePolicy;
use crate::error::Result;
use crate::types::{
    Listing, ListingChanges, ListingQuery, Order, OrderDraft, OrderScope, OrderStatus,
    PaymentStatus,
};
use async_trait::async_trait;
use bazaar_core::{ListingId, OrderId, PrincipalId};
use chrono::{DateTime, Utc};

/// Market storage.
///
/// # Implementation Notes
///
/// - Every method is atomic on its own
/// - Reads return soft-deleted listings; writes treat them as missing
/// - List results are newest first
#[async_trait]
pub trait MarketRepository: Send + Sync {
    // ═══════════════════════════════════════════════════════════════════════
    // Listings
    // ═══════════════════════════════════════════════════════════════════════

    /// Store a new listing.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    async fn insert_listing(&self, listing: &Listing) -> Result<()>;

    /// Get listing by ID, regardless of state.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    async fn get_listing(&self, id: ListingId) -> Result<Option<Listing>>;

    /// Active listings matching `query`.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    async fn query_listings(&self, query: &ListingQuery) -> Result<Vec<Listing>>;

    /// An owner's listings, active or not, excluding deleted ones.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    async fn listings_by_owner(&self, owner_id: PrincipalId) -> Result<Vec<Listing>>;

    /// Apply edits in one step, recomputing `active`.
    ///
    /// # Returns
    ///
    /// The updated listing, or `None` if missing or deleted.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    async fn update_listing(
        &self,
        id: ListingId,
        changes: &ListingChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Listing>>;

    /// Decrement stock by `amount` if at least `amount` remains.
    ///
    /// # Errors
    ///
    /// - `MarketError::ListingNotFound` if missing or deleted
    /// - `MarketError::InsufficientStock` if `amount` exceeds the stock
    async fn debit(&self, id: ListingId, amount: u32, now: DateTime<Utc>) -> Result<Listing>;

    /// Increment stock by `amount`.
    ///
    /// # Errors
    ///
    /// - `MarketError::ListingNotFound` if missing
    async fn credit(&self, id: ListingId, amount: u32, now: DateTime<Utc>) -> Result<Listing>;

    /// Delete a listing under `policy`.
    ///
    /// # Returns
    ///
    /// `true` if a live listing was deleted.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    async fn delete_listing(
        &self,
        id: ListingId,
        policy: DeletePolicy,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Delete every live listing of `owner_id` under `policy`.
    ///
    /// # Returns
    ///
    /// Number of listings deleted.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    async fn delete_owner_listings(
        &self,
        owner_id: PrincipalId,
        policy: DeletePolicy,
        now: DateTime<Utc>,
    ) -> Result<usize>;

    // ═══════════════════════════════════════════════════════════════════════
    // Orders
    // ═══════════════════════════════════════════════════════════════════════

    /// Debit the listing and record the order as one unit.
    ///
    /// Seller and unit price are taken from the listing as it is debited.
    ///
    /// # Errors
    ///
    /// - `MarketError::ListingNotFound` if missing or deleted
    /// - `MarketError::BuyerIsSeller` if the buyer owns the listing
    /// - `MarketError::InsufficientStock` if the stock is too low
    ///
    /// On any error nothing is written.
    async fn commit_order(&self, draft: &OrderDraft) -> Result<Order>;

    /// Get order by ID.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Orders in `scope`, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    async fn list_orders(&self, scope: OrderScope) -> Result<Vec<Order>>;

    /// Move an order from `from` to `to` if it is still in `from`. With
    /// `restock`, the order's quantity is credited back to its listing in the
    /// same unit.
    ///
    /// # Returns
    ///
    /// The updated order, or `None` if missing or no longer in `from`.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    async fn transition_order(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        restock: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>>;

    /// Move an order's payment status from `from` to `to` if unchanged.
    ///
    /// # Returns
    ///
    /// The updated order, or `None` if missing or no longer in `from`.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    async fn update_payment(
        &self,
        id: OrderId,
        from: PaymentStatus,
        to: PaymentStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>>;
}
