//! In-memory market store.

use crate::config::DeletePolicy;
use crate::error::{MarketError, Result};
use crate::repository::MarketRepository;
use crate::types::{
    Listing, ListingChanges, ListingQuery, Order, OrderDraft, OrderScope, OrderStatus,
    PaymentStatus,
};
use async_trait::async_trait;
use bazaar_core::{ListingId, OrderId, PrincipalId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// A stored row plus its insertion sequence, the tie-breaker for
/// newest-first ordering.
#[derive(Debug, Clone)]
struct Row<T> {
    seq: u64,
    value: T,
}

#[derive(Debug, Default)]
struct Tables {
    next_seq: u64,
    listings: HashMap<ListingId, Row<Listing>>,
    orders: HashMap<OrderId, Row<Order>>,
}

impl Tables {
    fn seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn live_listing_mut(&mut self, id: ListingId) -> Result<&mut Listing> {
        self.listings
            .get_mut(&id)
            .map(|row| &mut row.value)
            .filter(|listing| !listing.is_deleted())
            .ok_or(MarketError::ListingNotFound)
    }

    fn delete(&mut self, id: ListingId, policy: DeletePolicy, now: DateTime<Utc>) -> bool {
        match policy {
            DeletePolicy::Cascade => {
                if self.listings.remove(&id).is_none() {
                    return false;
                }
                self.orders.retain(|_, row| row.value.listing_id != id);
                true
            }
            DeletePolicy::SoftDelete => match self.listings.get_mut(&id) {
                Some(row) if !row.value.is_deleted() => {
                    row.value.mark_deleted(now);
                    true
                }
                _ => false,
            },
        }
    }
}

fn newest_first<T: Clone>(mut rows: Vec<&Row<T>>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    rows.sort_by(|a, b| {
        created_at(&b.value)
            .cmp(&created_at(&a.value))
            .then(b.seq.cmp(&a.seq))
    });
    rows.into_iter().map(|row| row.value.clone()).collect()
}

/// In-memory market store.
///
/// Listings and orders share one lock; every method runs to completion
/// under it, which makes debit-and-insert and status-and-credit atomic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMarketStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryMarketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| MarketError::Infrastructure("market table lock poisoned".to_string()))
    }
}

#[async_trait]
impl MarketRepository for InMemoryMarketStore {
    async fn insert_listing(&self, listing: &Listing) -> Result<()> {
        let mut tables = self.lock()?;
        let seq = tables.seq();
        tables.listings.insert(
            listing.id,
            Row {
                seq,
                value: listing.clone(),
            },
        );
        Ok(())
    }

    async fn get_listing(&self, id: ListingId) -> Result<Option<Listing>> {
        Ok(self.lock()?.listings.get(&id).map(|row| row.value.clone()))
    }

    async fn query_listings(&self, query: &ListingQuery) -> Result<Vec<Listing>> {
        let tables = self.lock()?;
        let rows = tables
            .listings
            .values()
            .filter(|row| query.matches(&row.value))
            .collect();
        Ok(newest_first(rows, |l| l.created_at))
    }

    async fn listings_by_owner(&self, owner_id: PrincipalId) -> Result<Vec<Listing>> {
        let tables = self.lock()?;
        let rows = tables
            .listings
            .values()
            .filter(|row| row.value.owner_id == owner_id && !row.value.is_deleted())
            .collect();
        Ok(newest_first(rows, |l| l.created_at))
    }

    async fn update_listing(
        &self,
        id: ListingId,
        changes: &ListingChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Listing>> {
        let mut tables = self.lock()?;
        match tables.live_listing_mut(id) {
            Ok(listing) => {
                listing.apply(changes, now);
                Ok(Some(listing.clone()))
            }
            Err(MarketError::ListingNotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn debit(&self, id: ListingId, amount: u32, now: DateTime<Utc>) -> Result<Listing> {
        let mut tables = self.lock()?;
        let listing = tables.live_listing_mut(id)?;
        listing.debit(amount, now)?;
        Ok(listing.clone())
    }

    async fn credit(&self, id: ListingId, amount: u32, now: DateTime<Utc>) -> Result<Listing> {
        let mut tables = self.lock()?;
        let listing = tables
            .listings
            .get_mut(&id)
            .map(|row| &mut row.value)
            .ok_or(MarketError::ListingNotFound)?;
        listing.credit(amount, now)?;
        Ok(listing.clone())
    }

    async fn delete_listing(
        &self,
        id: ListingId,
        policy: DeletePolicy,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(self.lock()?.delete(id, policy, now))
    }

    async fn delete_owner_listings(
        &self,
        owner_id: PrincipalId,
        policy: DeletePolicy,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let mut tables = self.lock()?;
        let owned: Vec<ListingId> = tables
            .listings
            .values()
            .filter(|row| row.value.owner_id == owner_id)
            .map(|row| row.value.id)
            .collect();
        Ok(owned
            .into_iter()
            .filter(|id| tables.delete(*id, policy, now))
            .count())
    }

    async fn commit_order(&self, draft: &OrderDraft) -> Result<Order> {
        let mut tables = self.lock()?;
        let listing = tables.live_listing_mut(draft.listing_id)?;
        if listing.owner_id == draft.buyer_id {
            return Err(MarketError::BuyerIsSeller);
        }
        // Nothing has been written if this fails.
        listing.debit(draft.quantity, draft.created_at)?;
        let order = Order::from_draft(draft, listing.owner_id, listing.price);

        let seq = tables.seq();
        tables.orders.insert(
            order.id,
            Row {
                seq,
                value: order.clone(),
            },
        );
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.lock()?.orders.get(&id).map(|row| row.value.clone()))
    }

    async fn list_orders(&self, scope: OrderScope) -> Result<Vec<Order>> {
        let tables = self.lock()?;
        let rows = tables
            .orders
            .values()
            .filter(|row| scope.includes(&row.value))
            .collect();
        Ok(newest_first(rows, |o| o.created_at))
    }

    async fn transition_order(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        restock: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>> {
        let mut guard = self.lock()?;
        let tables = &mut *guard;

        let Some(row) = tables.orders.get_mut(&id) else {
            return Ok(None);
        };
        let order = &mut row.value;
        if order.status != from {
            return Ok(None);
        }

        if restock {
            // A cascaded delete would have removed the order too, so a
            // missing listing here means it was purged; nothing to restore.
            if let Some(listing) = tables.listings.get_mut(&order.listing_id) {
                listing.value.credit(order.quantity, now)?;
            }
        }
        order.status = to;
        order.updated_at = now;
        Ok(Some(order.clone()))
    }

    async fn update_payment(
        &self,
        id: OrderId,
        from: PaymentStatus,
        to: PaymentStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>> {
        let mut tables = self.lock()?;
        let Some(row) = tables.orders.get_mut(&id) else {
            return Ok(None);
        };
        if row.value.payment_status != from {
            return Ok(None);
        }
        row.value.payment_status = to;
        row.value.updated_at = now;
        Ok(Some(row.value.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::PaymentMethod;
    use bazaar_testing::test_epoch;

    fn listing(owner: PrincipalId, quantity: u32) -> Listing {
        Listing {
            id: ListingId::new(),
            owner_id: owner,
            category: "Lamp".into(),
            quantity,
            price: 4.0,
            description: String::new(),
            contact: "c".into(),
            active: true,
            created_at: test_epoch(),
            updated_at: test_epoch(),
            deleted_at: None,
        }
    }

    fn draft(listing_id: ListingId, buyer_id: PrincipalId, quantity: u32) -> OrderDraft {
        OrderDraft {
            id: OrderId::new(),
            listing_id,
            buyer_id,
            quantity,
            payment_method: PaymentMethod::Cash,
            shipping_address: None,
            created_at: test_epoch(),
        }
    }

    #[tokio::test]
    async fn test_failed_commit_writes_nothing() {
        let store = InMemoryMarketStore::new();
        let seller = PrincipalId::new();
        let l = listing(seller, 2);
        store.insert_listing(&l).await.unwrap();

        let err = store
            .commit_order(&draft(l.id, PrincipalId::new(), 3))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::InsufficientStock { available: 2, .. }));
        assert_eq!(store.get_listing(l.id).await.unwrap().unwrap().quantity, 2);
        assert!(store.list_orders(OrderScope::All).await.unwrap().is_empty());

        assert_eq!(
            store.commit_order(&draft(l.id, seller, 1)).await,
            Err(MarketError::BuyerIsSeller)
        );
    }

    #[tokio::test]
    async fn test_equal_timestamps_fall_back_to_insertion_order() {
        let store = InMemoryMarketStore::new();
        let owner = PrincipalId::new();
        let first = listing(owner, 1);
        let second = listing(owner, 1);
        store.insert_listing(&first).await.unwrap();
        store.insert_listing(&second).await.unwrap();

        let ids: Vec<ListingId> = store
            .query_listings(&ListingQuery::default())
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_transition_is_compare_and_swap() {
        let store = InMemoryMarketStore::new();
        let l = listing(PrincipalId::new(), 5);
        store.insert_listing(&l).await.unwrap();
        let order = store
            .commit_order(&draft(l.id, PrincipalId::new(), 2))
            .await
            .unwrap();

        let cancelled = store
            .transition_order(order.id, OrderStatus::Pending, OrderStatus::Cancelled, true, test_epoch())
            .await
            .unwrap();
        assert_eq!(cancelled.map(|o| o.status), Some(OrderStatus::Cancelled));

        // Second attempt from the stale status does nothing, and does not
        // restock twice.
        let again = store
            .transition_order(order.id, OrderStatus::Pending, OrderStatus::Cancelled, true, test_epoch())
            .await
            .unwrap();
        assert!(again.is_none());
        assert_eq!(store.get_listing(l.id).await.unwrap().unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn test_delete_owner_listings_under_both_policies() {
        let store = InMemoryMarketStore::new();
        let owner = PrincipalId::new();
        for _ in 0..3 {
            store.insert_listing(&listing(owner, 1)).await.unwrap();
        }
        store.insert_listing(&listing(PrincipalId::new(), 1)).await.unwrap();

        assert_eq!(
            store
                .delete_owner_listings(owner, DeletePolicy::SoftDelete, test_epoch())
                .await
                .unwrap(),
            3
        );
        // Already soft-deleted: nothing left to delete softly.
        assert_eq!(
            store
                .delete_owner_listings(owner, DeletePolicy::SoftDelete, test_epoch())
                .await
                .unwrap(),
            0
        );
        assert_eq!(
            store
                .delete_owner_listings(owner, DeletePolicy::Cascade, test_epoch())
                .await
                .unwrap(),
            3
        );
        assert_eq!(store.query_listings(&ListingQuery::default()).await.unwrap().len(), 1);
    }
}
