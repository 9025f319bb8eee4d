//! Order Ledger: place, cancel and progress orders.

use crate::error::{MarketError, Result};
use crate::metrics;
use crate::repository::MarketRepository;
use crate::types::{Order, OrderDraft, OrderScope, OrderStatus, PlaceOrder};
use bazaar_core::{Actor, Clock, ListingId, OrderId, PrincipalId};
use std::sync::Arc;

/// Order Ledger component.
///
/// Also carries the payment stub; see [`crate::payment`].
#[derive(Clone)]
pub struct OrderService {
    pub(crate) repo: Arc<dyn MarketRepository>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl OrderService {
    /// Create a service over `repo`.
    #[must_use]
    pub fn new(repo: Arc<dyn MarketRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Buy `quantity` units of a listing, paying cash, no shipping address.
    ///
    /// # Errors
    ///
    /// See [`Self::place_order_with`].
    pub async fn place_order(
        &self,
        listing_id: ListingId,
        buyer_id: PrincipalId,
        quantity: i64,
    ) -> Result<Order> {
        self.place_order_with(PlaceOrder::new(listing_id, buyer_id, quantity))
            .await
    }

    /// Place an order, debiting the listing in the same store operation.
    ///
    /// Checks run in this order, and the first failure wins:
    ///
    /// 1. listing exists → [`MarketError::ListingNotFound`]
    /// 2. buyer is not the owner → [`MarketError::BuyerIsSeller`]
    /// 3. quantity positive → [`MarketError::InvalidQuantity`]
    /// 4. quantity within stock → [`MarketError::InsufficientStock`]
    ///
    /// # Errors
    ///
    /// As listed above, plus storage failures.
    #[tracing::instrument(
        skip(self, request),
        fields(listing_id = %request.listing_id, buyer_id = %request.buyer_id, quantity = request.quantity)
    )]
    pub async fn place_order_with(&self, request: PlaceOrder) -> Result<Order> {
        let listing = self
            .repo
            .get_listing(request.listing_id)
            .await?
            .filter(|l| !l.is_deleted())
            .ok_or(MarketError::ListingNotFound)?;

        if listing.owner_id == request.buyer_id {
            tracing::warn!("Seller attempted to buy own listing");
            return Err(MarketError::BuyerIsSeller);
        }
        if request.quantity <= 0 {
            return Err(MarketError::InvalidQuantity);
        }
        let insufficient = MarketError::InsufficientStock {
            requested: request.quantity,
            available: listing.quantity,
        };
        let quantity = u32::try_from(request.quantity).map_err(|_| insufficient.clone())?;
        if quantity > listing.quantity {
            return Err(insufficient);
        }

        // The store re-checks stock atomically; the listing read above may
        // already be stale.
        let draft = OrderDraft {
            id: OrderId::new(),
            listing_id: request.listing_id,
            buyer_id: request.buyer_id,
            quantity,
            payment_method: request.payment_method,
            shipping_address: request
                .shipping_address
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
            created_at: self.clock.now(),
        };
        let order = self.repo.commit_order(&draft).await?;

        metrics::record_order_placed(order.quantity);
        tracing::info!(
            order_id = %order.id,
            unit_price = order.unit_price,
            "Order placed"
        );
        Ok(order)
    }

    /// Buyer cancels a pending order; stock is restored.
    ///
    /// # Errors
    ///
    /// [`MarketError::OrderNotFound`], [`MarketError::Forbidden`] for anyone
    /// but the buyer, [`MarketError::WrongState`] unless pending.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId, actor_id: PrincipalId) -> Result<Order> {
        let order = self.load(order_id).await?;
        if order.buyer_id != actor_id {
            tracing::warn!("Cancellation refused: not the buyer");
            return Err(MarketError::Forbidden);
        }
        if order.status != OrderStatus::Pending {
            return Err(MarketError::WrongState {
                status: order.status,
            });
        }

        match self
            .repo
            .transition_order(
                order_id,
                OrderStatus::Pending,
                OrderStatus::Cancelled,
                true,
                self.clock.now(),
            )
            .await?
        {
            Some(cancelled) => {
                metrics::record_order_status(OrderStatus::Cancelled, cancelled.quantity);
                tracing::info!(listing_id = %cancelled.listing_id, "Order cancelled by buyer");
                Ok(cancelled)
            }
            // Lost a race with another transition.
            None => Err(MarketError::WrongState {
                status: self.load(order_id).await?.status,
            }),
        }
    }

    /// Seller moves an order along the status machine. Cancelling restores
    /// stock.
    ///
    /// # Errors
    ///
    /// [`MarketError::OrderNotFound`], [`MarketError::Forbidden`] for anyone
    /// but the seller, [`MarketError::InvalidTransition`] for a non-edge.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        actor_id: PrincipalId,
        new_status: OrderStatus,
    ) -> Result<Order> {
        let order = self.load(order_id).await?;
        if order.seller_id != actor_id {
            tracing::warn!("Status change refused: not the seller");
            return Err(MarketError::Forbidden);
        }
        if !order.status.can_transition_to(new_status) {
            return Err(MarketError::InvalidTransition {
                from: order.status,
                to: new_status,
            });
        }

        let restock = new_status == OrderStatus::Cancelled;
        match self
            .repo
            .transition_order(order_id, order.status, new_status, restock, self.clock.now())
            .await?
        {
            Some(updated) => {
                metrics::record_order_status(new_status, updated.quantity);
                tracing::info!(from = %order.status, to = %new_status, "Order status changed");
                Ok(updated)
            }
            None => Err(MarketError::InvalidTransition {
                from: self.load(order_id).await?.status,
                to: new_status,
            }),
        }
    }

    /// Orders placed by `buyer_id`, newest first.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    pub async fn orders_by_buyer(&self, buyer_id: PrincipalId) -> Result<Vec<Order>> {
        self.repo.list_orders(OrderScope::Buyer(buyer_id)).await
    }

    /// Orders against `seller_id`'s listings, newest first.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    pub async fn orders_by_seller(&self, seller_id: PrincipalId) -> Result<Vec<Order>> {
        self.repo.list_orders(OrderScope::Seller(seller_id)).await
    }

    /// Every order (admin only).
    ///
    /// # Errors
    ///
    /// [`MarketError::Forbidden`] for non-admins.
    pub async fn all_orders(&self, actor: Actor) -> Result<Vec<Order>> {
        if !actor.is_admin {
            return Err(MarketError::Forbidden);
        }
        self.repo.list_orders(OrderScope::All).await
    }

    /// One order, if the actor may see it.
    ///
    /// # Errors
    ///
    /// [`MarketError::OrderNotFound`] if missing or not visible, so existence
    /// is not revealed.
    pub async fn get_order(&self, order_id: OrderId, actor: Actor) -> Result<Order> {
        let order = self.load(order_id).await?;
        if !order.is_visible_to(&actor) {
            tracing::debug!(order_id = %order_id, "Order hidden from caller");
            return Err(MarketError::OrderNotFound);
        }
        Ok(order)
    }

    pub(crate) async fn load(&self, order_id: OrderId) -> Result<Order> {
        self.repo
            .get_order(order_id)
            .await?
            .ok_or(MarketError::OrderNotFound)
    }
}
