//! Payment stub. Records how an order is paid; no gateway is contacted.

use crate::error::{MarketError, Result};
use crate::metrics;
use crate::order::OrderService;
use crate::types::{Order, OrderStatus, PaymentMethod, PaymentStatus};
use bazaar_core::{OrderId, PrincipalId};
use serde::Serialize;

/// A payment method as presented to buyers.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentMethodInfo {
    /// Wire identifier.
    pub id: PaymentMethod,
    /// Display name.
    pub name: &'static str,
    /// Explanation.
    pub description: &'static str,
}

/// Every supported payment method.
#[must_use]
pub fn payment_methods() -> Vec<PaymentMethodInfo> {
    PaymentMethod::ALL
        .into_iter()
        .map(|method| PaymentMethodInfo {
            id: method,
            name: method.name(),
            description: method.description(),
        })
        .collect()
}

impl OrderService {
    /// Buyer submits payment with the order's method.
    ///
    /// Cash stays `pending` until delivery, bank transfers await seller
    /// verification, cards are recorded as paid.
    ///
    /// # Errors
    ///
    /// - [`MarketError::OrderNotFound`], [`MarketError::Forbidden`]
    /// - [`MarketError::WrongState`] for cancelled orders
    /// - [`MarketError::AlreadyPaid`]
    /// - [`MarketError::PaymentTransition`] after a failed payment
    #[tracing::instrument(skip(self))]
    pub async fn submit_payment(&self, order_id: OrderId, buyer_id: PrincipalId) -> Result<Order> {
        let order = self.load(order_id).await?;
        if order.buyer_id != buyer_id {
            return Err(MarketError::Forbidden);
        }
        if order.status == OrderStatus::Cancelled {
            return Err(MarketError::WrongState {
                status: order.status,
            });
        }
        if order.payment_status == PaymentStatus::Paid {
            return Err(MarketError::AlreadyPaid);
        }

        let target = order.payment_method.submitted_status();
        if order.payment_status == target {
            return Ok(order);
        }
        self.move_payment(order, target).await
    }

    /// Seller confirms or rejects a bank transfer.
    ///
    /// # Errors
    ///
    /// - [`MarketError::OrderNotFound`], [`MarketError::Forbidden`]
    /// - [`MarketError::PaymentTransition`] unless awaiting verification
    #[tracing::instrument(skip(self))]
    pub async fn verify_payment(
        &self,
        order_id: OrderId,
        seller_id: PrincipalId,
        verified: bool,
    ) -> Result<Order> {
        let order = self.load(order_id).await?;
        if order.seller_id != seller_id {
            return Err(MarketError::Forbidden);
        }
        let target = if verified {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Failed
        };
        if order.payment_status != PaymentStatus::PendingVerification {
            return Err(MarketError::PaymentTransition {
                from: order.payment_status,
                to: target,
            });
        }
        self.move_payment(order, target).await
    }

    async fn move_payment(&self, order: Order, target: PaymentStatus) -> Result<Order> {
        if !order.payment_status.can_transition_to(target) {
            return Err(MarketError::PaymentTransition {
                from: order.payment_status,
                to: target,
            });
        }
        let updated = self
            .repo
            .update_payment(order.id, order.payment_status, target, self.clock.now())
            .await?;
        match updated {
            Some(updated) => {
                metrics::record_payment(target);
                tracing::info!(order_id = %order.id, status = %target, "Payment status changed");
                Ok(updated)
            }
            None => Err(MarketError::PaymentTransition {
                from: self.load(order.id).await?.payment_status,
                to: target,
            }),
        }
    }
}
