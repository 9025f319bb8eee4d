//! Business metrics for the marketplace.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `bazaar_listings_created_total` - listings created
//! - `bazaar_orders_total{status}` - orders by status (placed, confirmed,
//!   shipped, delivered, cancelled)
//! - `bazaar_units_sold_total` - units debited by order placement
//! - `bazaar_units_restocked_total` - units credited back by cancellation
//! - `bazaar_payments_total{status}` - payment status changes

use crate::types::{OrderStatus, PaymentStatus};
use metrics::describe_counter;

/// Initialize and register all market metric descriptions.
///
/// Call once at application startup, before any metrics are recorded.
pub fn register_market_metrics() {
    describe_counter!(
        "bazaar_listings_created_total",
        "Total number of listings created"
    );
    describe_counter!(
        "bazaar_orders_total",
        "Total number of orders by status (placed, confirmed, shipped, delivered, cancelled)"
    );
    describe_counter!(
        "bazaar_units_sold_total",
        "Total number of units debited by order placement"
    );
    describe_counter!(
        "bazaar_units_restocked_total",
        "Total number of units returned to stock by cancellation"
    );
    describe_counter!(
        "bazaar_payments_total",
        "Total number of payment status changes by resulting status"
    );

    tracing::info!("Market metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a listing creation.
pub fn record_listing_created() {
    metrics::counter!("bazaar_listings_created_total").increment(1);
}

/// Record an order placement.
pub fn record_order_placed(quantity: u32) {
    metrics::counter!("bazaar_orders_total", "status" => "placed").increment(1);
    metrics::counter!("bazaar_units_sold_total").increment(u64::from(quantity));
    tracing::debug!(quantity, "Recorded order_placed metric");
}

/// Record an order status change. Cancellation also counts restocked units.
pub fn record_order_status(status: OrderStatus, quantity: u32) {
    metrics::counter!("bazaar_orders_total", "status" => status.as_str()).increment(1);
    if status == OrderStatus::Cancelled {
        metrics::counter!("bazaar_units_restocked_total").increment(u64::from(quantity));
    }
}

/// Record a payment status change.
pub fn record_payment(status: PaymentStatus) {
    metrics::counter!("bazaar_payments_total", "status" => status.as_str()).increment(1);
}
