//! # Bazaar Market
//!
//! Listing inventory and the order ledger for the Bazaar marketplace.
//!
//! Listings carry stock. Orders debit that stock at placement and credit it
//! back on cancellation, inside a single store operation so concurrent
//! buyers can never oversell.
//!
//! ## Order lifecycle
//!
//! ```text
//! pending ──► confirmed ──► shipped ──► delivered
//!    │            │            │
//!    └────────────┴────────────┴──► cancelled   (stock restored)
//! ```
//!
//! ```rust
//! use bazaar_market::OrderStatus::*;
//!
//! assert!(Pending.can_transition_to(Confirmed));
//! assert!(Confirmed.can_transition_to(Cancelled));
//! assert!(!Delivered.can_transition_to(Cancelled));
//! assert!(Delivered.is_terminal());
//! ```
//!
//! ## Storage
//!
//! [`MarketRepository`] is implemented in memory by default and over
//! PostgreSQL behind the `postgres` feature.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod error;
pub mod listing;
pub mod metrics;
pub mod order;
pub mod payment;
pub mod repository;
pub mod stores;
pub mod types;
pub mod validation;

pub use config::{DeletePolicy, MarketConfig};
pub use error::{MarketError, Result};
pub use listing::ListingService;
pub use order::OrderService;
pub use payment::{PaymentMethodInfo, payment_methods};
pub use repository::MarketRepository;
pub use types::{
    Listing, ListingFilter, ListingInput, ListingPatch, Order, OrderStatus, PaymentMethod,
    PaymentStatus, PlaceOrder,
};

use bazaar_core::{Clock, PrincipalDirectory};
use std::sync::Arc;

/// Listing and order services sharing one store.
#[derive(Clone)]
pub struct Marketplace {
    /// Listing Inventory.
    pub listings: ListingService,
    /// Order Ledger and payment stub.
    pub orders: OrderService,
}

impl Marketplace {
    /// Wire both services to `repo`.
    #[must_use]
    pub fn new(
        repo: Arc<dyn MarketRepository>,
        directory: Arc<dyn PrincipalDirectory>,
        clock: Arc<dyn Clock>,
        config: MarketConfig,
    ) -> Self {
        Self {
            listings: ListingService::new(Arc::clone(&repo), directory, Arc::clone(&clock), config),
            orders: OrderService::new(repo, clock),
        }
    }

    /// Services over a fresh [`stores::InMemoryMarketStore`].
    #[must_use]
    pub fn in_memory(
        directory: Arc<dyn PrincipalDirectory>,
        clock: Arc<dyn Clock>,
        config: MarketConfig,
    ) -> Self {
        Self::new(
            Arc::new(stores::InMemoryMarketStore::new()),
            directory,
            clock,
            config,
        )
    }
}
