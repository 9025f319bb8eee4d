//! Property tests: stock movements against a simple counter model.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use async_trait::async_trait;
use bazaar_core::directory::DirectoryError;
use bazaar_core::{PrincipalDirectory, PrincipalId};
use bazaar_market::{ListingInput, MarketConfig, MarketError, Marketplace};
use bazaar_testing::properties::{listing_price, stock_ops};
use bazaar_testing::{StockOp, test_clock};
use proptest::prelude::*;
use std::sync::Arc;

struct Everyone;

#[async_trait]
impl PrincipalDirectory for Everyone {
    async fn principal_exists(&self, _: PrincipalId) -> Result<bool, DirectoryError> {
        Ok(true)
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

fn market() -> Marketplace {
    Marketplace::in_memory(
        Arc::new(Everyone),
        Arc::new(test_clock()),
        MarketConfig::default(),
    )
}

fn input(quantity: u32, price: f64) -> ListingInput {
    ListingInput {
        category: "Tools".into(),
        quantity: quantity.to_string(),
        price: price.to_string(),
        description: String::new(),
        contact: "owner@x.com".into(),
    }
}

proptest! {
    #[test]
    fn stock_follows_model(initial in 1u32..20, ops in stock_ops(8, 40)) {
        runtime().block_on(async {
            let market = market();
            let listing = market
                .listings
                .create_listing(PrincipalId::new(), input(initial, 1.0))
                .await
                .unwrap();

            let mut model = initial;
            for op in ops {
                match op {
                    StockOp::Debit(n) => {
                        let result = market.listings.debit(listing.id, n).await;
                        if n <= model {
                            model -= n;
                            prop_assert!(result.is_ok());
                        } else {
                            let is_insufficient =
                                matches!(result, Err(MarketError::InsufficientStock { .. }));
                            prop_assert!(is_insufficient);
                        }
                    }
                    StockOp::Credit(n) => {
                        market.listings.credit(listing.id, n).await.unwrap();
                        model += n;
                    }
                }
                let current = market.listings.get_by_id(listing.id).await.unwrap();
                prop_assert_eq!(current.quantity, model);
                prop_assert_eq!(current.active, model > 0);
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn order_total_is_price_times_quantity(price in listing_price(), quantity in 1u32..10) {
        runtime().block_on(async {
            let market = market();
            let listing = market
                .listings
                .create_listing(PrincipalId::new(), input(quantity, price))
                .await
                .unwrap();
            let order = market
                .orders
                .place_order(listing.id, PrincipalId::new(), i64::from(quantity))
                .await
                .unwrap();

            prop_assert!((order.unit_price - listing.price).abs() < f64::EPSILON);
            let expected = listing.price * f64::from(quantity);
            prop_assert!((order.total - expected).abs() < 1e-9);
            Ok::<(), TestCaseError>(())
        })?;
    }
}
