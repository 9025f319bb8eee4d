//! # Bazaar Testing
//!
//! Testing utilities and helpers for the Bazaar marketplace crates.
//!
//! This crate provides:
//! - Clock implementations for deterministic and time-travel tests
//! - Tracing setup for tests
//! - Property-based testing strategies for stock movements
//!
//! ## Example
//!
//! ```ignore
//! use bazaar_testing::{ManualClock, init_test_tracing};
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn test_session_expires() {
//!     init_test_tracing();
//!     let clock = Arc::new(ManualClock::starting_at_test_epoch());
//!     let identity = IdentityService::in_memory(config, clock.clone());
//!
//!     let session = identity.authenticate(...).await?;
//!     clock.advance(chrono::Duration::hours(2));
//!     assert!(identity.current_principal(&session.token).await.is_err());
//! }
//! ```

use bazaar_core::environment::Clock;
use chrono::{DateTime, Utc};

/// Clock implementations for tests.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::RwLock;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use bazaar_testing::mocks::FixedClock;
    /// use bazaar_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Used for expiry tests: issue a session, advance past its TTL, and
    /// check it is rejected.
    ///
    /// # Example
    ///
    /// ```
    /// use bazaar_testing::mocks::ManualClock;
    /// use bazaar_core::environment::Clock;
    ///
    /// let clock = ManualClock::starting_at_test_epoch();
    /// let start = clock.now();
    /// clock.advance(chrono::Duration::minutes(5));
    /// assert_eq!(clock.now() - start, chrono::Duration::minutes(5));
    /// ```
    #[derive(Debug)]
    pub struct ManualClock {
        time: RwLock<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Create a clock frozen at `time`.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: RwLock::new(time),
            }
        }

        /// Create a clock frozen at [`test_epoch`].
        #[must_use]
        pub fn starting_at_test_epoch() -> Self {
            Self::new(test_epoch())
        }

        /// Move the clock forward (or backward, for negative durations).
        pub fn advance(&self, by: chrono::Duration) {
            let mut guard = match self.time.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *guard += by;
        }

        /// Jump to an absolute time.
        pub fn set(&self, time: DateTime<Utc>) {
            let mut guard = match self.time.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *guard = time;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            match self.time.read() {
                Ok(guard) => *guard,
                Err(poisoned) => *poisoned.into_inner(),
            }
        }
    }

    /// 2025-01-01 00:00:00 UTC, the starting point of every test clock.
    #[must_use]
    pub fn test_epoch() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default()
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_epoch())
    }
}

/// Test helpers and utilities
pub mod helpers {
    /// Install a compact `tracing` subscriber that writes through the test
    /// harness's captured output. Safe to call from every test.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// A single movement against a listing's stock.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum StockOp {
        /// Take units out (order placement).
        Debit(u32),
        /// Put units back (order cancellation).
        Credit(u32),
    }

    /// Any single stock movement of 1..=`max_units` units.
    pub fn stock_op(max_units: u32) -> impl Strategy<Value = StockOp> {
        prop_oneof![
            (1..=max_units).prop_map(StockOp::Debit),
            (1..=max_units).prop_map(StockOp::Credit),
        ]
    }

    /// Sequences of up to `max_len` stock movements.
    pub fn stock_ops(max_units: u32, max_len: usize) -> impl Strategy<Value = Vec<StockOp>> {
        proptest::collection::vec(stock_op(max_units), 0..=max_len)
    }

    /// Prices a listing may legally carry.
    pub fn listing_price() -> impl Strategy<Value = f64> {
        (1u32..=1_000_000).prop_map(|cents| f64::from(cents) / 100.0)
    }
}

// Re-export commonly used items
pub use helpers::init_test_tracing;
pub use mocks::{FixedClock, ManualClock, test_clock, test_epoch};
pub use properties::StockOp;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::starting_at_test_epoch();
        clock.advance(chrono::Duration::hours(1));
        assert_eq!(clock.now(), test_epoch() + chrono::Duration::hours(1));

        clock.set(test_epoch());
        assert_eq!(clock.now(), test_epoch());
    }

    #[test]
    fn test_epoch_is_new_year_2025() {
        assert_eq!(test_epoch().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }
}
