//! # Bazaar Core
//!
//! Shared building blocks for the Bazaar marketplace crates.
//!
//! The marketplace is split into three components that never reach into each
//! other's storage:
//!
//! ```text
//! ┌────────────────────┐   PrincipalDirectory   ┌────────────────────┐
//! │ Identity & Session │ ◄───────────────────── │ Listing Inventory  │
//! │   (bazaar-auth)    │                        │   + Order Ledger   │
//! └────────────────────┘                        │  (bazaar-market)   │
//!           ▲                                   └────────────────────┘
//!           │ Actor { principal_id, is_admin }            ▲
//!           └──────────── presentation layer ─────────────┘
//! ```
//!
//! This crate holds what both sides need to agree on:
//!
//! - **Identifiers**: [`PrincipalId`], [`ListingId`], [`OrderId`]
//! - **Caller identity**: [`Actor`]
//! - **Environment**: the [`environment::Clock`] trait injected into services
//! - **Seams**: [`directory::PrincipalDirectory`] and [`directory::OwnerCleanup`]
//! - **Error taxonomy**: [`ErrorKind`], which every component error maps onto

pub mod directory;
pub mod environment;
pub mod error;
pub mod ids;

pub use directory::{CleanupError, OwnerCleanup, PrincipalDirectory};
pub use environment::{Clock, SystemClock};
pub use error::ErrorKind;
pub use ids::{Actor, ListingId, OrderId, PrincipalId};

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
