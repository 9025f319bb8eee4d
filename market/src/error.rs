//! Error types for listing, order and payment operations.

use crate::types::{OrderStatus, PaymentStatus};
use bazaar_core::ErrorKind;
use thiserror::Error;

/// Result type alias for market operations.
pub type Result<T> = std::result::Result<T, MarketError>;

/// Market errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MarketError {
    // ═══════════════════════════════════════════════════════════
    // Validation Errors
    // ═══════════════════════════════════════════════════════════

    /// A required text field was blank.
    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the missing field
        field: &'static str,
    },

    /// Quantity did not parse as a positive integer.
    #[error("Quantity must be a positive whole number")]
    InvalidQuantity,

    /// Price did not parse as a positive finite number.
    #[error("Price must be a positive number")]
    InvalidPrice,

    // ═══════════════════════════════════════════════════════════
    // Lookup Errors
    // ═══════════════════════════════════════════════════════════

    /// The listing owner is not a registered principal.
    #[error("Owner not found")]
    OwnerNotFound,

    /// No such listing (or it was deleted).
    #[error("Listing not found")]
    ListingNotFound,

    /// No such order, or not visible to the caller.
    #[error("Order not found")]
    OrderNotFound,

    // ═══════════════════════════════════════════════════════════
    // Authorization Errors
    // ═══════════════════════════════════════════════════════════

    /// The caller may not act on this listing or order.
    #[error("Unauthorized access")]
    Forbidden,

    // ═══════════════════════════════════════════════════════════
    // Business Rule Errors
    // ═══════════════════════════════════════════════════════════

    /// A seller tried to buy their own listing.
    #[error("You cannot purchase your own product")]
    BuyerIsSeller,

    /// Not enough stock left.
    #[error("Not enough quantity available: requested {requested}, available {available}")]
    InsufficientStock {
        /// Units asked for
        requested: i64,
        /// Units remaining
        available: u32,
    },

    /// The order's status does not permit the operation.
    #[error("Order cannot be changed while {status}")]
    WrongState {
        /// Current status
        status: OrderStatus,
    },

    /// The requested status change is not an edge of the state machine.
    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition {
        /// Current status
        from: OrderStatus,
        /// Requested status
        to: OrderStatus,
    },

    /// The order is already paid.
    #[error("Order is already paid")]
    AlreadyPaid,

    /// The requested payment status change is not allowed.
    #[error("Cannot change payment status from {from} to {to}")]
    PaymentTransition {
        /// Current payment status
        from: PaymentStatus,
        /// Requested payment status
        to: PaymentStatus,
    },

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Storage failed.
    #[error("Market backend error: {0}")]
    Infrastructure(String),
}

impl MarketError {
    /// Classify this error for the presentation layer.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField { .. } | Self::InvalidQuantity | Self::InvalidPrice => {
                ErrorKind::Validation
            }
            Self::OwnerNotFound | Self::ListingNotFound | Self::OrderNotFound => {
                ErrorKind::NotFound
            }
            Self::Forbidden => ErrorKind::Forbidden,
            Self::BuyerIsSeller | Self::InsufficientStock { .. } => ErrorKind::Conflict,
            Self::WrongState { .. }
            | Self::InvalidTransition { .. }
            | Self::AlreadyPaid
            | Self::PaymentTransition { .. } => ErrorKind::State,
            Self::Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }
}
