//! Listings, orders and their status machines.

use crate::error::{MarketError, Result};
use bazaar_core::{ListingId, OrderId, PrincipalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════
// Listings
// ═══════════════════════════════════════════════════════════════════════

/// A quantity-bearing item for sale.
///
/// `active == (quantity > 0)` after every mutation, except that a
/// soft-deleted listing is always inactive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Listing ID.
    pub id: ListingId,
    /// Owning principal.
    pub owner_id: PrincipalId,
    /// Free-text category; doubles as the title.
    pub category: String,
    /// Remaining stock.
    pub quantity: u32,
    /// Unit price.
    pub price: f64,
    /// Free-text description.
    pub description: String,
    /// How to reach the seller.
    pub contact: String,
    /// Shown in browse and search.
    pub active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
    /// Set when soft-deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Listing {
    /// Returns `true` once soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Set the stock and recompute `active`.
    pub fn set_quantity(&mut self, quantity: u32, now: DateTime<Utc>) {
        self.quantity = quantity;
        self.active = quantity > 0 && !self.is_deleted();
        self.updated_at = now;
    }

    /// Take `amount` units out of stock.
    ///
    /// # Errors
    ///
    /// [`MarketError::ListingNotFound`] if soft-deleted,
    /// [`MarketError::InsufficientStock`] if `amount` exceeds the stock.
    pub fn debit(&mut self, amount: u32, now: DateTime<Utc>) -> Result<()> {
        if self.is_deleted() {
            return Err(MarketError::ListingNotFound);
        }
        let remaining = self
            .quantity
            .checked_sub(amount)
            .ok_or(MarketError::InsufficientStock {
                requested: i64::from(amount),
                available: self.quantity,
            })?;
        self.set_quantity(remaining, now);
        Ok(())
    }

    /// Put `amount` units back into stock.
    ///
    /// # Errors
    ///
    /// [`MarketError::InvalidQuantity`] if the stock would overflow.
    pub fn credit(&mut self, amount: u32, now: DateTime<Utc>) -> Result<()> {
        let restored = self
            .quantity
            .checked_add(amount)
            .ok_or(MarketError::InvalidQuantity)?;
        self.set_quantity(restored, now);
        Ok(())
    }

    /// Mark soft-deleted.
    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.deleted_at = Some(now);
        self.active = false;
        self.updated_at = now;
    }

    /// Apply validated edits.
    pub fn apply(&mut self, changes: &ListingChanges, now: DateTime<Utc>) {
        if let Some(category) = &changes.category {
            self.category.clone_from(category);
        }
        if let Some(price) = changes.price {
            self.price = price;
        }
        if let Some(description) = &changes.description {
            self.description.clone_from(description);
        }
        if let Some(contact) = &changes.contact {
            self.contact.clone_from(contact);
        }
        let quantity = changes.quantity.unwrap_or(self.quantity);
        self.set_quantity(quantity, now);
    }
}

/// Raw listing fields as submitted. Numbers arrive as text so that parse
/// failures can be reported precisely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingInput {
    /// Category / title.
    pub category: String,
    /// Quantity, as text.
    pub quantity: String,
    /// Unit price, as text.
    pub price: String,
    /// Description (may be empty).
    #[serde(default)]
    pub description: String,
    /// Contact details.
    pub contact: String,
}

/// Raw listing edits. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingPatch {
    /// New category.
    #[serde(default)]
    pub category: Option<String>,
    /// New quantity, as text.
    #[serde(default)]
    pub quantity: Option<String>,
    /// New price, as text.
    #[serde(default)]
    pub price: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New contact.
    #[serde(default)]
    pub contact: Option<String>,
}

/// Validated listing edits, applied atomically by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingChanges {
    /// New category.
    pub category: Option<String>,
    /// New quantity.
    pub quantity: Option<u32>,
    /// New price.
    pub price: Option<f64>,
    /// New description.
    pub description: Option<String>,
    /// New contact.
    pub contact: Option<String>,
}

/// Browse filter. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListingFilter {
    /// Exact category.
    #[serde(default)]
    pub category: Option<String>,
    /// Owner.
    #[serde(default)]
    pub owner: Option<PrincipalId>,
    /// Case-sensitive substring of the category.
    #[serde(default)]
    pub text: Option<String>,
}

/// A query over active listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingQuery {
    /// Field filters.
    pub filter: ListingFilter,
    /// Inclusive lower price bound.
    pub min_price: Option<f64>,
    /// Inclusive upper price bound.
    pub max_price: Option<f64>,
}

impl ListingQuery {
    /// Returns `true` if `listing` is active and passes every filter.
    #[must_use]
    pub fn matches(&self, listing: &Listing) -> bool {
        let filter = &self.filter;
        listing.active
            && filter.category.as_ref().is_none_or(|c| &listing.category == c)
            && filter.owner.is_none_or(|o| listing.owner_id == o)
            && filter
                .text
                .as_ref()
                .is_none_or(|t| listing.category.contains(t.as_str()))
            && self.min_price.is_none_or(|min| listing.price >= min)
            && self.max_price.is_none_or(|max| listing.price <= max)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Orders
// ═══════════════════════════════════════════════════════════════════════

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, awaiting the seller.
    Pending,
    /// Accepted by the seller.
    Confirmed,
    /// Sent to the buyer.
    Shipped,
    /// Received. Terminal.
    Delivered,
    /// Called off; stock was restored. Terminal.
    Cancelled,
}

impl OrderStatus {
    /// Storage and wire spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse the storage spelling.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether `self → next` is an edge of the status machine.
    ///
    /// ```
    /// use bazaar_market::OrderStatus::*;
    ///
    /// assert!(Pending.can_transition_to(Confirmed));
    /// assert!(Shipped.can_transition_to(Cancelled));
    /// assert!(!Delivered.can_transition_to(Cancelled));
    /// assert!(!Pending.can_transition_to(Shipped));
    /// ```
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed | Self::Cancelled)
                | (Self::Confirmed, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Delivered | Self::Cancelled)
        )
    }

    /// No further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the buyer pays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    Cash,
    /// Bank transfer, verified by the seller.
    BankTransfer,
    /// Credit card (recorded as paid immediately; no gateway).
    CreditCard,
}

impl PaymentMethod {
    /// Every supported method.
    pub const ALL: [Self; 3] = [Self::Cash, Self::BankTransfer, Self::CreditCard];

    /// Storage and wire spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::BankTransfer => "bank_transfer",
            Self::CreditCard => "credit_card",
        }
    }

    /// Parse the storage spelling.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == s)
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cash => "Cash on delivery",
            Self::BankTransfer => "Bank transfer",
            Self::CreditCard => "Credit card",
        }
    }

    /// One-line explanation for buyers.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Cash => "Pay the seller in cash when the item is delivered",
            Self::BankTransfer => "Transfer to the seller's account; the seller confirms receipt",
            Self::CreditCard => "Pay immediately by card",
        }
    }

    /// Payment status right after the buyer submits payment.
    #[must_use]
    pub const fn submitted_status(self) -> PaymentStatus {
        match self {
            Self::Cash => PaymentStatus::Pending,
            Self::BankTransfer => PaymentStatus::PendingVerification,
            Self::CreditCard => PaymentStatus::Paid,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment progress of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Nothing received yet.
    #[default]
    Pending,
    /// Buyer reports a transfer; seller has not confirmed.
    PendingVerification,
    /// Settled. Terminal.
    Paid,
    /// Rejected by the seller. Terminal.
    Failed,
}

impl PaymentStatus {
    /// Storage and wire spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PendingVerification => "pending_verification",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }

    /// Parse the storage spelling.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "pending_verification" => Some(Self::PendingVerification),
            "paid" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Whether `self → next` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Paid | Self::PendingVerification | Self::Failed)
                | (Self::PendingVerification, Self::Paid | Self::Failed)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A purchase against a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order ID.
    pub id: OrderId,
    /// Listing purchased from.
    pub listing_id: ListingId,
    /// Listing owner at purchase time.
    pub seller_id: PrincipalId,
    /// Purchasing principal.
    pub buyer_id: PrincipalId,
    /// Units bought.
    pub quantity: u32,
    /// Listing price at purchase time. Never changes afterwards.
    pub unit_price: f64,
    /// `quantity × unit_price`.
    pub total: f64,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Chosen payment method.
    pub payment_method: PaymentMethod,
    /// Payment progress.
    pub payment_status: PaymentStatus,
    /// Delivery address, if given.
    #[serde(default)]
    pub shipping_address: Option<String>,
    /// Placement time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build the order for `draft`, freezing the seller and price read from
    /// the listing in the same store operation.
    #[must_use]
    pub fn from_draft(draft: &OrderDraft, seller_id: PrincipalId, unit_price: f64) -> Self {
        Self {
            id: draft.id,
            listing_id: draft.listing_id,
            seller_id,
            buyer_id: draft.buyer_id,
            quantity: draft.quantity,
            unit_price,
            total: f64::from(draft.quantity) * unit_price,
            status: OrderStatus::Pending,
            payment_method: draft.payment_method,
            payment_status: PaymentStatus::Pending,
            shipping_address: draft.shipping_address.clone(),
            created_at: draft.created_at,
            updated_at: draft.created_at,
        }
    }

    /// Buyer, seller and administrators may see an order.
    #[must_use]
    pub fn is_visible_to(&self, actor: &bazaar_core::Actor) -> bool {
        actor.is_admin || actor.principal_id == self.buyer_id || actor.principal_id == self.seller_id
    }
}

/// A purchase request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrder {
    /// Listing to buy from.
    pub listing_id: ListingId,
    /// Purchasing principal.
    pub buyer_id: PrincipalId,
    /// Units requested, unvalidated.
    pub quantity: i64,
    /// Delivery address.
    pub shipping_address: Option<String>,
    /// Payment method.
    pub payment_method: PaymentMethod,
}

impl PlaceOrder {
    /// A cash order with no shipping address.
    #[must_use]
    pub fn new(listing_id: ListingId, buyer_id: PrincipalId, quantity: i64) -> Self {
        Self {
            listing_id,
            buyer_id,
            quantity,
            shipping_address: None,
            payment_method: PaymentMethod::default(),
        }
    }
}

/// A validated purchase handed to the store. Seller and price are filled in
/// by the store from the debited listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    /// New order's ID.
    pub id: OrderId,
    /// Listing to debit.
    pub listing_id: ListingId,
    /// Purchasing principal.
    pub buyer_id: PrincipalId,
    /// Units to debit (positive).
    pub quantity: u32,
    /// Payment method.
    pub payment_method: PaymentMethod,
    /// Delivery address.
    pub shipping_address: Option<String>,
    /// Placement time.
    pub created_at: DateTime<Utc>,
}

/// Which orders to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    /// Orders placed by a buyer.
    Buyer(PrincipalId),
    /// Orders against a seller's listings.
    Seller(PrincipalId),
    /// Every order.
    All,
}

impl OrderScope {
    /// Returns `true` if `order` falls in this scope.
    #[must_use]
    pub fn includes(&self, order: &Order) -> bool {
        match self {
            Self::Buyer(id) => order.buyer_id == *id,
            Self::Seller(id) => order.seller_id == *id,
            Self::All => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_testing::test_epoch;

    fn listing(quantity: u32) -> Listing {
        Listing {
            id: ListingId::new(),
            owner_id: PrincipalId::new(),
            category: "Bicycle".into(),
            quantity,
            price: 10.0,
            description: String::new(),
            contact: "x".into(),
            active: quantity > 0,
            created_at: test_epoch(),
            updated_at: test_epoch(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_debit_to_zero_deactivates_and_credit_reactivates() {
        let mut l = listing(3);
        assert_eq!(l.debit(3, test_epoch()), Ok(()));
        assert_eq!(l.quantity, 0);
        assert!(!l.active);

        assert_eq!(l.credit(2, test_epoch()), Ok(()));
        assert_eq!(l.quantity, 2);
        assert!(l.active);
    }

    #[test]
    fn test_overdraw_leaves_listing_untouched() {
        let mut l = listing(2);
        let before = l.clone();
        assert_eq!(
            l.debit(3, test_epoch()),
            Err(MarketError::InsufficientStock {
                requested: 3,
                available: 2
            })
        );
        assert_eq!(l, before);
    }

    #[test]
    fn test_soft_deleted_listing_stays_inactive_after_credit() {
        let mut l = listing(1);
        l.mark_deleted(test_epoch());
        assert_eq!(l.credit(5, test_epoch()), Ok(()));
        assert_eq!(l.quantity, 6);
        assert!(!l.active);
        assert_eq!(l.debit(1, test_epoch()), Err(MarketError::ListingNotFound));
    }

    #[test]
    fn test_terminal_statuses_have_no_exits() {
        use OrderStatus::*;
        for from in [Delivered, Cancelled] {
            assert!(from.is_terminal());
            for to in [Pending, Confirmed, Shipped, Delivered, Cancelled] {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn test_payment_edges() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(PendingVerification));
        assert!(PendingVerification.can_transition_to(Failed));
        assert!(!Paid.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Paid));
        assert!(!PendingVerification.can_transition_to(Pending));
    }

    #[test]
    fn test_query_matches_active_only() {
        let mut l = listing(1);
        let query = ListingQuery::default();
        assert!(query.matches(&l));
        l.set_quantity(0, test_epoch());
        assert!(!query.matches(&l));
    }

    #[test]
    fn test_text_filter_is_case_sensitive() {
        let l = listing(1);
        let query = |t: &str| ListingQuery {
            filter: ListingFilter {
                text: Some(t.into()),
                ..ListingFilter::default()
            },
            ..ListingQuery::default()
        };
        assert!(query("cycle").matches(&l));
        assert!(!query("bicycle").matches(&l));
    }

    #[test]
    fn test_wire_spellings_round_trip() {
        for m in PaymentMethod::ALL {
            assert_eq!(PaymentMethod::parse(m.as_str()), Some(m));
            assert_eq!(serde_json::to_value(m).ok(), Some(serde_json::json!(m.as_str())));
        }
        assert_eq!(OrderStatus::parse("shipped"), Some(OrderStatus::Shipped));
        assert_eq!(
            PaymentStatus::parse("pending_verification"),
            Some(PaymentStatus::PendingVerification)
        );
    }
}
