//! Listing Inventory: create, browse, search, edit and delete listings.

use crate::config::MarketConfig;
use crate::error::{MarketError, Result};
use crate::metrics;
use crate::repository::MarketRepository;
use crate::types::{Listing, ListingFilter, ListingInput, ListingPatch, ListingQuery};
use crate::validation::{check_bound, validate_input, validate_patch};
use async_trait::async_trait;
use bazaar_core::directory::CleanupError;
use bazaar_core::{Actor, Clock, ListingId, OwnerCleanup, PrincipalDirectory, PrincipalId};
use std::sync::Arc;

/// Listing Inventory component.
#[derive(Clone)]
pub struct ListingService {
    repo: Arc<dyn MarketRepository>,
    directory: Arc<dyn PrincipalDirectory>,
    clock: Arc<dyn Clock>,
    config: MarketConfig,
}

impl ListingService {
    /// Create a service over `repo`. Owners are checked against `directory`.
    #[must_use]
    pub fn new(
        repo: Arc<dyn MarketRepository>,
        directory: Arc<dyn PrincipalDirectory>,
        clock: Arc<dyn Clock>,
        config: MarketConfig,
    ) -> Self {
        Self {
            repo,
            directory,
            clock,
            config,
        }
    }

    /// Create an active listing owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// - [`MarketError::MissingField`] for a blank category or contact
    /// - [`MarketError::InvalidQuantity`] / [`MarketError::InvalidPrice`]
    /// - [`MarketError::OwnerNotFound`] if `owner_id` is not registered
    #[tracing::instrument(skip(self, input))]
    pub async fn create_listing(&self, owner_id: PrincipalId, input: ListingInput) -> Result<Listing> {
        let valid = validate_input(&input)?;

        let exists = self
            .directory
            .principal_exists(owner_id)
            .await
            .map_err(|e| MarketError::Infrastructure(e.to_string()))?;
        if !exists {
            return Err(MarketError::OwnerNotFound);
        }

        let now = self.clock.now();
        let listing = Listing {
            id: ListingId::new(),
            owner_id,
            category: valid.category,
            quantity: valid.quantity,
            price: valid.price,
            description: valid.description,
            contact: valid.contact,
            active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.repo.insert_listing(&listing).await?;

        metrics::record_listing_created();
        tracing::info!(
            listing_id = %listing.id,
            quantity = listing.quantity,
            "Listing created"
        );
        Ok(listing)
    }

    /// Active listings, newest first, narrowed by `filter`.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    pub async fn list_active(&self, filter: ListingFilter) -> Result<Vec<Listing>> {
        let query = ListingQuery {
            filter,
            ..ListingQuery::default()
        };
        let listings = self.repo.query_listings(&query).await?;
        tracing::debug!(count = listings.len(), "Listed active listings");
        Ok(listings)
    }

    /// Active listings priced within `[min, max]`. Either bound may be absent.
    ///
    /// # Errors
    ///
    /// [`MarketError::InvalidPrice`] for a negative or non-finite bound.
    pub async fn search_by_price_range(
        &self,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<Vec<Listing>> {
        let min = check_bound(min)?;
        let max = check_bound(max)?;
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Ok(Vec::new());
            }
        }
        let query = ListingQuery {
            min_price: min,
            max_price: max,
            ..ListingQuery::default()
        };
        self.repo.query_listings(&query).await
    }

    /// A listing by id, active or not.
    ///
    /// # Errors
    ///
    /// [`MarketError::ListingNotFound`].
    pub async fn get_by_id(&self, id: ListingId) -> Result<Listing> {
        self.repo
            .get_listing(id)
            .await?
            .ok_or(MarketError::ListingNotFound)
    }

    /// Every non-deleted listing of `owner_id`, newest first.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    pub async fn listings_by_owner(&self, owner_id: PrincipalId) -> Result<Vec<Listing>> {
        self.repo.listings_by_owner(owner_id).await
    }

    /// Take `amount` units out of stock.
    ///
    /// # Errors
    ///
    /// [`MarketError::InvalidQuantity`] for zero, [`MarketError::ListingNotFound`],
    /// [`MarketError::InsufficientStock`].
    pub async fn debit(&self, id: ListingId, amount: u32) -> Result<Listing> {
        if amount == 0 {
            return Err(MarketError::InvalidQuantity);
        }
        self.repo.debit(id, amount, self.clock.now()).await
    }

    /// Put `amount` units back into stock.
    ///
    /// # Errors
    ///
    /// [`MarketError::InvalidQuantity`] for zero, [`MarketError::ListingNotFound`].
    pub async fn credit(&self, id: ListingId, amount: u32) -> Result<Listing> {
        if amount == 0 {
            return Err(MarketError::InvalidQuantity);
        }
        self.repo.credit(id, amount, self.clock.now()).await
    }

    /// Resolve a listing the actor may modify.
    async fn managed_listing(&self, id: ListingId, actor: &Actor) -> Result<Listing> {
        let listing = self
            .repo
            .get_listing(id)
            .await?
            .filter(|l| !l.is_deleted())
            .ok_or(MarketError::ListingNotFound)?;
        if !actor.may_manage(listing.owner_id) {
            tracing::warn!(
                listing_id = %id,
                principal_id = %actor.principal_id,
                "Listing change refused"
            );
            return Err(MarketError::Forbidden);
        }
        Ok(listing)
    }

    /// Edit a listing (owner or admin).
    ///
    /// # Errors
    ///
    /// [`MarketError::ListingNotFound`], [`MarketError::Forbidden`], and the
    /// field validation errors of [`Self::create_listing`].
    #[tracing::instrument(skip(self, actor, patch), fields(principal_id = %actor.principal_id))]
    pub async fn update_listing(
        &self,
        id: ListingId,
        actor: Actor,
        patch: ListingPatch,
    ) -> Result<Listing> {
        self.managed_listing(id, &actor).await?;
        let changes = validate_patch(&patch)?;
        let listing = self
            .repo
            .update_listing(id, &changes, self.clock.now())
            .await?
            .ok_or(MarketError::ListingNotFound)?;
        tracing::info!(listing_id = %id, active = listing.active, "Listing updated");
        Ok(listing)
    }

    /// Delete a listing (owner or admin) under the configured policy.
    ///
    /// # Errors
    ///
    /// [`MarketError::ListingNotFound`], [`MarketError::Forbidden`].
    #[tracing::instrument(skip(self, actor), fields(principal_id = %actor.principal_id))]
    pub async fn delete_listing(&self, id: ListingId, actor: Actor) -> Result<()> {
        self.managed_listing(id, &actor).await?;
        let policy = self.config.delete_policy;
        if !self.repo.delete_listing(id, policy, self.clock.now()).await? {
            return Err(MarketError::ListingNotFound);
        }
        tracing::info!(listing_id = %id, %policy, "Listing deleted");
        Ok(())
    }

    /// Delete every listing of a removed principal.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    pub async fn purge_owner(&self, owner_id: PrincipalId) -> Result<usize> {
        let policy = self.config.delete_policy;
        let purged = self
            .repo
            .delete_owner_listings(owner_id, policy, self.clock.now())
            .await?;
        tracing::info!(principal_id = %owner_id, purged, %policy, "Owner listings purged");
        Ok(purged)
    }
}

#[async_trait]
impl OwnerCleanup for ListingService {
    async fn purge_owner(&self, owner_id: PrincipalId) -> std::result::Result<usize, CleanupError> {
        Self::purge_owner(self, owner_id)
            .await
            .map_err(|e| CleanupError(e.to_string()))
    }
}
