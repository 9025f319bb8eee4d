//! Listing endpoints.
//!
//! - GET /api/listings?category=&owner=&q=
//! - GET /api/listings/search?min_price=&max_price=
//! - GET /api/listings/mine
//! - POST /api/listings
//! - GET|PUT|DELETE /api/listings/:id

use crate::WebResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, CurrentPrincipal};
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use bazaar_core::{ListingId, PrincipalId};
use bazaar_market::{ListingFilter, ListingInput, ListingPatch};
use serde::Deserialize;
use serde_json::{Value, json};

/// A numeric field sent either as a JSON number or as text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawField {
    /// `3`, `10.5`
    Number(serde_json::Number),
    /// `"3"`, `"10.5"`
    Text(String),
}

impl RawField {
    fn into_text(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

fn text(field: Option<RawField>) -> String {
    field.map(RawField::into_text).unwrap_or_default()
}

/// Create request.
#[derive(Debug, Deserialize)]
pub struct CreateListingRequest {
    /// Category / title
    #[serde(default)]
    pub category: String,
    /// Stock
    #[serde(default)]
    pub quantity: Option<RawField>,
    /// Unit price
    #[serde(default)]
    pub price: Option<RawField>,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Contact details
    #[serde(default)]
    pub contact: String,
}

impl From<CreateListingRequest> for ListingInput {
    fn from(req: CreateListingRequest) -> Self {
        Self {
            category: req.category,
            quantity: text(req.quantity),
            price: text(req.price),
            description: req.description,
            contact: req.contact,
        }
    }
}

/// Update request. Omitted fields stay unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateListingRequest {
    /// New category
    pub category: Option<String>,
    /// New stock
    pub quantity: Option<RawField>,
    /// New unit price
    pub price: Option<RawField>,
    /// New description
    pub description: Option<String>,
    /// New contact
    pub contact: Option<String>,
}

impl From<UpdateListingRequest> for ListingPatch {
    fn from(req: UpdateListingRequest) -> Self {
        Self {
            category: req.category,
            quantity: req.quantity.map(RawField::into_text),
            price: req.price.map(RawField::into_text),
            description: req.description,
            contact: req.contact,
        }
    }
}

/// Browse query.
#[derive(Debug, Default, Deserialize)]
pub struct BrowseQuery {
    /// Exact category
    pub category: Option<String>,
    /// Owner
    pub owner: Option<PrincipalId>,
    /// Substring of the category
    pub q: Option<String>,
}

/// Price search query.
#[derive(Debug, Default, Deserialize)]
pub struct PriceQuery {
    /// Inclusive lower bound
    pub min_price: Option<f64>,
    /// Inclusive upper bound
    pub max_price: Option<f64>,
}

/// GET /api/listings
pub async fn list_listings(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BrowseQuery>,
) -> WebResult<Json<Value>> {
    let filter = ListingFilter {
        category: query.category.filter(|c| !c.is_empty()),
        owner: query.owner,
        text: query.q.filter(|q| !q.is_empty()),
    };
    let listings = state.market.listings.list_active(filter).await?;
    Ok(Json(json!({ "listings": listings })))
}

/// GET /api/listings/search
pub async fn search_listings(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PriceQuery>,
) -> WebResult<Json<Value>> {
    let listings = state
        .market
        .listings
        .search_by_price_range(query.min_price, query.max_price)
        .await?;
    Ok(Json(json!({ "listings": listings })))
}

/// GET /api/listings/mine
pub async fn my_listings(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
) -> WebResult<Json<Value>> {
    let listings = state
        .market
        .listings
        .listings_by_owner(caller.principal.id)
        .await?;
    Ok(Json(json!({ "listings": listings })))
}

/// POST /api/listings
pub async fn create_listing(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
    ApiJson(req): ApiJson<CreateListingRequest>,
) -> WebResult<(StatusCode, Json<Value>)> {
    let listing = state
        .market
        .listings
        .create_listing(caller.principal.id, req.into())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Listing created successfully",
            "listing": listing,
        })),
    ))
}

/// GET /api/listings/:id
pub async fn get_listing(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ListingId>,
) -> WebResult<Json<Value>> {
    let listing = state.market.listings.get_by_id(id).await?;
    Ok(Json(json!({ "listing": listing })))
}

/// PUT /api/listings/:id
pub async fn update_listing(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
    ApiPath(id): ApiPath<ListingId>,
    ApiJson(req): ApiJson<UpdateListingRequest>,
) -> WebResult<Json<Value>> {
    let listing = state
        .market
        .listings
        .update_listing(id, caller.actor(), req.into())
        .await?;
    Ok(Json(json!({
        "message": "Listing updated successfully",
        "listing": listing,
    })))
}

/// DELETE /api/listings/:id
pub async fn delete_listing(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
    ApiPath(id): ApiPath<ListingId>,
) -> WebResult<Json<Value>> {
    state
        .market
        .listings
        .delete_listing(id, caller.actor())
        .await?;
    Ok(Json(json!({ "message": "Listing deleted successfully" })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_accepted_as_text_or_json() {
        let req: CreateListingRequest = serde_json::from_str(
            r#"{"category":"Books","quantity":3,"price":"10.5","contact":"c"}"#,
        )
        .unwrap();
        let input = ListingInput::from(req);
        assert_eq!(input.quantity, "3");
        assert_eq!(input.price, "10.5");
        assert_eq!(input.description, "");
    }

    #[test]
    fn test_missing_numbers_become_empty() {
        let req: CreateListingRequest = serde_json::from_str(r#"{"category":"Books"}"#).unwrap();
        let input = ListingInput::from(req);
        assert!(input.quantity.is_empty());
        assert!(input.price.is_empty());
    }
}
