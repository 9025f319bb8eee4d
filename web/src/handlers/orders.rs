//! Order and payment endpoints.

use crate::WebResult;
use crate::error::AppError;
use crate::extractors::{ApiJson, ApiPath, CurrentPrincipal};
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use bazaar_core::{ListingId, OrderId};
use bazaar_market::{OrderStatus, PaymentMethod, PlaceOrder, payment_methods};
use serde::Deserialize;
use serde_json::{Value, json};

/// Order placement request.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    /// Listing to buy from
    pub listing_id: ListingId,
    /// Units
    #[serde(default)]
    pub quantity: i64,
    /// Delivery address
    #[serde(default)]
    pub shipping_address: Option<String>,
    /// Defaults to cash
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

/// Status change request.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    /// Target status, e.g. `"confirmed"`
    pub status: String,
}

/// Payment verification request.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// `true` marks the payment received, `false` failed
    pub verified: bool,
}

/// POST /api/orders
pub async fn place_order(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
    ApiJson(req): ApiJson<PlaceOrderRequest>,
) -> WebResult<(StatusCode, Json<Value>)> {
    let mut request = PlaceOrder::new(req.listing_id, caller.principal.id, req.quantity);
    request.shipping_address = req.shipping_address;
    request.payment_method = req.payment_method.unwrap_or_default();

    let order = state.market.orders.place_order_with(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Order placed successfully",
            "order": order,
        })),
    ))
}

/// GET /api/orders (admin)
pub async fn all_orders(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
) -> WebResult<Json<Value>> {
    let orders = state.market.orders.all_orders(caller.actor()).await?;
    Ok(Json(json!({ "orders": orders })))
}

/// GET /api/orders/purchases
pub async fn purchases(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
) -> WebResult<Json<Value>> {
    let orders = state
        .market
        .orders
        .orders_by_buyer(caller.principal.id)
        .await?;
    Ok(Json(json!({ "orders": orders })))
}

/// GET /api/orders/sales
pub async fn sales(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
) -> WebResult<Json<Value>> {
    let orders = state
        .market
        .orders
        .orders_by_seller(caller.principal.id)
        .await?;
    Ok(Json(json!({ "orders": orders })))
}

/// GET /api/orders/:id
pub async fn get_order(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
    ApiPath(id): ApiPath<OrderId>,
) -> WebResult<Json<Value>> {
    let order = state.market.orders.get_order(id, caller.actor()).await?;
    Ok(Json(json!({ "order": order })))
}

/// POST /api/orders/:id/cancel
pub async fn cancel_order(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
    ApiPath(id): ApiPath<OrderId>,
) -> WebResult<Json<Value>> {
    let order = state
        .market
        .orders
        .cancel_order(id, caller.principal.id)
        .await?;
    Ok(Json(json!({
        "message": "Order cancelled successfully",
        "order": order,
    })))
}

/// POST /api/orders/:id/status
pub async fn update_status(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> WebResult<Json<Value>> {
    let status = OrderStatus::parse(req.status.trim())
        .ok_or_else(|| AppError::validation(format!("Unknown order status: {}", req.status)))?;
    let order = state
        .market
        .orders
        .update_status(id, caller.principal.id, status)
        .await?;
    Ok(Json(json!({
        "message": "Order status updated successfully",
        "order": order,
    })))
}

/// POST /api/orders/:id/payment
pub async fn submit_payment(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
    ApiPath(id): ApiPath<OrderId>,
) -> WebResult<Json<Value>> {
    let order = state
        .market
        .orders
        .submit_payment(id, caller.principal.id)
        .await?;
    Ok(Json(json!({
        "message": "Payment submitted",
        "order": order,
    })))
}

/// POST /api/orders/:id/payment/verify
pub async fn verify_payment(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(req): ApiJson<VerifyRequest>,
) -> WebResult<Json<Value>> {
    let order = state
        .market
        .orders
        .verify_payment(id, caller.principal.id, req.verified)
        .await?;
    Ok(Json(json!({
        "message": "Payment verification recorded",
        "order": order,
    })))
}

/// GET /api/payments/methods
#[allow(clippy::unused_async)]
pub async fn list_payment_methods() -> Json<Value> {
    Json(json!({ "methods": payment_methods() }))
}
