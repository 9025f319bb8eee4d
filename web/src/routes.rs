//! Router configuration.

use crate::handlers::{health, listings, orders, users};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Build the complete router.
///
/// Health and metrics sit at the root; everything else is under `/api`.
pub fn build_router(state: AppState) -> Router {
    let user_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/logout", post(users::logout))
        .route(
            "/profile",
            get(users::profile).put(users::update_profile),
        )
        .route("/:id", axum::routing::delete(users::delete_user));

    let listing_routes = Router::new()
        .route(
            "/",
            get(listings::list_listings).post(listings::create_listing),
        )
        .route("/search", get(listings::search_listings))
        .route("/mine", get(listings::my_listings))
        .route(
            "/:id",
            get(listings::get_listing)
                .put(listings::update_listing)
                .delete(listings::delete_listing),
        );

    let order_routes = Router::new()
        .route("/", get(orders::all_orders).post(orders::place_order))
        .route("/purchases", get(orders::purchases))
        .route("/sales", get(orders::sales))
        .route("/:id", get(orders::get_order))
        .route("/:id/cancel", post(orders::cancel_order))
        .route("/:id/status", post(orders::update_status))
        .route("/:id/payment", post(orders::submit_payment))
        .route("/:id/payment/verify", post(orders::verify_payment));

    let api_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/listings", listing_routes)
        .nest("/orders", order_routes)
        .route("/payments/methods", get(orders::list_payment_methods));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
