//! End-to-end API flows through the router.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use bazaar_core::Clock;
use bazaar_testing::{ManualClock, init_test_tracing};
use bazaar_web::{CORRELATION_ID_HEADER, Config, app, build_router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
}

async fn test_app(extra: &[(&str, &str)]) -> TestApp {
    init_test_tracing();
    let mut vars = vec![("AUTH_BCRYPT_COST", "4"), ("ADMIN_PASSWORD", "admin-secret")];
    vars.extend_from_slice(extra);
    let config = Config::from_lookup(|name| {
        vars.iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| (*v).to_string())
    })
    .unwrap();

    let clock = Arc::new(ManualClock::starting_at_test_epoch());
    let state = app::in_memory_state(&config, clock.clone() as Arc<dyn Clock>);
    app::bootstrap_admin(&state).await.unwrap();
    TestApp {
        router: build_router(state),
        clock,
    }
}

impl TestApp {
    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::GET, uri, token, None).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    async fn signup(&self, name: &str) -> (String, String) {
        let (status, body) = self
            .post(
                "/api/users/register",
                None,
                json!({"username": name, "email": format!("{name}@x.com"), "password": "secret1"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let id = body["user"]["id"].as_str().unwrap().to_string();
        (id, self.login(name, "secret1").await)
    }

    async fn login(&self, identifier: &str, password: &str) -> String {
        let (status, body) = self
            .post(
                "/api/users/login",
                None,
                json!({"identifier": identifier, "password": password}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_listing(&self, token: &str, quantity: Value, price: Value) -> String {
        let (status, body) = self
            .post(
                "/api/listings",
                Some(token),
                json!({
                    "category": "Books",
                    "quantity": quantity,
                    "price": price,
                    "contact": "seller@x.com",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["listing"]["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn health_and_correlation_id() {
    let app = test_app(&[]).await;
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.get("/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["storage"], "memory");

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key(CORRELATION_ID_HEADER));
}

#[tokio::test]
async fn registration_and_login() {
    let app = test_app(&[]).await;
    let (_, token) = app.signup("alice").await;

    let (status, body) = app.get("/api/users/profile", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["role"], "member");
    assert!(body["user"].get("secret_hash").is_none());

    let (status, body) = app
        .post(
            "/api/users/register",
            None,
            json!({"username": "alice", "email": "other@x.com", "password": "secret1"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, body) = app
        .post(
            "/api/users/login",
            None,
            json!({"identifier": "alice", "password": "wrong-one"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid username or password");

    // Explicit identifier type overrides `@` inference.
    let (status, _) = app
        .post(
            "/api/users/login",
            None,
            json!({"identifier": "alice@x.com", "password": "secret1", "identifier_type": "username"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    app.login("alice@x.com", "secret1").await;
}

#[tokio::test]
async fn register_validation_errors() {
    let app = test_app(&[]).await;
    let (status, body) = app
        .post(
            "/api/users/register",
            None,
            json!({"username": "bob", "email": "not-an-email", "password": "secret1"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .post(
            "/api/users/register",
            None,
            json!({"username": "bob", "email": "bob@x.com", "password": "123"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sessions_expire_and_logout_revokes() {
    let app = test_app(&[("AUTH_SESSION_TTL", "60")]).await;
    let (_, token) = app.signup("carol").await;

    app.clock.advance(chrono::Duration::seconds(61));
    let (status, _) = app.get("/api/users/profile", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.login("carol", "secret1").await;
    let (status, _) = app.post("/api/users/logout", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get("/api/users/profile", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/users/profile", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn listing_and_order_lifecycle() {
    let app = test_app(&[]).await;
    let (_, seller) = app.signup("seller").await;
    let (_, buyer) = app.signup("buyer").await;

    let listing_id = app.create_listing(&seller, json!(2), json!("10.5")).await;

    let (status, body) = app.get("/api/listings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["listings"].as_array().unwrap().len(), 1);

    // Sellers cannot buy their own listing.
    let (status, body) = app
        .post(
            "/api/orders",
            Some(&seller),
            json!({"listing_id": listing_id, "quantity": 1}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "You cannot purchase your own product");

    let (status, body) = app
        .post(
            "/api/orders",
            Some(&buyer),
            json!({"listing_id": listing_id, "quantity": 3}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (status, body) = app
        .post(
            "/api/orders",
            Some(&buyer),
            json!({"listing_id": listing_id, "quantity": 2}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order_id = body["order"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["order"]["status"], "pending");
    assert_eq!(body["order"]["total"], 21.0);

    // Sold out: no longer browsable.
    let (_, body) = app.get("/api/listings", None).await;
    assert!(body["listings"].as_array().unwrap().is_empty());

    let (status, _) = app
        .post(
            &format!("/api/orders/{order_id}/status"),
            Some(&buyer),
            json!({"status": "confirmed"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(
            &format!("/api/orders/{order_id}/status"),
            Some(&seller),
            json!({"status": "shipped"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATE");

    let (status, body) = app
        .post(
            &format!("/api/orders/{order_id}/cancel"),
            Some(&buyer),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["order"]["status"], "cancelled");

    let (_, body) = app.get(&format!("/api/listings/{listing_id}"), None).await;
    assert_eq!(body["listing"]["quantity"], 2);
    assert_eq!(body["listing"]["active"], true);

    let (_, body) = app.get("/api/orders/purchases", Some(&buyer)).await;
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);
    let (_, body) = app.get("/api/orders/sales", Some(&seller)).await;
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn listing_validation_and_ownership() {
    let app = test_app(&[]).await;
    let (_, owner) = app.signup("owner").await;
    let (_, other) = app.signup("other").await;

    let (status, body) = app
        .post(
            "/api/listings",
            Some(&owner),
            json!({"category": "Books", "quantity": -1, "price": 5, "contact": "c"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .post(
            "/api/listings",
            None,
            json!({"category": "Books", "quantity": 1, "price": 5, "contact": "c"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let listing_id = app.create_listing(&owner, json!("4"), json!(5)).await;
    let uri = format!("/api/listings/{listing_id}");

    let (status, _) = app
        .call(Method::PUT, &uri, Some(&other), Some(json!({"price": 1})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(Method::PUT, &uri, Some(&owner), Some(json!({"price": "7.25"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["listing"]["price"], 7.25);

    let (_, body) = app.get("/api/listings/search?min_price=7&max_price=8", None).await;
    assert_eq!(body["listings"].as_array().unwrap().len(), 1);
    let (status, _) = app.get("/api/listings/search?min_price=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get("/api/listings/mine", Some(&owner)).await;
    assert_eq!(body["listings"].as_array().unwrap().len(), 1);

    let (status, _) = app.call(Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = app.get("/api/listings/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_operations() {
    let app = test_app(&[]).await;
    let admin = app.login("admin", "admin-secret").await;
    let (member_id, member) = app.signup("dave").await;
    let (_, buyer) = app.signup("erin").await;

    let (status, _) = app.get("/api/users", Some(&member)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app.get("/api/users", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().unwrap().len(), 3);

    let listing_id = app.create_listing(&member, json!(5), json!(1)).await;
    app.post(
        "/api/orders",
        Some(&buyer),
        json!({"listing_id": listing_id, "quantity": 1}),
    )
    .await;

    let (status, _) = app.get("/api/orders", Some(&member)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, body) = app.get("/api/orders", Some(&admin)).await;
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .call(Method::DELETE, &format!("/api/users/{member_id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["listings_removed"], 1);

    let (status, _) = app.get("/api/users/profile", Some(&member)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (_, body) = app.get("/api/orders", Some(&admin)).await;
    assert!(body["orders"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn payment_flow() {
    let app = test_app(&[]).await;
    let (_, seller) = app.signup("frank").await;
    let (_, buyer) = app.signup("grace").await;
    let listing_id = app.create_listing(&seller, json!(3), json!(20)).await;

    let (status, body) = app.get("/api/payments/methods", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["methods"].as_array().unwrap().len(), 3);

    let (_, body) = app
        .post(
            "/api/orders",
            Some(&buyer),
            json!({"listing_id": listing_id, "quantity": 1, "payment_method": "bank_transfer"}),
        )
        .await;
    let order_id = body["order"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(&format!("/api/orders/{order_id}/payment"), Some(&buyer), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["payment_status"], "pending_verification");

    let (status, body) = app
        .post(
            &format!("/api/orders/{order_id}/payment/verify"),
            Some(&seller),
            json!({"verified": true}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["payment_status"], "paid");

    let (status, _) = app
        .post(&format!("/api/orders/{order_id}/payment"), Some(&buyer), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn orders_hidden_from_strangers() {
    let app = test_app(&[]).await;
    let (_, seller) = app.signup("henry").await;
    let (_, buyer) = app.signup("iris").await;
    let (_, stranger) = app.signup("jack").await;
    let listing_id = app.create_listing(&seller, json!(1), json!(1)).await;
    let (_, body) = app
        .post(
            "/api/orders",
            Some(&buyer),
            json!({"listing_id": listing_id, "quantity": 1}),
        )
        .await;
    let uri = format!("/api/orders/{}", body["order"]["id"].as_str().unwrap());

    let (status, _) = app.get(&uri, Some(&stranger)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&uri, Some(&seller)).await;
    assert_eq!(status, StatusCode::OK);
}
