//! Correlation ID tracking.
//!
//! Each request gets a correlation ID, taken from the `X-Correlation-ID`
//! header when it holds a UUID and generated otherwise. The ID is stored in
//! the request extensions, recorded on the request span, and echoed in the
//! response header.
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/api/listings", get(list_listings))
//!     .layer(correlation_id_layer());
//! ```

use crate::extractors::CorrelationId;
use axum::{extract::Request, http::HeaderValue, response::Response};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Layer that tags every request with a [`CorrelationId`].
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation ID tracking.
#[derive(Clone, Copy, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Service produced by [`CorrelationIdLayer`].
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

/// Parse a client-supplied correlation ID, or mint one.
#[must_use]
pub fn correlation_id_from(header: Option<&HeaderValue>) -> Uuid {
    header
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .unwrap_or_else(Uuid::new_v4)
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let id = correlation_id_from(req.headers().get(CORRELATION_ID_HEADER));
        req.extensions_mut().insert(CorrelationId(id));

        let span = tracing::info_span!(
            "request",
            correlation_id = %id,
            method = %req.method(),
            path = %req.uri().path(),
        );
        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.instrument(span).await?;
            if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
                response.headers_mut().insert(CORRELATION_ID_HEADER, value);
            }
            Ok(response)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/echo", get(|id: CorrelationId| async move { id.0.to_string() }))
            .layer(correlation_id_layer())
    }

    async fn echoed(request: Request<Body>) -> (String, String) {
        let response = app().oneshot(request).await.unwrap();
        let header = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("correlation header")
            .to_str()
            .unwrap()
            .to_string();
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        (header, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_generated_when_missing() {
        let (header, body) = echoed(Request::get("/echo").body(Body::empty()).unwrap()).await;
        assert!(Uuid::parse_str(&header).is_ok());
        assert_eq!(header, body);
    }

    #[tokio::test]
    async fn test_preserved_from_request() {
        let id = Uuid::new_v4();
        let request = Request::get("/echo")
            .header(CORRELATION_ID_HEADER, id.to_string())
            .body(Body::empty())
            .unwrap();
        let (header, body) = echoed(request).await;
        assert_eq!(header, id.to_string());
        assert_eq!(body, id.to_string());
    }

    #[tokio::test]
    async fn test_invalid_replaced() {
        let request = Request::get("/echo")
            .header(CORRELATION_ID_HEADER, "not-a-uuid")
            .body(Body::empty())
            .unwrap();
        let (header, _) = echoed(request).await;
        assert_ne!(header, "not-a-uuid");
        assert!(Uuid::parse_str(&header).is_ok());
    }
}
