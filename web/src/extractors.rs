//! Request extractors.
//!
//! - [`CorrelationId`]: the request's correlation ID
//! - [`BearerToken`]: the raw `Authorization: Bearer` token
//! - [`CurrentPrincipal`]: the principal behind a live session
//! - [`ApiJson`], [`ApiQuery`], [`ApiPath`]: axum extractors whose rejections
//!   use the API error body

use crate::error::AppError;
use crate::middleware::{CORRELATION_ID_HEADER, correlation_id_from};
use axum::{
    async_trait,
    extract::{FromRef, FromRequest, FromRequestParts},
    http::{header, request::Parts},
};
use bazaar_auth::{IdentityService, Principal};
use bazaar_core::Actor;
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Set by [`crate::middleware::correlation_id_layer`]. Without the layer the
/// header is read directly, or a fresh ID is minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Self>() {
            return Ok(*id);
        }
        Ok(Self(correlation_id_from(
            parts.headers.get(CORRELATION_ID_HEADER),
        )))
    }
}

/// Token from `Authorization: Bearer <token>`.
#[derive(Clone)]
pub struct BearerToken(pub String);

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(..)")
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Authentication required"))?;

        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::unauthorized("Authentication required"))?;

        Ok(Self(token.to_string()))
    }
}

/// The authenticated caller.
///
/// Rejects with 401 when the token is missing, unknown or expired.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal {
    /// Resolved principal.
    pub principal: Principal,
    /// The token it was resolved from.
    pub token: BearerToken,
}

impl CurrentPrincipal {
    /// The caller as an authorization subject.
    #[must_use]
    pub fn actor(&self) -> Actor {
        self.principal.actor()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
    IdentityService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = BearerToken::from_request_parts(parts, state).await?;
        let identity = IdentityService::from_ref(state);
        let principal = identity.current_principal(&token.0).await?;
        Ok(Self { principal, token })
    }
}

/// [`axum::Json`] with API error rejections.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// [`axum::extract::Query`] with API error rejections.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// [`axum::extract::Path`] with API error rejections.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    async fn bearer(value: Option<&str>) -> Result<BearerToken, AppError> {
        let mut builder = Request::builder();
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        BearerToken::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_bearer_token() {
        let token = bearer(Some("Bearer abc123")).await.unwrap();
        assert_eq!(token.0, "abc123");
        assert_eq!(format!("{token:?}"), "BearerToken(..)");
    }

    #[tokio::test]
    async fn test_bearer_rejections() {
        for value in [None, Some("Basic abc"), Some("Bearer "), Some("bearer abc")] {
            let err = bearer(value).await.unwrap_err();
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED, "{value:?}");
        }
    }

    #[tokio::test]
    async fn test_correlation_id_without_layer() {
        let id = Uuid::new_v4();
        let (mut parts, ()) = Request::builder()
            .header(CORRELATION_ID_HEADER, id.to_string())
            .body(())
            .unwrap()
            .into_parts();
        let extracted = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("infallible");
        assert_eq!(extracted.0, id);
    }
}
