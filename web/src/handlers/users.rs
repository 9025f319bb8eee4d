//! Account endpoints.
//!
//! - POST /api/users/register
//! - POST /api/users/login
//! - POST /api/users/logout
//! - GET|PUT /api/users/profile
//! - GET /api/users (admin)
//! - DELETE /api/users/:id (admin)

use crate::WebResult;
use crate::extractors::{ApiJson, ApiPath, BearerToken, CurrentPrincipal};
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use bazaar_auth::{LoginIdentifier, Principal, ProfileUpdate, Role};
use bazaar_core::PrincipalId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

// ============================================================================
// Request/Response Types
// ============================================================================

/// A principal as shown to clients.
#[derive(Debug, Serialize)]
pub struct UserView {
    /// Principal ID
    pub id: PrincipalId,
    /// Handle
    pub username: String,
    /// Contact address
    pub email: String,
    /// Role
    pub role: Role,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

impl From<Principal> for UserView {
    fn from(p: Principal) -> Self {
        Self {
            id: p.id,
            username: p.handle,
            email: p.address,
            role: p.role,
            created_at: p.created_at,
        }
    }
}

/// Registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Handle
    #[serde(default)]
    pub username: String,
    /// Contact address
    #[serde(default)]
    pub email: String,
    /// Secret
    #[serde(default)]
    pub password: String,
}

/// How to read a login identifier.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierType {
    /// Match against handles
    Username,
    /// Match against contact addresses
    Email,
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Handle or address
    #[serde(default)]
    pub identifier: String,
    /// Secret
    #[serde(default)]
    pub password: String,
    /// Omitted: inferred from the presence of `@`
    #[serde(default)]
    pub identifier_type: Option<IdentifierType>,
}

impl LoginRequest {
    fn login_identifier(&self) -> LoginIdentifier {
        match self.identifier_type {
            Some(IdentifierType::Username) => LoginIdentifier::Handle(self.identifier.clone()),
            Some(IdentifierType::Email) => LoginIdentifier::Address(self.identifier.clone()),
            None => LoginIdentifier::infer(&self.identifier),
        }
    }
}

/// Profile update request. Omitted fields stay unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileRequest {
    /// New handle
    pub username: Option<String>,
    /// New contact address
    pub email: Option<String>,
    /// New secret
    pub password: Option<String>,
}

impl From<ProfileRequest> for ProfileUpdate {
    fn from(req: ProfileRequest) -> Self {
        Self {
            handle: req.username,
            address: req.email,
            secret: req.password,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/users/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> WebResult<(StatusCode, Json<Value>)> {
    let principal = state
        .identity
        .register(&req.username, &req.email, &req.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user": UserView::from(principal),
        })),
    ))
}

/// POST /api/users/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> WebResult<Json<Value>> {
    let session = state
        .identity
        .authenticate(req.login_identifier(), &req.password)
        .await?;
    Ok(Json(json!({
        "message": "Login successful",
        "token": session.token.as_str(),
        "expires_at": session.expires_at,
        "user": UserView::from(session.principal),
    })))
}

/// POST /api/users/logout
///
/// Succeeds without a token; there is nothing to revoke.
pub async fn logout(
    State(state): State<AppState>,
    token: Option<BearerToken>,
) -> WebResult<Json<Value>> {
    if let Some(token) = token {
        state.identity.logout(&token.0).await?;
    }
    Ok(Json(json!({ "message": "Logged out" })))
}

/// GET /api/users/profile
#[allow(clippy::unused_async)]
pub async fn profile(caller: CurrentPrincipal) -> Json<Value> {
    Json(json!({ "user": UserView::from(caller.principal) }))
}

/// PUT /api/users/profile
pub async fn update_profile(
    State(state): State<AppState>,
    token: BearerToken,
    ApiJson(req): ApiJson<ProfileRequest>,
) -> WebResult<Json<Value>> {
    let principal = state.identity.update_profile(&token.0, req.into()).await?;
    Ok(Json(json!({
        "message": "Profile updated",
        "user": UserView::from(principal),
    })))
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    token: BearerToken,
) -> WebResult<Json<Value>> {
    let users: Vec<UserView> = state
        .identity
        .list_principals(&token.0)
        .await?
        .into_iter()
        .map(UserView::from)
        .collect();
    Ok(Json(json!({ "users": users })))
}

/// DELETE /api/users/:id
///
/// Revokes the principal's sessions and removes their listings under the
/// configured delete policy.
pub async fn delete_user(
    State(state): State<AppState>,
    token: BearerToken,
    ApiPath(id): ApiPath<PrincipalId>,
) -> WebResult<Json<Value>> {
    let listings_removed = state
        .identity
        .remove_principal(&token.0, id, &state.market.listings)
        .await?;
    Ok(Json(json!({
        "message": "User deleted",
        "listings_removed": listings_removed,
    })))
}
