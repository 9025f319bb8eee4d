//! Error responses for web handlers.
//!
//! Component errors are classified by [`ErrorKind`] and translated into a
//! status code here, in one place. Server-side failures are logged with
//! their cause; the client only sees a generic message.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bazaar_auth::AuthError;
use bazaar_core::ErrorKind;
use bazaar_market::MarketError;
use serde::Serialize;
use std::fmt;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(identity): State<IdentityService>) -> WebResult<Json<Principal>> {
///     let principal = identity.get_principal(id).await?;
///     Ok(Json(principal))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// User-facing message
    message: String,
    /// Machine-readable code
    code: &'static str,
    /// Cause, logged but never sent
    source: Option<anyhow::Error>,
}

/// Status code for an error classification.
#[must_use]
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict | ErrorKind::State => StatusCode::CONFLICT,
        ErrorKind::Infrastructure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl AppError {
    /// Build an error of the given classification.
    ///
    /// Infrastructure errors replace `message` with a generic one and keep
    /// the original as the logged cause.
    #[must_use]
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        if kind.is_client_error() {
            Self {
                status: status_for(kind),
                message,
                code: kind.code(),
                source: None,
            }
        } else {
            Self::internal(INTERNAL_MESSAGE).with_source(anyhow::anyhow!(message))
        }
    }

    /// Attach a cause for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// 400 with a validation message.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::Validation, message)
    }

    /// 401.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::Unauthenticated, message)
    }

    /// 500. The message is sent as is, so keep it generic.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            code: ErrorKind::Infrastructure.code(),
            source: None,
        }
    }

    /// Response status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Response code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    error = %source,
                    "Request failed"
                ),
                None => tracing::error!(status = %self.status, code = self.code, "Request failed"),
            }
        }

        let body = ErrorBody {
            error: self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

impl From<MarketError> for AppError {
    fn from(err: MarketError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(INTERNAL_MESSAGE).with_source(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}
