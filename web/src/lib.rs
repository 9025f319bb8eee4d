//! JSON/HTTP presentation layer for the Bazaar marketplace.
//!
//! Handlers parse requests, resolve the caller from the bearer token, call
//! one component operation and render the result. Business rules live in
//! `bazaar-auth` and `bazaar-market`.
//!
//! # Request Flow
//!
//! 1. **Correlation ID** assigned and attached to the request span
//! 2. **Extract** the body, path and caller ([`extractors::CurrentPrincipal`])
//! 3. **Call** the component operation
//! 4. **Map** the result: success body, or [`AppError`] by error kind
//!
//! # Example
//!
//! ```ignore
//! use bazaar_web::{Config, app, build_router};
//!
//! let config = Config::from_env()?;
//! let state = app::build_state(&config).await?;
//! let router = build_router(state);
//! axum::serve(listener, router).await?;
//! ```

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{Config, ConfigError};
pub use error::AppError;
pub use extractors::{BearerToken, CorrelationId, CurrentPrincipal};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use routes::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
