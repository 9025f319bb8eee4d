//! Health and metrics endpoints. No authentication.

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"`
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
}

/// `GET /health`: the process is up. Dependencies are not checked.
#[allow(clippy::unused_async)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness response.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    /// Overall readiness
    pub ready: bool,
    /// Storage backend in use
    pub storage: &'static str,
}

/// `GET /ready`: storage is reachable. 503 otherwise.
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let (ready, storage) = probe_storage(&state).await;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(ReadinessResponse { ready, storage }))
}

#[cfg(feature = "postgres")]
async fn probe_storage(state: &AppState) -> (bool, &'static str) {
    match &state.database {
        Some(pool) => match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => (true, "postgres"),
            Err(e) => {
                tracing::warn!(error = %e, "Readiness probe failed");
                (false, "postgres")
            }
        },
        None => (true, "memory"),
    }
}

#[cfg(not(feature = "postgres"))]
#[allow(clippy::unused_async)]
async fn probe_storage(_state: &AppState) -> (bool, &'static str) {
    (true, "memory")
}

/// `GET /metrics`: Prometheus text format. 404 when no recorder is installed.
#[allow(clippy::unused_async)]
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let Json(body) = health_check().await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }
}
