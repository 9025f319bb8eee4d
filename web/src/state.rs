//! Application state shared by all handlers.

use axum::extract::FromRef;
use bazaar_auth::IdentityService;
use bazaar_market::Marketplace;
use metrics_exporter_prometheus::PrometheusHandle;

/// Application state. Cloned per request; every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// Identity & Session component
    pub identity: IdentityService,
    /// Listing Inventory and Order Ledger
    pub market: Marketplace,
    /// Prometheus renderer, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// Database pool, probed by the readiness check
    #[cfg(feature = "postgres")]
    pub database: Option<sqlx::PgPool>,
}

impl AppState {
    /// State over the given components, without metrics or a database.
    #[must_use]
    pub fn new(identity: IdentityService, market: Marketplace) -> Self {
        Self {
            identity,
            market,
            metrics: None,
            #[cfg(feature = "postgres")]
            database: None,
        }
    }

    /// Attach a Prometheus handle for `GET /metrics`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl FromRef<AppState> for IdentityService {
    fn from_ref(state: &AppState) -> Self {
        state.identity.clone()
    }
}

impl FromRef<AppState> for Marketplace {
    fn from_ref(state: &AppState) -> Self {
        state.market.clone()
    }
}
