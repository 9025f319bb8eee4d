//! Application assembly: storage selection, component wiring, admin bootstrap.

use crate::config::Config;
use crate::state::AppState;
use anyhow::Context;
use bazaar_auth::{BootstrapOutcome, IdentityService};
use bazaar_core::{Clock, SystemClock};
use bazaar_market::Marketplace;
use std::sync::Arc;

/// Build the application state described by `config`.
///
/// With `DATABASE_URL` set and the `postgres` feature enabled, components run
/// on PostgreSQL after applying migrations. Otherwise they run in memory.
///
/// # Errors
///
/// Returns an error if the database is unreachable or migrations fail.
pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    #[cfg(feature = "postgres")]
    {
        if let Some(database) = &config.database {
            return build_postgres_state(config, database, clock).await;
        }
    }

    #[cfg(not(feature = "postgres"))]
    {
        if config.database.is_some() {
            tracing::warn!(
                "DATABASE_URL is set but PostgreSQL support is not compiled in; using in-memory storage"
            );
        }
    }

    Ok(in_memory_state(config, clock))
}

/// Components over fresh in-memory stores.
#[must_use]
pub fn in_memory_state(config: &Config, clock: Arc<dyn Clock>) -> AppState {
    let identity = IdentityService::in_memory_with_clock(config.auth.clone(), Arc::clone(&clock));
    let market = Marketplace::in_memory(Arc::new(identity.clone()), clock, config.market);
    tracing::info!(storage = "memory", "Components initialized");
    AppState::new(identity, market)
}

#[cfg(feature = "postgres")]
async fn build_postgres_state(
    config: &Config,
    database: &crate::config::DatabaseConfig,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<AppState> {
    use bazaar_auth::stores::{PostgresSessionStore, PostgresUserRepository};
    use bazaar_market::stores::PostgresMarketStore;
    use sqlx::postgres::PgPoolOptions;

    tracing::info!(url = %crate::config::redact_url(&database.url), "Connecting to PostgreSQL");
    let pool = PgPoolOptions::new()
        .max_connections(database.max_connections)
        .connect(&database.url)
        .await
        .context("connecting to PostgreSQL")?;

    bazaar_auth::stores::postgres::migrate(&pool)
        .await
        .context("applying identity migrations")?;
    let market_store = PostgresMarketStore::new(pool.clone());
    market_store
        .migrate()
        .await
        .context("applying market migrations")?;

    let identity = IdentityService::new(
        Arc::new(PostgresUserRepository::new(pool.clone())),
        Arc::new(PostgresSessionStore::new(pool.clone())),
        Arc::clone(&clock),
        config.auth.clone(),
    );
    let market = Marketplace::new(
        Arc::new(market_store),
        Arc::new(identity.clone()),
        clock,
        config.market,
    );
    tracing::info!(storage = "postgres", "Components initialized");

    let mut state = AppState::new(identity, market);
    state.database = Some(pool);
    Ok(state)
}

/// Create the configured administrator if absent.
///
/// Returns the generated secret when one had to be minted; the caller shows
/// it to the operator once.
///
/// # Errors
///
/// Returns an error if the configured administrator is invalid or storage
/// fails.
pub async fn bootstrap_admin(state: &AppState) -> anyhow::Result<Option<String>> {
    match state
        .identity
        .bootstrap_admin()
        .await
        .context("bootstrapping administrator")?
    {
        BootstrapOutcome::AlreadyPresent { principal_id } => {
            tracing::debug!(%principal_id, "Administrator present");
            Ok(None)
        }
        BootstrapOutcome::Created {
            principal,
            generated_secret,
        } => {
            tracing::info!(principal_id = %principal.id, handle = %principal.handle, "Administrator created");
            Ok(generated_secret)
        }
    }
}
