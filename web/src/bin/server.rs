//! Bazaar HTTP server.
//!
//! # Usage
//!
//! ```bash
//! # In-memory storage
//! cargo run --bin bazaar-server
//!
//! # PostgreSQL
//! DATABASE_URL=postgres://localhost/bazaar cargo run --features postgres --bin bazaar-server
//! ```

use anyhow::Context;
use bazaar_web::{Config, app, build_router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::future::IntoFuture;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bazaar=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("loading configuration")?;
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        database = ?config.database,
        delete_policy = %config.market.delete_policy,
        "Configuration loaded"
    );

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .context("installing Prometheus recorder")?;
    bazaar_auth::metrics::register_identity_metrics();
    bazaar_market::metrics::register_market_metrics();

    let state = app::build_state(&config).await?.with_metrics(prometheus);

    if let Some(secret) = app::bootstrap_admin(&state).await? {
        // stdout only; the secret is never logged.
        println!(
            "Administrator '{}' created with generated password: {secret}",
            config.auth.admin.handle
        );
    }

    spawn_session_sweeper(state.identity.clone());

    let addr = config.server.addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "Bazaar server listening");

    let grace = config.server.shutdown_timeout;
    let server = axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    // Give in-flight requests the grace period once the signal arrives.
    tokio::select! {
        result = server => result.context("serving HTTP")?,
        () = async {
            shutdown_signal().await;
            tokio::time::sleep(grace).await;
        } => tracing::warn!(?grace, "Shutdown grace period elapsed"),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Purge expired sessions every ten minutes.
fn spawn_session_sweeper(identity: bazaar_auth::IdentityService) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(600));
        loop {
            interval.tick().await;
            if let Err(e) = identity.purge_expired_sessions().await {
                tracing::warn!(error = %e, "Session sweep failed");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
