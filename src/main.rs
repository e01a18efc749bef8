//! Crypto jobs dashboard: binary entrypoint.
//! Loads configuration, wires the record store and chat relay, and serves the
//! dashboard regions over HTTP.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crypto_jobs_dashboard::{app, build_state, metrics::Metrics, DashboardConfig};

const DEFAULT_LOG_FILTER: &str = "crypto_jobs_dashboard=info,tower_http=info,warn";

/// Compact logs by default; `DASHBOARD_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("DASHBOARD_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler failed");
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present; no-op otherwise.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = DashboardConfig::load().context("loading dashboard config")?;
    tracing::info!(config = ?cfg, "configuration resolved");

    let state = build_state(&cfg)?;
    let metrics = Metrics::init(&state.fetch)?;
    let router = app(state, &metrics);

    let listener = tokio::net::TcpListener::bind(&cfg.bind)
        .await
        .with_context(|| format!("binding {}", cfg.bind))?;
    tracing::info!(addr = %cfg.bind, "dashboard listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving dashboard")?;
    Ok(())
}
