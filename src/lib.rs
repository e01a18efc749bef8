// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod fetch;
pub mod filter;
pub mod format;
pub mod metrics;
pub mod records;
pub mod relay;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;

pub use crate::api::{router, AppState};
pub use crate::config::DashboardConfig;
pub use crate::records::{JobFunction, JobRecord};

use crate::fetch::PostgrestSource;
use crate::metrics::Metrics;
use crate::relay::ChatRelay;

/// Composition root: build the store client and relay once and share them.
pub fn build_state(cfg: &DashboardConfig) -> Result<AppState> {
    let source = PostgrestSource::new(&cfg.store).context("configuring record store")?;
    let relay = ChatRelay::new(&cfg.relay)?;
    tracing::info!(
        store = source.endpoint(),
        relay = relay.base_url(),
        "dashboard state ready"
    );
    Ok(AppState::new(
        Arc::new(source),
        Arc::new(relay),
        cfg.store.fetch_settings(),
    ))
}

/// Full application router: dashboard regions plus `/metrics`.
pub fn app(state: AppState, metrics: &Metrics) -> Router {
    router(state).merge(metrics.router())
}
