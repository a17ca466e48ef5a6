// src/lib.rs
// Public library surface for the binary and the integration tests.

pub mod aggregate;
pub mod api;
pub mod cache_hint;
pub mod config;
pub mod contact;
pub mod logging;
pub mod metrics;
pub mod sources;

pub use crate::aggregate::{AggregateResponse, Aggregator, Family, SourceAdapter, SourceResult};
pub use crate::api::{router, AppState};

use axum::Router;
use tracing::info;

use crate::config::AppConfig;

/// Build the full application router from config files and the environment.
/// `/metrics` is mounted only when `DEBUG_ROUTES=1`.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = AppConfig::load()?;
    let debug_routes = cfg.debug_routes;
    info!(
        default_username = %cfg.default_username,
        source_timeout_ms = cfg.source_timeout.as_millis() as u64,
        cache_max_age_secs = cfg.cache_max_age_secs,
        mail_enabled = cfg.mail.user.is_some(),
        fallback_version = aggregate::fallback::table().version,
        "config loaded"
    );

    let mut router = api::router(AppState::from_config(cfg)?);
    if debug_routes {
        router = router.merge(metrics::Metrics::init()?.router());
    }
    Ok(router)
}
