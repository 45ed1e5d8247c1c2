//! Library entrypoint for the GEM trading backend.
//!
//! This file exists mainly to make controller tests easy (integration tests
//! under `tests/` can import the app state, routers, controllers, services).

pub mod config;
pub mod models;

// Keep this module at crate root because the codebase references it as
// `crate::auth`.
#[path = "middleware/auth.rs"]
pub mod auth;

pub mod services;

pub mod controllers;
pub mod routes;

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: mongodb::Database,
    pub settings: config::Settings,
    pub market: services::market_data::MarketDataClient,
    pub events_tx: tokio::sync::broadcast::Sender<String>,
    pub monitors: Arc<services::monitor_registry::MonitorRegistry>,
    pub quota_cache: Arc<services::quota_service::QuotaCache>,
    pub banner_cache: Arc<services::sponsor_banner_service::BannerCache>,
}
