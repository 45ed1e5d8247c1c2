pub mod db_init;
pub mod market_data;
pub mod market_feed;

pub mod order_monitor;
pub mod order_store;
pub mod monitor_registry;

pub mod auth_service;
pub mod account_service;
pub mod order_service;
pub mod portfolio_service;
pub mod quota_service;
pub mod sponsor_banner_service;
pub mod whale_tracker_service;
