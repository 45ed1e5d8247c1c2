use std::net::SocketAddr;
use std::sync::Arc;

use mongodb::Client;

use gemtrade::{AppState, config, routes, services};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = config::load();

    // Mongo connection
    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("Failed to connect to MongoDB");
    let db = client.database(&settings.mongodb_db);

    if let Err(e) = services::db_init::ensure_indexes(&db).await {
        tracing::warn!("index bootstrap failed: {e}");
    }

    let (events_tx, _events_rx) = tokio::sync::broadcast::channel::<String>(64);

    let store = Arc::new(services::order_store::MongoOrderStore::new(
        client.clone(),
        db.clone(),
        events_tx.clone(),
    ));
    let feed = Arc::new(services::market_feed::BinanceFeed::new(
        settings.feed_ws_url.clone(),
    ));
    let monitors = Arc::new(services::monitor_registry::MonitorRegistry::new(
        store,
        feed,
        events_tx.clone(),
    ));

    // pick monitoring back up for users that still have pending orders
    monitors.bootstrap(&db).await;

    let state = AppState {
        db,
        settings: settings.clone(),
        market: services::market_data::MarketDataClient::new(settings.market_api_url.clone()),
        events_tx,
        monitors,
        quota_cache: Arc::new(services::quota_service::QuotaCache::new()),
        banner_cache: Arc::new(services::sponsor_banner_service::BannerCache::new()),
    };

    let app = routes::app(state);

    let addr = SocketAddr::from((settings.host.parse::<std::net::IpAddr>().unwrap(), settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
