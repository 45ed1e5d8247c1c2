use std::sync::Arc;

use axum::{
    Router,
    http::{Request, StatusCode},
    routing::{get, post},
};
use http_body_util::BodyExt;
use mongodb::{Client, bson::oid::ObjectId};
use tower::ServiceExt;

use gemtrade::models::CurrentUser;
use gemtrade::{AppState, config, controllers::portfolio_controller, services};

async fn test_state() -> AppState {
    let settings = config::load();

    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("mongodb client");
    let db = client.database(&settings.mongodb_db);

    let (events_tx, _events_rx) = tokio::sync::broadcast::channel::<String>(16);

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

    AppState {
        db,
        settings: settings.clone(),
        market: services::market_data::MarketDataClient::new(settings.market_api_url.clone()),
        events_tx,
        monitors,
        quota_cache: Arc::new(services::quota_service::QuotaCache::new()),
        banner_cache: Arc::new(services::sponsor_banner_service::BannerCache::new()),
    }
}

fn portfolio_app(state: AppState) -> Router {
    Router::new()
        .route("/portfolio/trades", get(portfolio_controller::list_open_trades))
        .route("/portfolio/history", get(portfolio_controller::trade_history))
        .route("/trades/:id/close", post(portfolio_controller::close_trade))
        .with_state(state)
}

fn current_user() -> CurrentUser {
    CurrentUser {
        id: ObjectId::new(),
        email: "test@example.com".to_string(),
        username: "test".to_string(),
    }
}

async fn response_body_string(res: axum::response::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

#[tokio::test]
async fn open_trades_unauthorized_returns_401() {
    let app = portfolio_app(test_state().await);

    let req = Request::builder()
        .method("GET")
        .uri("/portfolio/trades")
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn history_unauthorized_returns_401() {
    let app = portfolio_app(test_state().await);

    let req = Request::builder()
        .method("GET")
        .uri("/portfolio/history")
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn close_trade_unauthorized_returns_401() {
    let app = portfolio_app(test_state().await);

    let req = Request::builder()
        .method("POST")
        .uri("/trades/656f00000000000000000000/close")
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn close_trade_rejects_malformed_id() {
    let app = portfolio_app(test_state().await);

    let mut req = Request::builder()
        .method("POST")
        .uri("/trades/garbage/close")
        .body(axum::body::Body::empty())
        .unwrap();
    req.extensions_mut().insert(current_user());

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = response_body_string(res).await;
    assert!(body.contains("Invalid trade id"));
}
