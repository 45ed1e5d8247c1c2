use std::sync::Arc;

use axum::{
    Router,
    http::{Request, StatusCode, header},
    routing::{get, post},
};
use http_body_util::BodyExt;
use mongodb::{Client, bson::oid::ObjectId};
use tower::ServiceExt;

use gemtrade::models::CurrentUser;
use gemtrade::{AppState, config, controllers::auth_controller, services};

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

fn auth_app(state: AppState) -> Router {
    Router::new()
        .route("/auth/register", post(auth_controller::post_register))
        .route("/auth/login", post(auth_controller::post_login))
        .route("/auth/logout", post(auth_controller::post_logout))
        .route("/auth/me", get(auth_controller::get_me))
        .with_state(state)
}

async fn response_body_string(res: axum::response::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

#[tokio::test]
async fn login_requires_email() {
    let app = auth_app(test_state().await);

    let req = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            r#"{"email":"","password":"secret123"}"#,
        ))
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = response_body_string(res).await;
    assert!(body.contains("Email is required"));
}

#[tokio::test]
async fn login_rejects_malformed_email() {
    let app = auth_app(test_state().await);

    let req = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            r#"{"email":"not-an-email","password":"secret123"}"#,
        ))
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = response_body_string(res).await;
    assert!(body.contains("Invalid email"));
}

#[tokio::test]
async fn login_requires_password() {
    let app = auth_app(test_state().await);

    let req = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            r#"{"email":"test@example.com","password":""}"#,
        ))
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = response_body_string(res).await;
    assert!(body.contains("Password is required"));
}

#[tokio::test]
async fn register_rejects_short_username() {
    let app = auth_app(test_state().await);

    let req = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            r#"{"username":"a","email":"test@example.com","password":"secret123"}"#,
        ))
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = response_body_string(res).await;
    assert!(body.contains("Username must be at least 2 characters"));
}

#[tokio::test]
async fn register_rejects_short_password() {
    let app = auth_app(test_state().await);

    let req = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            r#"{"username":"tester","email":"test@example.com","password":"abc"}"#,
        ))
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = response_body_string(res).await;
    assert!(body.contains("Password must be at least 6 characters"));
}

#[tokio::test]
async fn register_rejects_malformed_email() {
    let app = auth_app(test_state().await);

    let req = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            r#"{"username":"tester","email":"nope","password":"secret123"}"#,
        ))
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = response_body_string(res).await;
    assert!(body.contains("Invalid email"));
}

#[tokio::test]
async fn me_unauthorized_returns_401() {
    let app = auth_app(test_state().await);

    let req = Request::builder()
        .method("GET")
        .uri("/auth/me")
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_returns_injected_user() {
    let app = auth_app(test_state().await);

    let mut req = Request::builder()
        .method("GET")
        .uri("/auth/me")
        .body(axum::body::Body::empty())
        .unwrap();

    req.extensions_mut().insert(CurrentUser {
        id: ObjectId::new(),
        email: "test@example.com".to_string(),
        username: "tester".to_string(),
    });

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = response_body_string(res).await;
    assert!(body.contains("test@example.com"));
    assert!(body.contains("tester"));
}

#[tokio::test]
async fn logout_clears_cookie_and_returns_ok() {
    let app = auth_app(test_state().await);

    let req = Request::builder()
        .method("POST")
        .uri("/auth/logout")
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key(header::SET_COOKIE));

    let body = response_body_string(res).await;
    assert!(body.contains("true"));
}
