use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mongodb::bson::doc;
use serde_json::json;

use crate::AppState;

// GET /
pub async fn index() -> Response {
    Json(json!({ "name": "gemtrade", "status": "ok" })).into_response()
}

// GET /health
pub async fn health() -> Response {
    Json(json!({ "ok": true })).into_response()
}

// GET /health/db
pub async fn health_db(State(state): State<AppState>) -> Response {
    match state.db.run_command(doc! { "ping": 1 }, None).await {
        Ok(_) => Json(json!({ "ok": true })).into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "ok": false, "error": e.to_string() })),
        )
            .into_response(),
    }
}

// fallback
pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "not found" })),
    )
        .into_response()
}
