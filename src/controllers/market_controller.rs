use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::AppState;

// GET /market/:symbol
pub async fn get_ticker(State(state): State<AppState>, Path(symbol): Path<String>) -> Response {
    let sym = symbol.trim().to_uppercase();

    if sym.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "missing symbol" })),
        )
            .into_response();
    }

    match state.market.ticker_24h(&sym).await {
        Ok(ticker) => Json(json!({ "ticker": ticker })).into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": e })),
        )
            .into_response(),
    }
}
