use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::{AppState, services::whale_tracker_service};

use super::server_error;

const DEFAULT_WHALE_LIMIT: i64 = 20;

#[derive(Deserialize)]
pub struct WhalesQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

// GET /whales?limit=20
pub async fn list_whales(State(state): State<AppState>, Query(q): Query<WhalesQuery>) -> Response {
    let limit = q.limit.unwrap_or(DEFAULT_WHALE_LIMIT).clamp(1, 100);

    match whale_tracker_service::list_recent(&state, limit).await {
        Ok(events) => {
            let items: Vec<_> = events
                .iter()
                .map(|w| {
                    json!({
                        "id": w.id.to_hex(),
                        "symbol": w.symbol,
                        "direction": w.direction,
                        "price": w.price,
                        "quantity": w.quantity,
                        "notional": w.notional,
                        "created_at": w.created_at,
                    })
                })
                .collect();

            Json(json!({ "whales": items })).into_response()
        }
        Err(e) => server_error(e),
    }
}
