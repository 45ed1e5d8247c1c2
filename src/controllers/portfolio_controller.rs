use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    response::{IntoResponse, Response},
};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState,
    models::{CurrentUser, Trade},
    services::portfolio_service,
};

use super::{field_errors, server_error, single_field_error, unauthorized};

const DEFAULT_HISTORY_LIMIT: i64 = 50;

fn trade_json(t: &Trade) -> serde_json::Value {
    json!({
        "id": t.id.to_hex(),
        "order_id": t.order_id.to_hex(),
        "symbol": t.symbol,
        "direction": t.direction,
        "entry_price": t.entry_price,
        "quantity": t.quantity,
        "leverage": t.leverage,
        "fee": t.fee,
        "status": t.status,
        "exit_price": t.exit_price,
        "pnl": t.pnl,
        "opened_at": t.opened_at,
        "closed_at": t.closed_at,
    })
}

// GET /portfolio/trades
pub async fn list_open_trades(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    match portfolio_service::list_open_trade_views(&state, u.id).await {
        Ok(views) => Json(json!({ "trades": views })).into_response(),
        Err(e) => server_error(e),
    }
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

// GET /portfolio/history?limit=20
pub async fn trade_history(
    State(state): State<AppState>,
    Query(q): Query<HistoryQuery>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let limit = q.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, 200);

    match portfolio_service::list_trade_history(&state, u.id, limit).await {
        Ok(trades) => {
            let items: Vec<_> = trades.iter().map(trade_json).collect();
            Json(json!({ "trades": items })).into_response()
        }
        Err(e) => server_error(e),
    }
}

// POST /trades/:id/close
pub async fn close_trade(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let Ok(trade_id) = ObjectId::parse_str(id.trim()) else {
        return single_field_error("trade", "Invalid trade id.");
    };

    match portfolio_service::close_trade(&state, u.id, trade_id).await {
        Ok(result) => Json(json!({ "closed": result })).into_response(),
        Err(errs) => field_errors(errs),
    }
}
