use axum::{
    Json,
    extract::{Extension, Path, State},
    response::{IntoResponse, Response},
};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState,
    models::{CurrentUser, Direction, OrderType, PendingOrder},
    services::order_service::{self, PlaceOrderInput},
};

use super::{field_errors, server_error, single_field_error, unauthorized};

fn order_json(o: &PendingOrder) -> serde_json::Value {
    json!({
        "id": o.id.to_hex(),
        "symbol": o.symbol,
        "direction": o.direction,
        "order_type": o.order_type,
        "limit_price": o.limit_price,
        "stop_price": o.stop_price,
        "quantity": o.quantity,
        "leverage": o.leverage,
        "stop_loss": o.stop_loss,
        "take_profit": o.take_profit,
        "reserved_cost": o.reserved_cost,
        "status": o.status,
        "created_at": o.created_at,
    })
}

fn parse_direction(s: &str) -> Option<Direction> {
    match s.trim().to_uppercase().as_str() {
        "LONG" => Some(Direction::Long),
        "SHORT" => Some(Direction::Short),
        _ => None,
    }
}

fn parse_order_type(s: &str) -> Option<OrderType> {
    match s.trim().to_lowercase().as_str() {
        "limit" => Some(OrderType::Limit),
        "stop_limit" => Some(OrderType::StopLimit),
        _ => None,
    }
}

// GET /orders
pub async fn list_orders(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    match order_service::list_pending(&state, u.id).await {
        Ok(orders) => {
            let items: Vec<_> = orders.iter().map(order_json).collect();
            Json(json!({ "orders": items })).into_response()
        }
        Err(e) => server_error(e),
    }
}

#[derive(Deserialize)]
pub struct PlaceOrderBody {
    pub symbol: String,
    pub direction: String,
    pub order_type: String,
    pub limit_price: f64,
    #[serde(default)]
    pub stop_price: Option<f64>,
    pub quantity: f64,
    pub leverage: u32,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub take_profit: Option<f64>,
}

// POST /orders
pub async fn place_order(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(body): Json<PlaceOrderBody>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let Some(direction) = parse_direction(&body.direction) else {
        return single_field_error("direction", "Direction must be LONG or SHORT.");
    };

    let Some(order_type) = parse_order_type(&body.order_type) else {
        return single_field_error("order_type", "Order type must be limit or stop_limit.");
    };

    let input = PlaceOrderInput {
        symbol: body.symbol,
        direction,
        order_type,
        limit_price: body.limit_price,
        stop_price: body.stop_price,
        quantity: body.quantity,
        leverage: body.leverage,
        stop_loss: body.stop_loss,
        take_profit: body.take_profit,
    };

    match order_service::place_order(&state, u.id, input).await {
        Ok(order) => Json(json!({ "order": order_json(&order) })).into_response(),
        Err(errs) => field_errors(errs),
    }
}

// POST /orders/:id/cancel
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let Ok(order_id) = ObjectId::parse_str(id.trim()) else {
        return single_field_error("order", "Invalid order id.");
    };

    match order_service::cancel_order(&state, u.id, order_id).await {
        Ok(order) => Json(json!({ "order": order_json(&order) })).into_response(),
        Err(errs) => field_errors(errs),
    }
}
