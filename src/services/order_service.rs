use chrono::Utc;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::FindOptions;
use regex::Regex;

use crate::{
    AppState,
    models::{Direction, OrderStatus, OrderType, PendingOrder},
};

use super::{account_service, auth_service::FieldErrors, quota_service};

pub const MAX_LEVERAGE: u32 = 100;
pub const DAILY_ORDER_LIMIT: i64 = 50;

#[derive(Debug, Clone)]
pub struct PlaceOrderInput {
    pub symbol: String,
    pub direction: Direction,
    pub order_type: OrderType,
    pub limit_price: f64,
    pub stop_price: Option<f64>,
    pub quantity: f64,
    pub leverage: u32,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

fn is_valid_symbol(sym: &str) -> bool {
    let re = Regex::new(r"^[A-Z0-9]{2,20}$").unwrap();
    re.is_match(sym)
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// Pure validation so it can be tested without a database.
pub fn validate_order_input(input: &PlaceOrderInput) -> FieldErrors {
    let mut errs = FieldErrors::new();

    let sym = input.symbol.trim().to_uppercase();
    if sym.is_empty() {
        errs.insert("symbol".into(), "Missing symbol.".into());
    } else if !is_valid_symbol(&sym) {
        errs.insert("symbol".into(), "Invalid symbol.".into());
    }

    if !positive(input.quantity) {
        errs.insert("quantity".into(), "Enter a valid quantity.".into());
    }

    if input.leverage < 1 || input.leverage > MAX_LEVERAGE {
        errs.insert(
            "leverage".into(),
            format!("Leverage must be between 1 and {MAX_LEVERAGE}."),
        );
    }

    if !positive(input.limit_price) {
        errs.insert("limit_price".into(), "Enter a valid limit price.".into());
    }

    match input.order_type {
        OrderType::StopLimit => match input.stop_price {
            Some(sp) if positive(sp) => {}
            _ => {
                errs.insert(
                    "stop_price".into(),
                    "Stop price is required for stop-limit orders.".into(),
                );
            }
        },
        OrderType::Limit => {}
    }

    if let Some(sl) = input.stop_loss {
        if !positive(sl) {
            errs.insert("stop_loss".into(), "Enter a valid stop loss.".into());
        }
    }
    if let Some(tp) = input.take_profit {
        if !positive(tp) {
            errs.insert("take_profit".into(), "Enter a valid take profit.".into());
        }
    }

    errs
}

pub async fn place_order(
    state: &AppState,
    user_id: ObjectId,
    input: PlaceOrderInput,
) -> Result<PendingOrder, FieldErrors> {
    let mut errs = validate_order_input(&input);
    if !errs.is_empty() {
        return Err(errs);
    }

    quota_service::check_and_consume(state, user_id, "orders", DAILY_ORDER_LIMIT).await?;

    let now = Utc::now().timestamp();
    let mut order = PendingOrder {
        id: ObjectId::new(),
        user_id,
        symbol: input.symbol.trim().to_uppercase(),
        direction: input.direction,
        order_type: input.order_type,
        limit_price: input.limit_price,
        stop_price: match input.order_type {
            OrderType::StopLimit => input.stop_price,
            OrderType::Limit => None,
        },
        quantity: input.quantity,
        leverage: input.leverage,
        stop_loss: input.stop_loss,
        take_profit: input.take_profit,
        reserved_cost: 0.0,
        status: OrderStatus::Pending,
        created_at: now,
    };

    // validation guarantees a trigger price exists
    let trigger = order.trigger_price().unwrap_or(order.limit_price);
    order.reserved_cost = order.cost_at(trigger);

    let acc = match account_service::get_or_create_account(state, user_id).await {
        Ok(a) => a,
        Err(e) => {
            errs.insert("_form".into(), format!("db error: {e}"));
            return Err(errs);
        }
    };

    if acc.cash < order.reserved_cost {
        errs.insert("balance".into(), "Not enough cash.".into());
        return Err(errs);
    }

    if let Err(e) = account_service::set_cash(state, user_id, acc.cash - order.reserved_cost, now).await {
        errs.insert("_form".into(), format!("db error: {e}"));
        return Err(errs);
    }

    let orders = state.db.collection::<PendingOrder>("pending_orders");
    if let Err(e) = orders.insert_one(&order, None).await {
        // give the reservation back, best-effort
        let _ = account_service::set_cash(state, user_id, acc.cash, now).await;
        errs.insert("_form".into(), format!("db error: {e}"));
        return Err(errs);
    }

    let _ = state.events_tx.send("ordersUpdated".to_string());
    let _ = state.events_tx.send("cashUpdated".to_string());

    // make sure the symbol is being watched
    if let Err(e) = state.monitors.refresh(user_id).await {
        tracing::error!("monitor refresh failed for {user_id}: {e}");
    }

    Ok(order)
}

pub async fn cancel_order(
    state: &AppState,
    user_id: ObjectId,
    order_id: ObjectId,
) -> Result<PendingOrder, FieldErrors> {
    let mut errs = FieldErrors::new();

    let orders = state.db.collection::<PendingOrder>("pending_orders");

    let order = match orders
        .find_one(doc! { "_id": order_id, "user_id": user_id }, None)
        .await
    {
        Ok(Some(o)) => o,
        Ok(None) => {
            errs.insert("order".into(), "Order not found.".into());
            return Err(errs);
        }
        Err(e) => {
            errs.insert("_form".into(), format!("db error: {e}"));
            return Err(errs);
        }
    };

    // same PENDING guard the monitor fill uses: whoever flips status first wins
    let res = match orders
        .update_one(
            doc! { "_id": order_id, "user_id": user_id, "status": "PENDING" },
            doc! { "$set": { "status": "CANCELLED" } },
            None,
        )
        .await
    {
        Ok(r) => r,
        Err(e) => {
            errs.insert("_form".into(), format!("db error: {e}"));
            return Err(errs);
        }
    };

    if res.modified_count == 0 {
        errs.insert("order".into(), "Order is no longer pending.".into());
        return Err(errs);
    }

    // refund the reservation
    let now = Utc::now().timestamp();
    let accounts = state.db.collection::<crate::models::Account>("accounts");
    if let Err(e) = accounts
        .update_one(
            doc! { "_id": user_id },
            doc! { "$inc": { "cash": order.reserved_cost }, "$set": { "updated_at": now } },
            None,
        )
        .await
    {
        errs.insert("_form".into(), format!("db error: {e}"));
        return Err(errs);
    }

    let _ = state.events_tx.send("ordersUpdated".to_string());
    let _ = state.events_tx.send("cashUpdated".to_string());

    if let Err(e) = state.monitors.refresh(user_id).await {
        tracing::error!("monitor refresh failed for {user_id}: {e}");
    }

    let mut cancelled = order;
    cancelled.status = OrderStatus::Cancelled;
    Ok(cancelled)
}

pub async fn list_pending(state: &AppState, user_id: ObjectId) -> Result<Vec<PendingOrder>, String> {
    let orders = state.db.collection::<PendingOrder>("pending_orders");
    let find_opts = FindOptions::builder().sort(doc! { "created_at": -1 }).build();

    let mut cursor = orders
        .find(doc! { "user_id": user_id, "status": "PENDING" }, find_opts)
        .await
        .map_err(|e| e.to_string())?;

    let mut out: Vec<PendingOrder> = Vec::new();
    while let Some(res) = cursor.next().await {
        out.push(res.map_err(|e| e.to_string())?);
    }
    Ok(out)
}
