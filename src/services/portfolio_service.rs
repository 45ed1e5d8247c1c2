use chrono::Utc;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::FindOptions;
use serde::Serialize;

use crate::{
    AppState,
    models::{Trade, TradeStatus, pending_order::FEE_RATE},
};

use super::{account_service, auth_service::FieldErrors};

#[derive(Debug, Clone, Serialize)]
pub struct TradeView {
    pub id: String,
    pub symbol: String,
    pub direction: crate::models::Direction,
    pub quantity: f64,
    pub leverage: u32,
    pub entry_price: f64,
    pub mark_price: f64,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub pnl_class: &'static str,
    pub opened_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloseResult {
    pub symbol: String,
    pub quantity: f64,
    pub exit_price: f64,
    pub pnl: f64,
    pub payout: f64,
    pub new_cash: f64,
}

fn pnl_class(pnl: f64) -> &'static str {
    if pnl > 0.0 {
        "up"
    } else if pnl < 0.0 {
        "down"
    } else {
        "flat"
    }
}

pub async fn list_open_trades(state: &AppState, user_id: ObjectId) -> Result<Vec<Trade>, String> {
    let trades = state.db.collection::<Trade>("trades");
    let find_opts = FindOptions::builder().sort(doc! { "opened_at": -1 }).build();

    let mut cursor = trades
        .find(doc! { "user_id": user_id, "status": "OPEN" }, find_opts)
        .await
        .map_err(|e| e.to_string())?;

    let mut out: Vec<Trade> = Vec::new();
    while let Some(res) = cursor.next().await {
        out.push(res.map_err(|e| e.to_string())?);
    }
    Ok(out)
}

/// Open trades marked at the latest REST quote. A dead quote falls back to the
/// entry price (flat PnL) rather than poisoning the view with zeros.
pub async fn list_open_trade_views(state: &AppState, user_id: ObjectId) -> Result<Vec<TradeView>, String> {
    let trades = list_open_trades(state, user_id).await?;

    let mut views: Vec<TradeView> = Vec::new();
    for t in trades {
        let mark = state
            .market
            .price(&t.symbol)
            .await
            .unwrap_or(t.entry_price);

        let pnl = t.pnl_at(mark);
        let margin = t.margin();
        let pct = if margin > 0.0 { pnl / margin * 100.0 } else { 0.0 };

        views.push(TradeView {
            id: t.id.to_hex(),
            symbol: t.symbol.clone(),
            direction: t.direction,
            quantity: t.quantity,
            leverage: t.leverage,
            entry_price: t.entry_price,
            mark_price: mark,
            pnl,
            pnl_pct: pct,
            pnl_class: pnl_class(pnl),
            opened_at: t.opened_at,
        });
    }

    Ok(views)
}

pub async fn list_trade_history(
    state: &AppState,
    user_id: ObjectId,
    limit: i64,
) -> Result<Vec<Trade>, String> {
    let trades = state.db.collection::<Trade>("trades");
    let find_opts = FindOptions::builder()
        .sort(doc! { "closed_at": -1 })
        .limit(limit)
        .build();

    let mut cursor = trades
        .find(doc! { "user_id": user_id, "status": "CLOSED" }, find_opts)
        .await
        .map_err(|e| e.to_string())?;

    let mut out: Vec<Trade> = Vec::new();
    while let Some(res) = cursor.next().await {
        out.push(res.map_err(|e| e.to_string())?);
    }
    Ok(out)
}

/// Closes an open trade at the current market price. The OPEN guard mirrors
/// the pending-order fill: exactly one close wins.
pub async fn close_trade(
    state: &AppState,
    user_id: ObjectId,
    trade_id: ObjectId,
) -> Result<CloseResult, FieldErrors> {
    let mut errs = FieldErrors::new();

    let trades = state.db.collection::<Trade>("trades");

    let trade = match trades
        .find_one(doc! { "_id": trade_id, "user_id": user_id }, None)
        .await
    {
        Ok(Some(t)) => t,
        Ok(None) => {
            errs.insert("trade".into(), "Trade not found.".into());
            return Err(errs);
        }
        Err(e) => {
            errs.insert("_form".into(), format!("db error: {e}"));
            return Err(errs);
        }
    };

    if trade.status != TradeStatus::Open {
        errs.insert("trade".into(), "Trade is already closed.".into());
        return Err(errs);
    }

    let price = match state.market.price(&trade.symbol).await {
        Ok(p) => p,
        Err(e) => {
            errs.insert("_form".into(), format!("Quote error: {e}"));
            return Err(errs);
        }
    };

    let now = Utc::now().timestamp();
    let pnl = trade.pnl_at(price);
    let close_fee = price * trade.quantity * FEE_RATE;

    let res = match trades
        .update_one(
            doc! { "_id": trade_id, "user_id": user_id, "status": "OPEN" },
            doc! { "$set": {
                "status": "CLOSED",
                "exit_price": price,
                "pnl": pnl,
                "closed_at": now,
            }},
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
        errs.insert("trade".into(), "Trade is already closed.".into());
        return Err(errs);
    }

    let payout = trade.margin() + pnl - close_fee;

    let mut acc = match account_service::get_or_create_account(state, user_id).await {
        Ok(a) => a,
        Err(e) => {
            errs.insert("_form".into(), format!("db error: {e}"));
            return Err(errs);
        }
    };

    acc.cash += payout;
    acc.updated_at = now;

    if let Err(e) = account_service::set_cash(state, user_id, acc.cash, now).await {
        errs.insert("_form".into(), format!("db error: {e}"));
        return Err(errs);
    }

    let _ = state.events_tx.send("tradesUpdated".to_string());
    let _ = state.events_tx.send("cashUpdated".to_string());

    Ok(CloseResult {
        symbol: trade.symbol,
        quantity: trade.quantity,
        exit_price: price,
        pnl,
        payout,
        new_cash: acc.cash,
    })
}
