use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::pending_order::{Direction, FEE_RATE, PendingOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,
    // the pending order this trade was filled from
    pub order_id: ObjectId,

    pub symbol: String,
    pub direction: Direction,

    pub entry_price: f64,
    pub quantity: f64,
    pub leverage: u32,

    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,

    /// Opening fee actually charged at fill.
    pub fee: f64,

    pub status: TradeStatus,

    pub exit_price: Option<f64>,
    pub pnl: Option<f64>,
    pub closed_at: Option<i64>,

    pub opened_at: i64,
}

impl Trade {
    /// The open trade a pending order becomes when it fills at `price`.
    pub fn from_fill(order: &PendingOrder, price: f64, now: i64) -> Self {
        Self {
            id: ObjectId::new(),
            user_id: order.user_id,
            order_id: order.id,
            symbol: order.symbol.clone(),
            direction: order.direction,
            entry_price: price,
            quantity: order.quantity,
            leverage: order.leverage,
            stop_loss: order.stop_loss,
            take_profit: order.take_profit,
            fee: order.notional_at(price) * FEE_RATE,
            status: TradeStatus::Open,
            exit_price: None,
            pnl: None,
            closed_at: None,
            opened_at: now,
        }
    }

    pub fn margin(&self) -> f64 {
        self.entry_price * self.quantity / (self.leverage.max(1) as f64)
    }

    /// Realized PnL if the trade exits at `price`.
    pub fn pnl_at(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.quantity * self.direction.sign()
    }
}
