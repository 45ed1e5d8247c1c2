use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Fixed trading fee, charged on notional at reservation and again at close.
pub const FEE_RATE: f64 = 0.0005;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for longs, -1 for shorts (PnL sign).
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Limit,
    StopLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Filled,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOrder {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,
    pub symbol: String,

    pub direction: Direction,
    pub order_type: OrderType,

    pub limit_price: f64,
    // required for stop_limit, absent for plain limit
    pub stop_price: Option<f64>,

    pub quantity: f64,
    pub leverage: u32,

    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,

    /// Margin + fee debited at placement, priced at the trigger price.
    /// Reconciled against the actual execution cost on fill.
    pub reserved_cost: f64,

    pub status: OrderStatus,
    pub created_at: i64,
}

impl PendingOrder {
    /// The price the order was reserved at: the limit price for limit orders,
    /// the stop price for stop-limits.
    pub fn trigger_price(&self) -> Option<f64> {
        match self.order_type {
            OrderType::Limit => Some(self.limit_price),
            OrderType::StopLimit => self.stop_price,
        }
    }

    /// Whether a tick at `price` converts this order into a trade.
    ///
    /// A stop-limit without a stop price never fires; placement validation
    /// rejects such orders before they reach the book.
    pub fn triggers_at(&self, price: f64) -> bool {
        match (self.order_type, self.direction) {
            (OrderType::Limit, Direction::Long) => price <= self.limit_price,
            (OrderType::Limit, Direction::Short) => price >= self.limit_price,
            (OrderType::StopLimit, Direction::Long) => {
                self.stop_price.is_some_and(|sp| price >= sp)
            }
            (OrderType::StopLimit, Direction::Short) => {
                self.stop_price.is_some_and(|sp| price <= sp)
            }
        }
    }

    pub fn notional_at(&self, price: f64) -> f64 {
        price * self.quantity
    }

    /// Margin plus opening fee at `price`.
    pub fn cost_at(&self, price: f64) -> f64 {
        let notional = self.notional_at(price);
        notional / (self.leverage.max(1) as f64) + notional * FEE_RATE
    }
}
