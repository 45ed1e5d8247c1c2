use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::pending_order::Direction;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhaleEvent {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub symbol: String,
    pub direction: Direction,

    pub price: f64,
    pub quantity: f64,
    // price * quantity at fill time
    pub notional: f64,

    pub created_at: i64,
}
