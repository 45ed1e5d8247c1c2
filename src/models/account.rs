use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Paper-trading cash balance. Every new account starts at `STARTING_CASH`.
pub const STARTING_CASH: f64 = 10_000.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    // use user id as primary key
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub cash: f64,
    pub updated_at: i64,
}
