use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Per-user, per-kind daily action counter ("orders", "voice_queries", ...).
/// One document per (user, kind); `day` resets the window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quota {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,
    pub kind: String,

    // UTC date the counter belongs to, "YYYY-MM-DD"
    pub day: String,
    pub used: i64,

    pub updated_at: i64,
}
