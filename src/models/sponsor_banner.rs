use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SponsorBanner {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub title: String,
    pub image_url: String,
    pub link_url: String,

    // higher weight sorts first
    pub weight: i32,

    pub active: bool,
    pub starts_at: i64,
    pub ends_at: i64,
}
