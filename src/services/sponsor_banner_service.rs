use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::StreamExt;
use mongodb::bson::doc;
use mongodb::options::FindOptions;

use crate::{AppState, models::SponsorBanner};

const CACHE_TTL: Duration = Duration::from_secs(60);

/// Banners change rarely and every screen asks for them, so the active set is
/// cached for a fixed TTL.
pub struct BannerCache {
    entry: Mutex<Option<(Vec<SponsorBanner>, Instant)>>,
}

impl BannerCache {
    pub fn new() -> Self {
        Self {
            entry: Mutex::new(None),
        }
    }

    fn get(&self) -> Option<Vec<SponsorBanner>> {
        let entry = self.entry.lock().unwrap();
        let (banners, at) = entry.as_ref()?;
        if at.elapsed() > CACHE_TTL {
            return None;
        }
        Some(banners.clone())
    }

    fn put(&self, banners: Vec<SponsorBanner>) {
        *self.entry.lock().unwrap() = Some((banners, Instant::now()));
    }
}

impl Default for BannerCache {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn active_banners(state: &AppState) -> Result<Vec<SponsorBanner>, String> {
    if let Some(banners) = state.banner_cache.get() {
        return Ok(banners);
    }

    let now = Utc::now().timestamp();
    let banners = state.db.collection::<SponsorBanner>("sponsor_banners");

    let find_opts = FindOptions::builder().sort(doc! { "weight": -1 }).build();

    let mut cursor = banners
        .find(
            doc! {
                "active": true,
                "starts_at": { "$lte": now },
                "ends_at": { "$gte": now },
            },
            find_opts,
        )
        .await
        .map_err(|e| e.to_string())?;

    let mut out: Vec<SponsorBanner> = Vec::new();
    while let Some(res) = cursor.next().await {
        out.push(res.map_err(|e| e.to_string())?);
    }

    state.banner_cache.put(out.clone());
    Ok(out)
}
