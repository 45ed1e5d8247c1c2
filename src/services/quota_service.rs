use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use tokio::time::timeout;

use crate::{AppState, models::Quota};

use super::auth_service::FieldErrors;

const DB_TIMEOUT: Duration = Duration::from_secs(3);
const CACHE_TTL: Duration = Duration::from_secs(30);

/// In-process cache of the last seen `used` counter per (user, kind, day).
/// Only used to fast-reject when a user is already over the limit; actual
/// consumption always goes through the database.
pub struct QuotaCache {
    entries: Mutex<HashMap<(ObjectId, String), (i64, Instant)>>,
}

impl QuotaCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get(&self, key: &(ObjectId, String)) -> Option<i64> {
        let entries = self.entries.lock().unwrap();
        let (used, at) = entries.get(key)?;
        if at.elapsed() > CACHE_TTL {
            return None;
        }
        Some(*used)
    }

    fn put(&self, key: (ObjectId, String), used: i64) {
        self.entries
            .lock()
            .unwrap()
            .insert(key, (used, Instant::now()));
    }
}

impl Default for QuotaCache {
    fn default() -> Self {
        Self::new()
    }
}

fn over_limit(kind: &str) -> FieldErrors {
    let mut errs = FieldErrors::new();
    errs.insert("quota".into(), format!("Daily {kind} limit reached."));
    errs
}

/// Counts one action of `kind` against the user's daily quota.
///
/// The counter is a per-(user, kind, day) document upserted with `$inc`, so
/// concurrent requests cannot lose an increment. A rejected attempt still
/// counts one increment; it only matters once the user is already over.
pub async fn check_and_consume(
    state: &AppState,
    user_id: ObjectId,
    kind: &str,
    limit: i64,
) -> Result<(), FieldErrors> {
    let day = Utc::now().format("%Y-%m-%d").to_string();
    let cache_key = (user_id, format!("{kind}:{day}"));

    if let Some(used) = state.quota_cache.get(&cache_key) {
        if used >= limit {
            return Err(over_limit(kind));
        }
    }

    let now = Utc::now().timestamp();
    let quotas = state.db.collection::<Quota>("quotas");

    let opts = FindOneAndUpdateOptions::builder()
        .upsert(true)
        .return_document(ReturnDocument::After)
        .build();

    let update = quotas.find_one_and_update(
        doc! { "user_id": user_id, "kind": kind, "day": &day },
        doc! { "$inc": { "used": 1 }, "$set": { "updated_at": now } },
        opts,
    );

    // these checks hang the whole request when the DB stalls, so cap them
    let updated = match timeout(DB_TIMEOUT, update).await {
        Err(_) => {
            let mut errs = FieldErrors::new();
            errs.insert("_form".into(), "Quota check timed out.".into());
            return Err(errs);
        }
        Ok(Err(e)) => {
            let mut errs = FieldErrors::new();
            errs.insert("_form".into(), format!("db error: {e}"));
            return Err(errs);
        }
        Ok(Ok(None)) => {
            let mut errs = FieldErrors::new();
            errs.insert("_form".into(), "Quota check failed.".into());
            return Err(errs);
        }
        Ok(Ok(Some(q))) => q,
    };

    state.quota_cache.put(cache_key, updated.used);

    if updated.used > limit {
        return Err(over_limit(kind));
    }

    Ok(())
}

pub async fn remaining(state: &AppState, user_id: ObjectId, kind: &str, limit: i64) -> Result<i64, String> {
    let day = Utc::now().format("%Y-%m-%d").to_string();
    let quotas = state.db.collection::<Quota>("quotas");

    let used = match timeout(
        DB_TIMEOUT,
        quotas.find_one(doc! { "user_id": user_id, "kind": kind, "day": &day }, None),
    )
    .await
    {
        Err(_) => return Err("Quota check timed out.".into()),
        Ok(Err(e)) => return Err(e.to_string()),
        Ok(Ok(q)) => q.map(|q| q.used).unwrap_or(0),
    };

    Ok((limit - used).max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_round_trips() {
        let cache = QuotaCache::new();
        let key = (ObjectId::new(), "orders:2026-08-06".to_string());

        assert_eq!(cache.get(&key), None);
        cache.put(key.clone(), 3);
        assert_eq!(cache.get(&key), Some(3));
    }

    #[test]
    fn cache_entries_are_independent_per_key() {
        let cache = QuotaCache::new();
        let a = (ObjectId::new(), "orders:2026-08-06".to_string());
        let b = (a.0, "voice_queries:2026-08-06".to_string());

        cache.put(a.clone(), 1);
        assert_eq!(cache.get(&b), None);
    }
}
