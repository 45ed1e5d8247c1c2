use chrono::Utc;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::FindOptions;
use tokio::sync::broadcast;

use crate::{
    AppState,
    models::{Trade, WhaleEvent},
};

/// Fills with a notional at or above this land in the community whale feed.
pub const WHALE_NOTIONAL_THRESHOLD: f64 = 100_000.0;

/// Records a whale event for a large fill. Best-effort: a failed insert is
/// logged and swallowed, the fill itself already committed.
pub async fn record_fill(
    db: &mongodb::Database,
    events_tx: &broadcast::Sender<String>,
    trade: &Trade,
) {
    let notional = trade.entry_price * trade.quantity;
    if notional < WHALE_NOTIONAL_THRESHOLD {
        return;
    }

    let event = WhaleEvent {
        id: ObjectId::new(),
        symbol: trade.symbol.clone(),
        direction: trade.direction,
        price: trade.entry_price,
        quantity: trade.quantity,
        notional,
        created_at: Utc::now().timestamp(),
    };

    let whales = db.collection::<WhaleEvent>("whale_events");
    match whales.insert_one(&event, None).await {
        Ok(_) => {
            let _ = events_tx.send("whaleAlert".to_string());
        }
        Err(e) => {
            tracing::warn!("whale event insert failed: {e}");
        }
    }
}

pub async fn list_recent(state: &AppState, limit: i64) -> Result<Vec<WhaleEvent>, String> {
    let whales = state.db.collection::<WhaleEvent>("whale_events");
    let find_opts = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .limit(limit)
        .build();

    let mut cursor = whales
        .find(doc! {}, find_opts)
        .await
        .map_err(|e| e.to_string())?;

    let mut out: Vec<WhaleEvent> = Vec::new();
    while let Some(res) = cursor.next().await {
        out.push(res.map_err(|e| e.to_string())?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_separates_whales_from_minnows() {
        // 2 BTC at 60k is a whale, 0.1 BTC is not
        assert!(60_000.0 * 2.0 >= WHALE_NOTIONAL_THRESHOLD);
        assert!(60_000.0 * 0.1 < WHALE_NOTIONAL_THRESHOLD);
    }
}
