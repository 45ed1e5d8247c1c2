use std::collections::HashMap;
use std::sync::Arc;

use mongodb::bson::{Bson, doc, oid::ObjectId};
use tokio::sync::{Mutex, broadcast};
use tracing::{error, info};

use super::market_feed::BinanceFeed;
use super::order_monitor::OrderMonitor;
use super::order_store::MongoOrderStore;

pub type LiveMonitor = OrderMonitor<MongoOrderStore, BinanceFeed>;

/// Owns one order monitor per user. The original app ran the monitor inside
/// each client session; here the server keeps one alive per user with pending
/// orders and pokes it when the order book changes.
pub struct MonitorRegistry {
    store: Arc<MongoOrderStore>,
    feed: Arc<BinanceFeed>,
    events_tx: broadcast::Sender<String>,
    monitors: Mutex<HashMap<ObjectId, Arc<LiveMonitor>>>,
}

impl MonitorRegistry {
    pub fn new(
        store: Arc<MongoOrderStore>,
        feed: Arc<BinanceFeed>,
        events_tx: broadcast::Sender<String>,
    ) -> Self {
        Self {
            store,
            feed,
            events_tx,
            monitors: Mutex::new(HashMap::new()),
        }
    }

    /// Start (or refresh) the monitor for a user. Safe to call repeatedly;
    /// starting an already-running monitor just reloads its pending set.
    pub async fn ensure_started(&self, user_id: ObjectId) -> Result<(), String> {
        let monitor = {
            let mut map = self.monitors.lock().await;
            map.entry(user_id)
                .or_insert_with(|| {
                    OrderMonitor::new(
                        user_id,
                        Arc::clone(&self.store),
                        Arc::clone(&self.feed),
                        self.events_tx.clone(),
                    )
                })
                .clone()
        };

        monitor.start().await
    }

    /// Re-sync a user's monitor after an order was placed or cancelled.
    pub async fn refresh(&self, user_id: ObjectId) -> Result<(), String> {
        self.ensure_started(user_id).await
    }

    pub async fn stop(&self, user_id: ObjectId) {
        if let Some(monitor) = self.monitors.lock().await.remove(&user_id) {
            monitor.stop().await;
        }
    }

    pub async fn stop_all(&self) {
        let monitors: Vec<Arc<LiveMonitor>> = self.monitors.lock().await.drain().map(|(_, m)| m).collect();
        for monitor in monitors {
            monitor.stop().await;
        }
    }

    /// Startup scan: users that still have PENDING orders get their monitor
    /// back after a restart.
    pub async fn bootstrap(&self, db: &mongodb::Database) {
        let orders = db.collection::<mongodb::bson::Document>("pending_orders");

        let user_ids = match orders
            .distinct("user_id", doc! { "status": "PENDING" }, None)
            .await
        {
            Ok(ids) => ids,
            Err(e) => {
                error!("pending order scan failed: {e}");
                return;
            }
        };

        let mut started = 0usize;
        for id in user_ids {
            if let Bson::ObjectId(user_id) = id {
                match self.ensure_started(user_id).await {
                    Ok(()) => started += 1,
                    Err(e) => error!("monitor start failed for {user_id}: {e}"),
                }
            }
        }

        info!("order monitors running for {started} user(s)");
    }
}
