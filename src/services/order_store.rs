use chrono::Utc;
use futures_util::StreamExt;
use mongodb::Client;
use mongodb::bson::{doc, oid::ObjectId};
use tokio::sync::broadcast;

use crate::models::{Account, PendingOrder, Trade};

use super::order_monitor::{FillOutcome, OrderStore};
use super::whale_tracker_service;

/// MongoDB-backed order store.
///
/// `fill_order` runs the status CAS, trade insert, and balance adjustment in
/// one multi-document transaction, so a fill either lands completely or not at
/// all and the order stays PENDING. Requires a replica-set deployment, which
/// Mongo transactions need anyway.
#[derive(Clone)]
pub struct MongoOrderStore {
    client: Client,
    db: mongodb::Database,
    events_tx: broadcast::Sender<String>,
}

impl MongoOrderStore {
    pub fn new(client: Client, db: mongodb::Database, events_tx: broadcast::Sender<String>) -> Self {
        Self {
            client,
            db,
            events_tx,
        }
    }
}

impl OrderStore for MongoOrderStore {
    async fn pending_orders(&self, user_id: ObjectId) -> Result<Vec<PendingOrder>, String> {
        let orders = self.db.collection::<PendingOrder>("pending_orders");

        let mut cursor = orders
            .find(doc! { "user_id": user_id, "status": "PENDING" }, None)
            .await
            .map_err(|e| e.to_string())?;

        let mut out: Vec<PendingOrder> = Vec::new();
        while let Some(res) = cursor.next().await {
            out.push(res.map_err(|e| e.to_string())?);
        }
        Ok(out)
    }

    async fn fill_order(&self, order: &PendingOrder, price: f64) -> Result<FillOutcome, String> {
        let now = Utc::now().timestamp();
        let trade = Trade::from_fill(order, price, now);
        // cash was debited at the trigger price when the order was placed;
        // settle the difference against the actual execution cost
        let refund = order.reserved_cost - order.cost_at(price);

        let mut session = self
            .client
            .start_session(None)
            .await
            .map_err(|e| e.to_string())?;
        session
            .start_transaction(None)
            .await
            .map_err(|e| e.to_string())?;

        let orders = self.db.collection::<PendingOrder>("pending_orders");
        let res = match orders
            .update_one_with_session(
                doc! { "_id": order.id, "status": "PENDING" },
                doc! { "$set": { "status": "FILLED" } },
                None,
                &mut session,
            )
            .await
        {
            Ok(r) => r,
            Err(e) => {
                let _ = session.abort_transaction().await;
                return Err(e.to_string());
            }
        };

        if res.modified_count == 0 {
            // someone else moved it out of PENDING first
            let _ = session.abort_transaction().await;
            return Ok(FillOutcome::AlreadyFilled);
        }

        let trades = self.db.collection::<Trade>("trades");
        if let Err(e) = trades
            .insert_one_with_session(&trade, None, &mut session)
            .await
        {
            let _ = session.abort_transaction().await;
            return Err(e.to_string());
        }

        let accounts = self.db.collection::<Account>("accounts");
        if let Err(e) = accounts
            .update_one_with_session(
                doc! { "_id": order.user_id },
                doc! { "$inc": { "cash": refund }, "$set": { "updated_at": now } },
                None,
                &mut session,
            )
            .await
        {
            let _ = session.abort_transaction().await;
            return Err(e.to_string());
        }

        session
            .commit_transaction()
            .await
            .map_err(|e| e.to_string())?;

        // community feed, best-effort: never fails the fill
        whale_tracker_service::record_fill(&self.db, &self.events_tx, &trade).await;

        Ok(FillOutcome::Filled(trade))
    }
}
