use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use mongodb::bson::oid::ObjectId;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::models::{PendingOrder, Trade};

use super::market_feed::PriceFeed;

/// Result of asking the store to fill an order.
pub enum FillOutcome {
    Filled(Trade),
    /// The conditional update missed: some other path already moved the order
    /// out of PENDING.
    AlreadyFilled,
}

/// Backend operations the monitor needs. The store owns atomicity: `fill_order`
/// must transition the order out of PENDING, record the trade, and settle the
/// balance as a unit, guarded by the order still being PENDING.
pub trait OrderStore: Send + Sync + 'static {
    fn pending_orders(
        &self,
        user_id: ObjectId,
    ) -> impl Future<Output = Result<Vec<PendingOrder>, String>> + Send;

    fn fill_order(
        &self,
        order: &PendingOrder,
        price: f64,
    ) -> impl Future<Output = Result<FillOutcome, String>> + Send;
}

/// Watches live prices for one user's pending orders and converts them into
/// open trades when their trigger condition is met.
///
/// One consumer task per distinct symbol; the handles double as cancellation
/// tokens and are aborted on `stop`. The working set is optimistic: an order is
/// pulled out of it before the fill round-trips, so back-to-back ticks cannot
/// fire it twice. The store's PENDING guard covers everything else.
pub struct OrderMonitor<S, F> {
    user_id: ObjectId,
    store: Arc<S>,
    feed: Arc<F>,
    events_tx: broadcast::Sender<String>,

    orders: Mutex<Vec<PendingOrder>>,
    subscriptions: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl<S: OrderStore, F: PriceFeed> OrderMonitor<S, F> {
    pub fn new(
        user_id: ObjectId,
        store: Arc<S>,
        feed: Arc<F>,
        events_tx: broadcast::Sender<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            user_id,
            store,
            feed,
            events_tx,
            orders: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(HashMap::new()),
        })
    }

    pub fn user_id(&self) -> ObjectId {
        self.user_id
    }

    /// Load the user's pending orders and subscribe to every symbol they
    /// reference. Calling this on an already-running monitor just refreshes.
    pub async fn start(self: &Arc<Self>) -> Result<(), String> {
        self.refresh().await
    }

    /// Re-fetch the pending set and subscribe to any symbol not yet watched.
    /// Existing subscriptions are kept as-is.
    pub async fn refresh(self: &Arc<Self>) -> Result<(), String> {
        let pending = self.store.pending_orders(self.user_id).await?;

        let symbols: HashSet<String> = pending.iter().map(|o| o.symbol.clone()).collect();
        *self.orders.lock().await = pending;

        for symbol in symbols {
            self.ensure_subscribed(&symbol).await;
        }

        Ok(())
    }

    async fn ensure_subscribed(self: &Arc<Self>, symbol: &str) {
        let mut subs = self.subscriptions.lock().await;
        if subs.contains_key(symbol) {
            return;
        }

        let mut rx = self.feed.subscribe(symbol);
        let monitor = Arc::clone(self);
        let sym = symbol.to_string();

        let handle = tokio::spawn(async move {
            while let Some(tick) = rx.recv().await {
                monitor.check_orders(&tick.symbol, tick.price).await;
            }
            debug!("tick stream ended for {sym}");
        });

        subs.insert(symbol.to_string(), handle);
    }

    /// Evaluate the trigger predicate for every locally-held order on `symbol`
    /// and execute the ones that fire.
    pub async fn check_orders(&self, symbol: &str, price: f64) {
        // Pull triggered orders out of the working set before awaiting the
        // fill, so a second satisfying tick finds nothing to fire. An order
        // whose fill errors stays removed until the next refresh re-fetches
        // it from the backend.
        let triggered: Vec<PendingOrder> = {
            let mut orders = self.orders.lock().await;
            let mut hit = Vec::new();
            orders.retain(|o| {
                if o.symbol == symbol && o.triggers_at(price) {
                    hit.push(o.clone());
                    false
                } else {
                    true
                }
            });
            hit
        };

        for order in triggered {
            self.execute_order(&order, price).await;
        }
    }

    pub async fn execute_order(&self, order: &PendingOrder, price: f64) {
        match self.store.fill_order(order, price).await {
            Ok(FillOutcome::Filled(trade)) => {
                info!(
                    "order {} filled: {} {:?} qty {} @ {}",
                    order.id, trade.symbol, trade.direction, trade.quantity, trade.entry_price
                );
                let _ = self.events_tx.send("ordersUpdated".to_string());
                let _ = self.events_tx.send("tradesUpdated".to_string());
                let _ = self.events_tx.send("cashUpdated".to_string());
            }
            Ok(FillOutcome::AlreadyFilled) => {
                debug!("order {} already left PENDING, skipping", order.id);
            }
            Err(e) => {
                error!("order {} fill failed: {e}", order.id);
            }
        }
    }

    /// Abort every symbol task and clear local state. The feed may keep
    /// emitting; nothing listens anymore.
    pub async fn stop(&self) {
        let mut subs = self.subscriptions.lock().await;
        for (_, handle) in subs.drain() {
            handle.abort();
        }
        self.orders.lock().await.clear();
    }

    #[cfg(test)]
    async fn subscription_count(&self) -> usize {
        self.subscriptions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use chrono::Utc;
    use tokio::sync::mpsc;

    use crate::models::{Direction, OrderStatus, OrderType, pending_order::FEE_RATE};

    use super::super::market_feed::PriceTick;
    use super::*;

    struct MemStore {
        pending: StdMutex<Vec<PendingOrder>>,
        fills: StdMutex<Vec<(ObjectId, f64)>>,
        cash: StdMutex<f64>,
    }

    impl MemStore {
        fn new(orders: Vec<PendingOrder>) -> Arc<Self> {
            Arc::new(Self {
                pending: StdMutex::new(orders),
                fills: StdMutex::new(Vec::new()),
                cash: StdMutex::new(0.0),
            })
        }

        fn add_order(&self, order: PendingOrder) {
            self.pending.lock().unwrap().push(order);
        }

        fn fills(&self) -> Vec<(ObjectId, f64)> {
            self.fills.lock().unwrap().clone()
        }

        fn cash(&self) -> f64 {
            *self.cash.lock().unwrap()
        }
    }

    impl OrderStore for MemStore {
        async fn pending_orders(&self, user_id: ObjectId) -> Result<Vec<PendingOrder>, String> {
            Ok(self
                .pending
                .lock()
                .unwrap()
                .iter()
                .filter(|o| o.user_id == user_id && o.status == OrderStatus::Pending)
                .cloned()
                .collect())
        }

        async fn fill_order(&self, order: &PendingOrder, price: f64) -> Result<FillOutcome, String> {
            let mut pending = self.pending.lock().unwrap();

            let Some(pos) = pending
                .iter()
                .position(|o| o.id == order.id && o.status == OrderStatus::Pending)
            else {
                return Ok(FillOutcome::AlreadyFilled);
            };

            let filled = pending.remove(pos);
            drop(pending);

            self.fills.lock().unwrap().push((filled.id, price));
            *self.cash.lock().unwrap() += filled.reserved_cost - filled.cost_at(price);

            Ok(FillOutcome::Filled(Trade::from_fill(
                &filled,
                price,
                Utc::now().timestamp(),
            )))
        }
    }

    struct MemFeed {
        senders: StdMutex<HashMap<String, Vec<mpsc::Sender<PriceTick>>>>,
    }

    impl MemFeed {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                senders: StdMutex::new(HashMap::new()),
            })
        }

        async fn emit(&self, symbol: &str, price: f64) {
            let txs: Vec<mpsc::Sender<PriceTick>> = self
                .senders
                .lock()
                .unwrap()
                .get(symbol)
                .cloned()
                .unwrap_or_default();

            for tx in txs {
                let _ = tx
                    .send(PriceTick {
                        symbol: symbol.to_string(),
                        price,
                    })
                    .await;
            }
        }
    }

    impl PriceFeed for MemFeed {
        fn subscribe(&self, symbol: &str) -> mpsc::Receiver<PriceTick> {
            let (tx, rx) = mpsc::channel(16);
            self.senders
                .lock()
                .unwrap()
                .entry(symbol.to_string())
                .or_default()
                .push(tx);
            rx
        }
    }

    fn order(
        user_id: ObjectId,
        symbol: &str,
        direction: Direction,
        order_type: OrderType,
        limit_price: f64,
        stop_price: Option<f64>,
    ) -> PendingOrder {
        let mut o = PendingOrder {
            id: ObjectId::new(),
            user_id,
            symbol: symbol.to_string(),
            direction,
            order_type,
            limit_price,
            stop_price,
            quantity: 1.0,
            leverage: 10,
            stop_loss: None,
            take_profit: None,
            reserved_cost: 0.0,
            status: OrderStatus::Pending,
            created_at: 0,
        };
        o.reserved_cost = o.cost_at(o.trigger_price().unwrap_or(limit_price));
        o
    }

    async fn settle() {
        // give the spawned symbol tasks a chance to drain their channels
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    // ---------------- trigger predicate ----------------

    #[test]
    fn limit_long_fires_at_or_below_limit() {
        let o = order(ObjectId::new(), "BTCUSDT", Direction::Long, OrderType::Limit, 100.0, None);
        assert!(o.triggers_at(100.0));
        assert!(o.triggers_at(99.5));
        assert!(!o.triggers_at(100.01));
    }

    #[test]
    fn limit_short_fires_at_or_above_limit() {
        let o = order(ObjectId::new(), "BTCUSDT", Direction::Short, OrderType::Limit, 100.0, None);
        assert!(o.triggers_at(100.0));
        assert!(o.triggers_at(101.0));
        assert!(!o.triggers_at(99.99));
    }

    #[test]
    fn stop_limit_long_fires_at_or_above_stop() {
        let o = order(ObjectId::new(), "BTCUSDT", Direction::Long, OrderType::StopLimit, 100.0, Some(105.0));
        assert!(o.triggers_at(105.0));
        assert!(o.triggers_at(106.0));
        assert!(!o.triggers_at(104.99));
    }

    #[test]
    fn stop_limit_short_fires_at_or_below_stop() {
        let o = order(ObjectId::new(), "BTCUSDT", Direction::Short, OrderType::StopLimit, 100.0, Some(95.0));
        assert!(o.triggers_at(95.0));
        assert!(o.triggers_at(94.0));
        assert!(!o.triggers_at(95.01));
    }

    #[test]
    fn stop_limit_without_stop_price_never_fires() {
        let o = order(ObjectId::new(), "BTCUSDT", Direction::Long, OrderType::StopLimit, 100.0, None);
        assert!(!o.triggers_at(0.01));
        assert!(!o.triggers_at(1_000_000.0));
    }

    // ---------------- monitor behavior ----------------

    #[tokio::test]
    async fn fills_limit_long_at_trigger_price() {
        let user = ObjectId::new();
        let o = order(user, "BTCUSDT", Direction::Long, OrderType::Limit, 100.0, None);
        let order_id = o.id;

        let store = MemStore::new(vec![o]);
        let feed = MemFeed::new();
        let (events_tx, _rx) = broadcast::channel(16);

        let monitor = OrderMonitor::new(user, Arc::clone(&store), Arc::clone(&feed), events_tx);
        monitor.start().await.unwrap();

        feed.emit("BTCUSDT", 100.0).await;
        settle().await;

        assert_eq!(store.fills(), vec![(order_id, 100.0)]);
    }

    #[tokio::test]
    async fn does_not_fire_before_trigger() {
        let user = ObjectId::new();
        let o = order(user, "BTCUSDT", Direction::Long, OrderType::Limit, 100.0, None);

        let store = MemStore::new(vec![o]);
        let feed = MemFeed::new();
        let (events_tx, _rx) = broadcast::channel(16);

        let monitor = OrderMonitor::new(user, Arc::clone(&store), Arc::clone(&feed), events_tx);
        monitor.start().await.unwrap();

        feed.emit("BTCUSDT", 100.5).await;
        settle().await;

        assert!(store.fills().is_empty());
    }

    #[tokio::test]
    async fn two_rapid_satisfying_ticks_fill_exactly_once() {
        let user = ObjectId::new();
        let o = order(user, "BTCUSDT", Direction::Long, OrderType::Limit, 100.0, None);

        let store = MemStore::new(vec![o]);
        let feed = MemFeed::new();
        let (events_tx, _rx) = broadcast::channel(16);

        let monitor = OrderMonitor::new(user, Arc::clone(&store), Arc::clone(&feed), events_tx);
        monitor.start().await.unwrap();

        feed.emit("BTCUSDT", 100.0).await;
        feed.emit("BTCUSDT", 99.0).await;
        settle().await;

        assert_eq!(store.fills().len(), 1);
    }

    #[tokio::test]
    async fn no_checks_after_stop() {
        let user = ObjectId::new();
        let o = order(user, "BTCUSDT", Direction::Long, OrderType::Limit, 100.0, None);

        let store = MemStore::new(vec![o]);
        let feed = MemFeed::new();
        let (events_tx, _rx) = broadcast::channel(16);

        let monitor = OrderMonitor::new(user, Arc::clone(&store), Arc::clone(&feed), events_tx);
        monitor.start().await.unwrap();
        monitor.stop().await;

        // feed keeps emitting for the previously subscribed symbol
        feed.emit("BTCUSDT", 50.0).await;
        settle().await;

        assert!(store.fills().is_empty());
    }

    #[tokio::test]
    async fn start_is_idempotent_for_same_user() {
        let user = ObjectId::new();
        let o = order(user, "BTCUSDT", Direction::Long, OrderType::Limit, 100.0, None);

        let store = MemStore::new(vec![o]);
        let feed = MemFeed::new();
        let (events_tx, _rx) = broadcast::channel(16);

        let monitor = OrderMonitor::new(user, Arc::clone(&store), Arc::clone(&feed), events_tx);
        monitor.start().await.unwrap();
        monitor.start().await.unwrap();

        assert_eq!(monitor.subscription_count().await, 1);

        feed.emit("BTCUSDT", 100.0).await;
        settle().await;

        assert_eq!(store.fills().len(), 1);
    }

    #[tokio::test]
    async fn refresh_subscribes_newly_seen_symbols() {
        let user = ObjectId::new();
        let btc = order(user, "BTCUSDT", Direction::Long, OrderType::Limit, 100.0, None);

        let store = MemStore::new(vec![btc]);
        let feed = MemFeed::new();
        let (events_tx, _rx) = broadcast::channel(16);

        let monitor = OrderMonitor::new(user, Arc::clone(&store), Arc::clone(&feed), events_tx);
        monitor.start().await.unwrap();

        let eth = order(user, "ETHUSDT", Direction::Short, OrderType::Limit, 2000.0, None);
        let eth_id = eth.id;
        store.add_order(eth);

        monitor.refresh().await.unwrap();
        assert_eq!(monitor.subscription_count().await, 2);

        feed.emit("ETHUSDT", 2100.0).await;
        settle().await;

        assert_eq!(store.fills(), vec![(eth_id, 2100.0)]);
    }

    #[tokio::test]
    async fn fill_at_better_price_refunds_the_difference() {
        let user = ObjectId::new();
        let o = order(user, "BTCUSDT", Direction::Long, OrderType::Limit, 100.0, None);
        let reserved = o.reserved_cost;

        let store = MemStore::new(vec![o.clone()]);
        let feed = MemFeed::new();
        let (events_tx, _rx) = broadcast::channel(16);

        let monitor = OrderMonitor::new(user, Arc::clone(&store), Arc::clone(&feed), events_tx);
        monitor.start().await.unwrap();

        feed.emit("BTCUSDT", 95.0).await;
        settle().await;

        // reserved at 100: 100/10 + 100*fee; executed at 95: 95/10 + 95*fee
        let expected = reserved - (95.0 / 10.0 + 95.0 * FEE_RATE);
        assert!((store.cash() - expected).abs() < 1e-9);
        assert!(store.cash() > 0.0);
    }

    #[tokio::test]
    async fn already_filled_orders_are_skipped_quietly() {
        let user = ObjectId::new();
        let o = order(user, "BTCUSDT", Direction::Long, OrderType::Limit, 100.0, None);

        let store = MemStore::new(vec![o.clone()]);
        let feed = MemFeed::new();
        let (events_tx, _rx) = broadcast::channel(16);

        let monitor = OrderMonitor::new(user, Arc::clone(&store), Arc::clone(&feed), events_tx);
        monitor.start().await.unwrap();

        // another path (a second device in the original app) fills it first
        store.pending.lock().unwrap().clear();

        feed.emit("BTCUSDT", 100.0).await;
        settle().await;

        assert!(store.fills().is_empty());
    }
}
