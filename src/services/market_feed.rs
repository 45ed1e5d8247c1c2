use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as TMessage};
use tracing::{debug, warn};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const TICK_CHANNEL_CAPACITY: usize = 64;

/// A single live price observation. Consumed immediately, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTick {
    pub symbol: String,
    pub price: f64,
}

/// Push source of live prices, treated as a black box by consumers.
/// Dropping the receiver unsubscribes.
pub trait PriceFeed: Send + Sync + 'static {
    fn subscribe(&self, symbol: &str) -> mpsc::Receiver<PriceTick>;
}

/// Live feed over Binance-style `<symbol>@trade` WebSocket streams.
///
/// Each subscription runs its own pump task with a dedicated upstream
/// connection, so ticks for a given symbol arrive in stream order. The pump
/// reconnects on disconnect and exits once the subscriber side is gone.
#[derive(Clone)]
pub struct BinanceFeed {
    ws_base: String,
}

impl BinanceFeed {
    pub fn new(ws_base: String) -> Self {
        Self { ws_base }
    }
}

impl PriceFeed for BinanceFeed {
    fn subscribe(&self, symbol: &str) -> mpsc::Receiver<PriceTick> {
        let (tx, rx) = mpsc::channel(TICK_CHANNEL_CAPACITY);
        let url = format!("{}/ws/{}@trade", self.ws_base, symbol.to_lowercase());
        tokio::spawn(pump_symbol(url, symbol.to_uppercase(), tx));
        rx
    }
}

async fn pump_symbol(url: String, symbol: String, tx: mpsc::Sender<PriceTick>) {
    loop {
        if tx.is_closed() {
            return;
        }

        let (ws, _) = match connect_async(url.as_str()).await {
            Ok(x) => x,
            Err(err) => {
                warn!("feed connect failed for {symbol}: {err}");
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };

        debug!("feed connected for {symbol}");

        let (mut write, mut read) = ws.split();

        while let Some(msg) = read.next().await {
            match msg {
                Ok(TMessage::Text(txt)) => {
                    if let Some(tick) = parse_trade_frame(&txt) {
                        if tx.send(tick).await.is_err() {
                            // subscriber went away
                            return;
                        }
                    }
                }
                Ok(TMessage::Ping(payload)) => {
                    let _ = write.send(TMessage::Pong(payload)).await;
                }
                Ok(TMessage::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }

        warn!("feed disconnected for {symbol}, reconnecting");
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

// Binance trade event: {"e":"trade","s":"BTCUSDT","p":"43500.10",...}
#[derive(Deserialize)]
struct TradeFrame {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "p")]
    price: String,
}

fn parse_trade_frame(txt: &str) -> Option<PriceTick> {
    let frame: TradeFrame = serde_json::from_str(txt).ok()?;
    let price: f64 = frame.price.parse().ok()?;

    if !price.is_finite() || price <= 0.0 {
        return None;
    }

    Some(PriceTick {
        symbol: frame.symbol,
        price,
    })
}
