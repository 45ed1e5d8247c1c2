use reqwest::Client;
use serde::{Deserialize, Serialize};

/// REST quote client against a Binance-style market data API.
#[derive(Clone)]
pub struct MarketDataClient {
    http: Client,
    base_url: String,
}

impl MarketDataClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Latest traded price for a symbol. A missing or non-positive price is an
    /// error here, never a zero: callers on the trading path must not treat a
    /// dead feed as "price 0".
    pub async fn price(&self, symbol: &str) -> Result<f64, String> {
        let url = format!("{}/ticker/price", self.base_url);
        let res = self
            .http
            .get(url)
            .query(&[("symbol", symbol)])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("price request failed: {status} {body}"));
        }

        let ticker = res
            .json::<PriceTicker>()
            .await
            .map_err(|e| e.to_string())?;

        let price: f64 = ticker.price.parse().map_err(|_| {
            format!("unparseable price for {symbol}: {}", ticker.price)
        })?;

        if !price.is_finite() || price <= 0.0 {
            return Err(format!("invalid price for {symbol}: {price}"));
        }

        Ok(price)
    }

    /// 24h rolling stats for the market screen.
    pub async fn ticker_24h(&self, symbol: &str) -> Result<Ticker24h, String> {
        let url = format!("{}/ticker/24hr", self.base_url);
        let res = self
            .http
            .get(url)
            .query(&[("symbol", symbol)])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("ticker request failed: {status} {body}"));
        }

        res.json::<Ticker24h>().await.map_err(|e| e.to_string())
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct PriceTicker {
    symbol: String,
    price: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24h {
    pub symbol: String,

    pub last_price: String,
    pub price_change_percent: String,

    pub high_price: String,
    pub low_price: String,

    pub volume: String,
    pub quote_volume: String,
}
