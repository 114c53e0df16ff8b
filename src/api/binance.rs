use std::num::NonZeroU32;
use std::sync::Arc;

use chrono::Utc;
use governor::{Quota, RateLimiter};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;

use crate::api::{ExecutionVenue, MarketData};
use crate::models::{AggTrade, ExecutionReport, OrderRequest};
use crate::window::CandleWindow;
use crate::Result;
use async_trait::async_trait;

const MAINNET_API_BASE: &str = "https://fapi.binance.com";
const TESTNET_API_BASE: &str = "https://testnet.binancefuture.com";
const AGG_TRADES_PAGE_LIMIT: usize = 1000;
const RATE_LIMIT_RPM: u32 = 1200; // request-weight budget per minute
const MAX_RETRIES: u32 = 3;

type HmacSha256 = Hmac<Sha256>;

// Type alias for the rate limiter to simplify signatures
type BinanceRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Client for the Binance USDⓈ-M futures REST API.
///
/// Implements both collaborator roles: unauthenticated market data and
/// HMAC-signed order submission. Cloneable; clones share the rate limiter.
#[derive(Clone)]
pub struct BinanceFuturesClient {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    rate_limiter: Arc<BinanceRateLimiter>,
}

// ============== Response Types ==============

/// Aggregated trade as the wire sends it. Older endpoints spell the
/// cursor `aggId` and the price `price`; aliases normalize both variants
/// here so the core only ever sees `AggTrade`.
#[derive(Debug, Deserialize)]
struct RawAggTrade {
    #[serde(rename = "a", alias = "aggId")]
    agg_id: u64,
    #[serde(rename = "p", alias = "price")]
    price: String,
    #[serde(rename = "q", alias = "qty")]
    quantity: String,
    #[serde(rename = "T", default)]
    timestamp: i64,
}

impl RawAggTrade {
    fn normalize(self) -> Result<AggTrade> {
        Ok(AggTrade {
            price: self.price.parse()?,
            quantity: self.quantity.parse()?,
            agg_id: self.agg_id,
            timestamp: self.timestamp,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawTickerPrice {
    price: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrderAck {
    order_id: u64,
    #[serde(default)]
    avg_price: Option<String>,
    #[serde(default)]
    executed_qty: Option<String>,
}

// ============== Implementation ==============

impl BinanceFuturesClient {
    pub fn new(api_key: String, api_secret: String, use_testnet: bool) -> Self {
        let base = if use_testnet {
            TESTNET_API_BASE
        } else {
            MAINNET_API_BASE
        };
        Self::with_base_url(api_key, api_secret, base.to_string())
    }

    /// Point the client at an arbitrary base URL (mock servers in tests)
    pub fn with_base_url(api_key: String, api_secret: String, base_url: String) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(RATE_LIMIT_RPM).unwrap());
        Self {
            client: Client::new(),
            base_url,
            api_key,
            api_secret,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Make a rate-limited GET with bounded retry on 429/5xx
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        for attempt in 1..=MAX_RETRIES {
            self.rate_limiter.until_ready().await;

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response.json().await?);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let backoff_secs = 2u64.pow(attempt);
                        tracing::warn!(
                            "Binance returned {}, backing off for {}s (attempt {}/{})",
                            status,
                            backoff_secs,
                            attempt,
                            MAX_RETRIES
                        );
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        continue;
                    }

                    // Other 4xx: not retryable
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "unknown error".to_string());
                    return Err(format!("Binance API error ({}): {}", status, body).into());
                }
                Err(e) if attempt < MAX_RETRIES => {
                    let backoff_secs = 2u64.pow(attempt);
                    tracing::warn!(
                        "Network error: {}, retrying in {}s (attempt {}/{})",
                        e,
                        backoff_secs,
                        attempt,
                        MAX_RETRIES
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(format!("Binance request failed after {} retries", MAX_RETRIES).into())
    }

    fn sign(&self, query: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Signed POST. Appends timestamp and signature to the query string.
    async fn post_signed(&self, path: &str, params: &[(&str, String)]) -> Result<reqwest::Response> {
        let mut query: String = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        query.push_str(&format!("&timestamp={}", Utc::now().timestamp_millis()));
        let signature = self.sign(&query)?;
        let url = format!("{}{}?{}&signature={}", self.base_url, path, query, signature);

        self.rate_limiter.until_ready().await;
        let response = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(format!("Binance order API error ({}): {}", status, body).into());
        }

        Ok(response)
    }
}

#[async_trait]
impl MarketData for BinanceFuturesClient {
    async fn recent_windows(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<CandleWindow>> {
        let url = format!(
            "{}/fapi/v1/klines?symbol={}&interval={}&limit={}",
            self.base_url, symbol, interval, limit
        );

        // Klines come back as heterogeneous arrays: open time is field 0,
        // close time is field 6.
        let raw: Vec<Vec<serde_json::Value>> = self.get_json(&url).await?;

        let mut windows = Vec::with_capacity(raw.len());
        for kline in raw {
            let open_time = kline
                .first()
                .and_then(|v| v.as_i64())
                .ok_or("kline missing open time")?;
            let close_time = kline
                .get(6)
                .and_then(|v| v.as_i64())
                .ok_or("kline missing close time")?;
            windows.push(CandleWindow {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
                open_time,
                close_time,
            });
        }

        Ok(windows)
    }

    async fn agg_trades(
        &self,
        symbol: &str,
        start_time: i64,
        end_time: i64,
    ) -> Result<Vec<AggTrade>> {
        let mut trades = Vec::new();
        let mut from_id: Option<u64> = None;

        loop {
            let mut url = format!(
                "{}/fapi/v1/aggTrades?symbol={}&startTime={}&endTime={}&limit={}",
                self.base_url, symbol, start_time, end_time, AGG_TRADES_PAGE_LIMIT
            );
            if let Some(id) = from_id {
                url.push_str(&format!("&fromId={}", id));
            }

            let page: Vec<RawAggTrade> = self.get_json(&url).await?;
            let Some(last) = page.last() else { break };

            // Cursor for the next page: one past the last id seen, so
            // pages never overlap or skip.
            let next_from = last.agg_id + 1;
            let full_page = page.len() >= AGG_TRADES_PAGE_LIMIT;

            for raw in page {
                trades.push(raw.normalize()?);
            }

            if !full_page {
                break;
            }
            from_id = Some(next_from);
        }

        tracing::debug!(symbol, count = trades.len(), "fetched aggTrades");
        Ok(trades)
    }

    async fn latest_price(&self, symbol: &str) -> Result<f64> {
        let url = format!(
            "{}/fapi/v1/ticker/price?symbol={}",
            self.base_url, symbol
        );
        let ticker: RawTickerPrice = self.get_json(&url).await?;
        Ok(ticker.price.parse()?)
    }
}

#[async_trait]
impl ExecutionVenue for BinanceFuturesClient {
    fn supports_leverage(&self) -> bool {
        true
    }

    fn supports_bracket_orders(&self) -> bool {
        true
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<()> {
        self.post_signed(
            "/fapi/v1/leverage",
            &[
                ("symbol", symbol.to_string()),
                ("leverage", leverage.to_string()),
            ],
        )
        .await?;
        Ok(())
    }

    async fn place_market_entry(&self, order: &OrderRequest) -> Result<ExecutionReport> {
        let response = self
            .post_signed(
                "/fapi/v1/order",
                &[
                    ("symbol", order.symbol.clone()),
                    ("side", order.side.entry_order_side().to_string()),
                    ("type", "MARKET".to_string()),
                    ("quantity", order.quantity.to_string()),
                    ("newOrderRespType", "RESULT".to_string()),
                ],
            )
            .await?;

        let ack: RawOrderAck = response.json().await?;
        Ok(ExecutionReport {
            order_id: ack.order_id,
            avg_price: ack
                .avg_price
                .as_deref()
                .map(str::parse)
                .transpose()?
                .unwrap_or(0.0),
            executed_qty: ack
                .executed_qty
                .as_deref()
                .map(str::parse)
                .transpose()?
                .unwrap_or(0.0),
        })
    }

    /// Two reduce-only triggers on the opposite side: STOP_MARKET at the
    /// stop and TAKE_PROFIT_MARKET at the target. closePosition makes the
    /// venue flatten whatever is open when either trigger fires.
    async fn place_bracket(&self, order: &OrderRequest) -> Result<()> {
        let exit_side = order.side.exit_order_side().to_string();

        self.post_signed(
            "/fapi/v1/order",
            &[
                ("symbol", order.symbol.clone()),
                ("side", exit_side.clone()),
                ("type", "STOP_MARKET".to_string()),
                ("stopPrice", order.stop_loss.to_string()),
                ("closePosition", "true".to_string()),
            ],
        )
        .await?;

        self.post_signed(
            "/fapi/v1/order",
            &[
                ("symbol", order.symbol.clone()),
                ("side", exit_side),
                ("type", "TAKE_PROFIT_MARKET".to_string()),
                ("stopPrice", order.take_profit.to_string()),
                ("closePosition", "true".to_string()),
            ],
        )
        .await?;

        Ok(())
    }
}
