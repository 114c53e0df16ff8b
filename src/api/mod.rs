// Exchange collaborators
pub mod binance;

pub use binance::BinanceFuturesClient;

use crate::models::{AggTrade, ExecutionReport, OrderRequest};
use crate::window::CandleWindow;
use crate::Result;
use async_trait::async_trait;

/// Market-data collaborator consumed by the core pipeline
#[async_trait]
pub trait MarketData: Send + Sync {
    /// The `limit` most recent candle windows, oldest first. The core
    /// takes the last entry as the currently open interval.
    async fn recent_windows(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<CandleWindow>>;

    /// All aggregated trades in `[start_time, end_time]`, in non-decreasing
    /// time order. Pagination is internal: no duplicates, no gaps across
    /// page boundaries.
    async fn agg_trades(&self, symbol: &str, start_time: i64, end_time: i64)
        -> Result<Vec<AggTrade>>;

    async fn latest_price(&self, symbol: &str) -> Result<f64>;
}

/// Execution collaborator. One interface with capability flags instead of
/// per-venue client variants; the core queries capabilities rather than
/// depending on a specific venue.
#[async_trait]
pub trait ExecutionVenue: Send + Sync {
    fn supports_leverage(&self) -> bool;

    fn supports_bracket_orders(&self) -> bool;

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<()>;

    /// Submit the market entry; protective levels in the request are not
    /// placed here.
    async fn place_market_entry(&self, order: &OrderRequest) -> Result<ExecutionReport>;

    /// Place the protective stop and target for an already-filled entry
    async fn place_bracket(&self, order: &OrderRequest) -> Result<()>;
}
