use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::api::{ExecutionVenue, MarketData};
use crate::config::Config;
use crate::execution::{SizerParams, Trader};
use crate::profile::compute_volume_profile;
use crate::strategy::decide;
use crate::Result;

/// Drives the per-symbol polling loop.
///
/// Every tick runs the full pipeline for all configured symbols
/// concurrently: fetch the open window's trades, build the profile, and
/// inside the pre-close grace window evaluate and execute the decision.
/// Symbols share no mutable state; one symbol's failure is logged and
/// skipped without touching the others.
pub struct Scheduler<C: MarketData + ExecutionVenue> {
    exchange: Arc<C>,
    trader: Trader<C>,
    config: Config,
    /// symbol -> open_time of the interval whose decision was already
    /// executed. At most one order per symbol per interval; NONE
    /// decisions do not consume the interval.
    executed_intervals: HashMap<String, i64>,
}

impl<C: MarketData + ExecutionVenue> Scheduler<C> {
    pub fn new(exchange: Arc<C>, config: Config) -> Self {
        let params = SizerParams {
            risk_pct: config.risk_pct,
            reward_multiplier: config.reward_multiplier,
        };
        let trader = Trader::new(
            exchange.clone(),
            config.usdt_budget,
            config.leverage,
            params,
        );
        Self {
            exchange,
            trader,
            config,
            executed_intervals: HashMap::new(),
        }
    }

    /// Run forever on a fixed wall-clock period. A tick is awaited to
    /// completion before the next one fires, so a slow tick delays rather
    /// than overlaps.
    pub async fn run(mut self) {
        let mut ticker = interval(Duration::from_millis(self.config.poll_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            symbols = ?self.config.symbols,
            poll_interval_ms = self.config.poll_interval_ms,
            "scheduler started"
        );

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// Process every configured symbol concurrently, then record which
    /// intervals were traded.
    pub async fn tick(&mut self) {
        let tasks = self.config.symbols.iter().map(|symbol| {
            let already_executed = self.executed_intervals.get(symbol).copied();
            self.process_symbol(symbol, already_executed)
        });
        let outcomes = futures::future::join_all(tasks).await;

        for (symbol, open_time) in outcomes.into_iter().flatten() {
            self.executed_intervals.insert(symbol, open_time);
        }
    }

    /// Failure boundary: any error in one symbol's pipeline is logged and
    /// turns into a skipped tick for that symbol only. Retry happens
    /// implicitly on the next tick.
    async fn process_symbol(
        &self,
        symbol: &str,
        already_executed: Option<i64>,
    ) -> Option<(String, i64)> {
        match self.analyze_and_maybe_trade(symbol, already_executed).await {
            Ok(traded_open_time) => traded_open_time.map(|t| (symbol.to_string(), t)),
            Err(e) => {
                tracing::error!(symbol, error = %e, "symbol processing failed, skipping tick");
                None
            }
        }
    }

    /// The per-symbol pipeline. Returns the open time of the interval
    /// when an order was executed for it.
    async fn analyze_and_maybe_trade(
        &self,
        symbol: &str,
        already_executed: Option<i64>,
    ) -> Result<Option<i64>> {
        let windows = self
            .exchange
            .recent_windows(symbol, &self.config.interval, 2)
            .await?;
        // The latest kline is the still-open interval
        let window = windows.last().ok_or("exchange returned no klines")?;

        let now = Utc::now().timestamp_millis();
        let trades = match window.trade_fetch_range(now, self.config.grace_secs) {
            Some((start, end)) => self.exchange.agg_trades(symbol, start, end).await?,
            None => Vec::new(),
        };

        let profile = compute_volume_profile(
            &trades,
            self.config.price_bins,
            self.config.fva_target_pct,
        );

        tracing::debug!(
            symbol,
            time_left = window.time_left_seconds(now),
            trades = trades.len(),
            total_volume = profile.total_volume,
            "analyzed open window"
        );

        if !window.in_grace_window(now, self.config.grace_secs) {
            return Ok(None);
        }

        let current_price = self.exchange.latest_price(symbol).await?;
        let decision = decide(
            profile.poc,
            &profile.fva,
            profile.dispersion,
            Some(current_price),
        );
        tracing::info!(
            symbol,
            action = ?decision.action,
            reason = %decision.reason,
            "decision"
        );

        let Some(side) = decision.side() else {
            return Ok(None);
        };

        if already_executed == Some(window.open_time) {
            tracing::debug!(symbol, "interval already traded, suppressing duplicate order");
            return Ok(None);
        }

        self.trader
            .execute_decision(symbol, side, current_price)
            .await?;
        Ok(Some(window.open_time))
    }
}
