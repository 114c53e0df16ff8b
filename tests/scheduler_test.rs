use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use profilebot::api::{ExecutionVenue, MarketData};
use profilebot::config::Config;
use profilebot::models::{AggTrade, ExecutionReport, OrderRequest, Side};
use profilebot::scheduler::Scheduler;
use profilebot::window::CandleWindow;
use profilebot::Result;

/// Exchange double: serves canned windows/trades/prices and records every
/// order it receives.
struct MockExchange {
    windows: HashMap<String, CandleWindow>,
    trades: Vec<AggTrade>,
    price: f64,
    fail_symbols: HashSet<String>,
    entries: Mutex<Vec<OrderRequest>>,
    brackets: Mutex<Vec<OrderRequest>>,
}

impl MockExchange {
    fn new(price: f64) -> Self {
        Self {
            windows: HashMap::new(),
            trades: Vec::new(),
            price,
            fail_symbols: HashSet::new(),
            entries: Mutex::new(Vec::new()),
            brackets: Mutex::new(Vec::new()),
        }
    }

    /// Register a window for a symbol, anchored to the current clock:
    /// the interval closes `closes_in_ms` from now.
    fn with_window(mut self, symbol: &str, closes_in_ms: i64) -> Self {
        let now = Utc::now().timestamp_millis();
        self.windows.insert(
            symbol.to_string(),
            CandleWindow {
                symbol: symbol.to_string(),
                interval: "1h".to_string(),
                open_time: now + closes_in_ms - 3_600_000,
                close_time: now + closes_in_ms,
            },
        );
        self
    }

    fn with_trades(mut self, trades: Vec<AggTrade>) -> Self {
        self.trades = trades;
        self
    }

    fn failing_for(mut self, symbol: &str) -> Self {
        self.fail_symbols.insert(symbol.to_string());
        self
    }

    fn entry_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl MarketData for MockExchange {
    async fn recent_windows(
        &self,
        symbol: &str,
        _interval: &str,
        _limit: usize,
    ) -> Result<Vec<CandleWindow>> {
        if self.fail_symbols.contains(symbol) {
            return Err("simulated network error".into());
        }
        Ok(vec![self.windows.get(symbol).cloned().ok_or("no window")?])
    }

    async fn agg_trades(
        &self,
        _symbol: &str,
        _start_time: i64,
        _end_time: i64,
    ) -> Result<Vec<AggTrade>> {
        Ok(self.trades.clone())
    }

    async fn latest_price(&self, _symbol: &str) -> Result<f64> {
        Ok(self.price)
    }
}

#[async_trait]
impl ExecutionVenue for MockExchange {
    fn supports_leverage(&self) -> bool {
        true
    }

    fn supports_bracket_orders(&self) -> bool {
        true
    }

    async fn set_leverage(&self, _symbol: &str, _leverage: u32) -> Result<()> {
        Ok(())
    }

    async fn place_market_entry(&self, order: &OrderRequest) -> Result<ExecutionReport> {
        self.entries.lock().unwrap().push(order.clone());
        Ok(ExecutionReport {
            order_id: 1,
            avg_price: self.price,
            executed_qty: order.quantity,
        })
    }

    async fn place_bracket(&self, order: &OrderRequest) -> Result<()> {
        self.brackets.lock().unwrap().push(order.clone());
        Ok(())
    }
}

fn test_config(symbols: &[&str]) -> Config {
    Config {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        price_bins: 5,
        usdt_budget: 100.0,
        leverage: 10,
        ..Config::default()
    }
}

/// Trades whose profile has POC 102.0 and FVA [100.0, 102.4]
fn scenario_trades() -> Vec<AggTrade> {
    [(100.0, 1.0), (101.0, 1.0), (102.0, 5.0), (103.0, 1.0), (104.0, 1.0)]
        .iter()
        .enumerate()
        .map(|(i, &(price, quantity))| AggTrade {
            price,
            quantity,
            agg_id: i as u64,
            timestamp: 0,
        })
        .collect()
}

#[tokio::test]
async fn test_no_order_outside_grace_window() {
    // Two minutes left in the interval: analysis runs, execution may not
    let exchange = Arc::new(
        MockExchange::new(104.0)
            .with_window("BTCUSDT", 120_000)
            .with_trades(scenario_trades()),
    );
    let mut scheduler = Scheduler::new(exchange.clone(), test_config(&["BTCUSDT"]));

    scheduler.tick().await;

    assert_eq!(exchange.entry_count(), 0);
    assert!(exchange.brackets.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_short_executed_inside_grace_window() {
    // 3s left (inside the 5s grace), price 104 above the buffered FVA
    // high of 102.4 * 1.0025
    let exchange = Arc::new(
        MockExchange::new(104.0)
            .with_window("BTCUSDT", 3_000)
            .with_trades(scenario_trades()),
    );
    let mut scheduler = Scheduler::new(exchange.clone(), test_config(&["BTCUSDT"]));

    scheduler.tick().await;

    let entries = exchange.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].symbol, "BTCUSDT");
    assert_eq!(entries[0].side, Side::Short);
    // 100 USDT * 10x at 104
    assert!((entries[0].quantity - 1000.0 / 104.0).abs() < 1e-9);

    let brackets = exchange.brackets.lock().unwrap();
    assert_eq!(brackets.len(), 1);
    assert!((brackets[0].stop_loss - 105.04).abs() < 1e-9);
    assert!((brackets[0].take_profit - 102.44).abs() < 1e-9);
}

#[tokio::test]
async fn test_duplicate_order_suppressed_within_interval() {
    let exchange = Arc::new(
        MockExchange::new(104.0)
            .with_window("BTCUSDT", 4_000)
            .with_trades(scenario_trades()),
    );
    let mut scheduler = Scheduler::new(exchange.clone(), test_config(&["BTCUSDT"]));

    // The grace window recurs every tick until rollover; only the first
    // actionable decision may trade the interval
    scheduler.tick().await;
    scheduler.tick().await;
    scheduler.tick().await;

    assert_eq!(exchange.entry_count(), 1);
    assert_eq!(exchange.brackets.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_failing_symbol_does_not_block_others() {
    let exchange = Arc::new(
        MockExchange::new(104.0)
            .with_window("ETHUSDT", 3_000)
            .with_trades(scenario_trades())
            .failing_for("BTCUSDT"),
    );
    let mut scheduler = Scheduler::new(exchange.clone(), test_config(&["BTCUSDT", "ETHUSDT"]));

    scheduler.tick().await;

    let entries = exchange.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].symbol, "ETHUSDT");
}

#[tokio::test]
async fn test_empty_trade_set_yields_no_order() {
    // In the grace window but no trades: degenerate profile, NONE decision
    let exchange = Arc::new(MockExchange::new(104.0).with_window("BTCUSDT", 3_000));
    let mut scheduler = Scheduler::new(exchange.clone(), test_config(&["BTCUSDT"]));

    scheduler.tick().await;

    assert_eq!(exchange.entry_count(), 0);
}

#[tokio::test]
async fn test_price_inside_fva_follows_momentum() {
    // Price 101.0 is inside FVA [100, 102.4] and below POC 102.0: SHORT
    let exchange = Arc::new(
        MockExchange::new(101.0)
            .with_window("BTCUSDT", 3_000)
            .with_trades(scenario_trades()),
    );
    let mut scheduler = Scheduler::new(exchange.clone(), test_config(&["BTCUSDT"]));

    scheduler.tick().await;

    let entries = exchange.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].side, Side::Short);
}
