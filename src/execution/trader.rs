use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::api::ExecutionVenue;
use crate::execution::sizer::{compute_bracket, SizerParams};
use crate::models::{ExecutionReport, OrderRequest, Side};
use crate::Result;

/// Turns an actionable decision into a bracketed market order on the
/// execution venue.
pub struct Trader<E: ExecutionVenue> {
    venue: Arc<E>,
    usdt_budget: f64,
    leverage: u32,
    params: SizerParams,
    /// Symbols whose leverage has already been configured this run
    leverage_configured: Mutex<HashSet<String>>,
}

impl<E: ExecutionVenue> Trader<E> {
    pub fn new(venue: Arc<E>, usdt_budget: f64, leverage: u32, params: SizerParams) -> Self {
        Self {
            venue,
            usdt_budget,
            leverage,
            params,
            leverage_configured: Mutex::new(HashSet::new()),
        }
    }

    /// Size from the current price, submit the market entry, then place the
    /// protective stop/target from the actual fill price (falling back to
    /// the current price when the venue reports no fill price).
    pub async fn execute_decision(
        &self,
        symbol: &str,
        side: Side,
        current_price: f64,
    ) -> Result<ExecutionReport> {
        self.configure_leverage(symbol).await?;

        let sized = compute_bracket(
            self.usdt_budget,
            self.leverage as f64,
            side,
            current_price,
            &self.params,
        )?;

        let mut order = OrderRequest {
            symbol: symbol.to_string(),
            side,
            quantity: sized.quantity,
            stop_loss: sized.stop_loss,
            take_profit: sized.take_profit,
        };

        let report = self.venue.place_market_entry(&order).await?;
        tracing::info!(
            symbol,
            side = side.entry_order_side(),
            quantity = order.quantity,
            order_id = report.order_id,
            "executed market entry"
        );

        // Re-anchor the protective levels on the actual fill
        let executed_price = if report.avg_price > 0.0 {
            report.avg_price
        } else {
            current_price
        };
        if executed_price != current_price {
            let refit = compute_bracket(
                self.usdt_budget,
                self.leverage as f64,
                side,
                executed_price,
                &self.params,
            )?;
            order.stop_loss = refit.stop_loss;
            order.take_profit = refit.take_profit;
        }

        if self.venue.supports_bracket_orders() {
            self.venue.place_bracket(&order).await?;
            tracing::info!(
                symbol,
                stop_loss = order.stop_loss,
                take_profit = order.take_profit,
                "placed protective bracket"
            );
        } else {
            tracing::warn!(
                symbol,
                "venue does not support bracket orders, entry is unprotected"
            );
        }

        Ok(report)
    }

    async fn configure_leverage(&self, symbol: &str) -> Result<()> {
        if !self.venue.supports_leverage() {
            return Ok(());
        }
        {
            let configured = self
                .leverage_configured
                .lock()
                .map_err(|_| "leverage state lock poisoned")?;
            if configured.contains(symbol) {
                return Ok(());
            }
        }

        self.venue.set_leverage(symbol, self.leverage).await?;
        tracing::debug!(symbol, leverage = self.leverage, "configured leverage");

        self.leverage_configured
            .lock()
            .map_err(|_| "leverage state lock poisoned")?
            .insert(symbol.to_string());
        Ok(())
    }
}
