use crate::models::{BracketOrder, Side};
use thiserror::Error;

pub const DEFAULT_RISK_PCT: f64 = 0.01;
pub const DEFAULT_REWARD_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Error, PartialEq)]
pub enum SizingError {
    #[error("executed price must be positive, got {0}")]
    InvalidPrice(f64),
}

/// Risk parameters for bracket computation
#[derive(Debug, Clone, Copy)]
pub struct SizerParams {
    /// Risked fraction of the entry price (stop distance)
    pub risk_pct: f64,
    /// Reward distance as a multiple of the risk distance
    pub reward_multiplier: f64,
}

impl Default for SizerParams {
    fn default() -> Self {
        Self {
            risk_pct: DEFAULT_RISK_PCT,
            reward_multiplier: DEFAULT_REWARD_MULTIPLIER,
        }
    }
}

/// Compute order quantity and protective price levels for one decision.
///
/// Quantity is the leveraged notional divided by the executed price. The
/// stop sits `risk_pct` away from entry and the target `risk_pct *
/// reward_multiplier` away on the other side, an asymmetric 2:3
/// risk:reward at the defaults. Price levels are advisory; submission is
/// the venue's concern.
pub fn compute_bracket(
    usdt_budget: f64,
    leverage: f64,
    side: Side,
    executed_price: f64,
    params: &SizerParams,
) -> Result<BracketOrder, SizingError> {
    if executed_price <= 0.0 {
        return Err(SizingError::InvalidPrice(executed_price));
    }

    let leveraged_notional = usdt_budget * leverage;
    let quantity = leveraged_notional / executed_price;

    let risk_amount = executed_price * params.risk_pct;
    let reward_amount = risk_amount * params.reward_multiplier;

    let (stop_loss, take_profit) = match side {
        Side::Long => (executed_price - risk_amount, executed_price + reward_amount),
        Side::Short => (executed_price + risk_amount, executed_price - reward_amount),
    };

    Ok(BracketOrder {
        entry_price: executed_price,
        quantity,
        stop_loss,
        take_profit,
    })
}
