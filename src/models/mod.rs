use serde::{Deserialize, Serialize};

/// A single aggregated trade, normalized at the exchange-client boundary.
///
/// The core never sees the exchange's short field names (`a`, `p`, `q`);
/// whatever variant the wire uses is mapped into this shape before it
/// reaches the profile builder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggTrade {
    pub price: f64,
    pub quantity: f64,
    pub agg_id: u64,
    /// Trade time in epoch milliseconds
    pub timestamp: i64,
}

/// Direction of a position
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Order side string for the entry order
    pub fn entry_order_side(&self) -> &'static str {
        match self {
            Side::Long => "BUY",
            Side::Short => "SELL",
        }
    }

    /// Order side string for the protective exit orders (opposite of entry)
    pub fn exit_order_side(&self) -> &'static str {
        match self {
            Side::Long => "SELL",
            Side::Short => "BUY",
        }
    }
}

/// What the signal engine decided for a symbol
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DecisionAction {
    Long,
    Short,
    None,
}

/// Stateless decision output, consumed immediately by the execution step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub action: DecisionAction,
    pub reason: String,
}

impl Decision {
    pub fn none(reason: &str) -> Self {
        Self {
            action: DecisionAction::None,
            reason: reason.to_string(),
        }
    }

    /// The position side for an actionable decision, None otherwise
    pub fn side(&self) -> Option<Side> {
        match self.action {
            DecisionAction::Long => Some(Side::Long),
            DecisionAction::Short => Some(Side::Short),
            DecisionAction::None => None,
        }
    }
}

/// Entry price plus protective exit levels, computed once per executed decision
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BracketOrder {
    pub entry_price: f64,
    pub quantity: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

/// The shape handed to the execution venue. Entry type is always MARKET.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

/// What the venue reports back after an entry submission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionReport {
    pub order_id: u64,
    /// Average fill price; 0.0 when the venue did not report a fill price
    pub avg_price: f64,
    pub executed_qty: f64,
}
