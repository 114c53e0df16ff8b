/// The currently open candle interval for one symbol.
///
/// Recomputed every tick from the exchange's kline data; nothing here is
/// cached across ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleWindow {
    pub symbol: String,
    pub interval: String,
    /// Interval open, epoch milliseconds
    pub open_time: i64,
    /// Interval close, epoch milliseconds
    pub close_time: i64,
}

impl CandleWindow {
    /// Time range for trade retrieval: `[open_time, min(now, close - grace))`.
    ///
    /// Returns None when the range is empty or inverted, in which case the
    /// profile is built over an empty trade set.
    pub fn trade_fetch_range(&self, now_ms: i64, grace_secs: i64) -> Option<(i64, i64)> {
        let end = now_ms.min(self.close_time - grace_secs * 1000);
        if end > self.open_time {
            Some((self.open_time, end))
        } else {
            None
        }
    }

    /// Whole seconds remaining until the interval closes, floored at zero
    pub fn time_left_seconds(&self, now_ms: i64) -> i64 {
        ((self.close_time - now_ms) / 1000).max(0)
    }

    /// Whether a decision may be acted on right now. This is a bounded,
    /// recurring window near the close: the orchestrator can re-enter it
    /// on every tick until the interval rolls over.
    pub fn in_grace_window(&self, now_ms: i64, grace_secs: i64) -> bool {
        self.time_left_seconds(now_ms) <= grace_secs
    }
}
