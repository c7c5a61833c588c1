//! Candle (OHLCV bar) representation.

/// Minimum number of candles a calling program should require before
/// starting a run. Shorter histories are rejected at the CLI boundary;
/// the engine itself only refuses an empty sequence.
pub const MIN_CANDLES: usize = 100;

/// One fixed-duration bucket of market activity. `open_time` is the start
/// of the bar in milliseconds since the Unix epoch, strictly increasing
/// across a sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Extract the closing-price series in bar order.
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}
