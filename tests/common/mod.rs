#![allow(dead_code)]

pub use orobt::domain::backtest::{run_backtest, BacktestResult, ExitMode, RunParams};
pub use orobt::domain::candle::Candle;

pub fn ts(i: usize) -> i64 {
    1_700_000_000_000 + i as i64 * 300_000
}

pub fn make_candle(i: usize, close: f64) -> Candle {
    Candle {
        open_time: ts(i),
        open: close,
        high: close,
        low: close,
        close,
        volume: 1_000.0,
    }
}

pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_candle(i, c))
        .collect()
}

/// Short windows so a handful of bars can produce a cross.
pub fn short_window_params() -> RunParams {
    RunParams {
        fast_window: 2,
        slow_window: 3,
        ..RunParams::default()
    }
}

/// A flat run-up at `base` long enough for the default 20/50 windows,
/// followed by a single upward cross at `cross_bar` with close
/// `entry_px`, then the given tail. Exactly one entry signal fires.
pub fn single_cross_series(base: f64, cross_bar: usize, entry_px: f64, tail: &[f64]) -> Vec<f64> {
    let mut closes = vec![base; cross_bar];
    closes.push(entry_px);
    closes.extend_from_slice(tail);
    closes
}

/// Render a candle slice as a `{SYMBOL}_{TIMEFRAME}.csv` file body.
pub fn candles_to_csv(candles: &[Candle]) -> String {
    let mut out = String::from("open_time,open,high,low,close,volume\n");
    for c in candles {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            c.open_time, c.open, c.high, c.low, c.close, c.volume
        ));
    }
    out
}
