//! Backtest engine: candle replay, exit/entry protocol, finalization.
//!
//! The run is a single-threaded deterministic fold over the candle
//! sequence. Per-bar order is part of the contract: exits for all open
//! positions (insertion order), then entry evaluation, then equity and
//! drawdown bookkeeping.

use super::candle::{self, Candle};
use super::error::OrobtError;
use super::execution::{entry_fee, entry_quantity, fill_pnl, round_step};
use super::metrics::{DrawdownTracker, Kpis};
use super::position::Position;
use super::signal::{ma_cross_signal, Signal};
use super::trade_log::TradeEvent;

/// How exit conditions combine within one bar for one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitMode {
    /// Evaluate TP1, SL and TP2 as independent conditions. On a single
    /// extreme bar a position can take the TP1 partial and then also the
    /// same-bar SL/TP2 full close, which doubles the fee events on that
    /// bar. This is the historical behavior and the default.
    #[default]
    Independent,
    /// At most one exit event per position per bar.
    Exclusive,
}

impl ExitMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "independent" => Some(ExitMode::Independent),
            "exclusive" => Some(ExitMode::Exclusive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExitMode::Independent => "independent",
            ExitMode::Exclusive => "exclusive",
        }
    }
}

/// Immutable parameters for one run. Constructed once at program entry and
/// passed by reference into the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParams {
    pub fast_window: usize,
    pub slow_window: usize,
    pub stop_loss_pct: f64,
    pub take_profit_1_pct: f64,
    pub take_profit_2_pct: f64,
    /// Fraction of the remaining quantity closed at tier 1.
    pub tp1_partial: f64,
    /// Taker fee rate per side, applied on entry and exit notional.
    pub taker_fee: f64,
    pub max_open_positions: usize,
    pub base_notional: f64,
    /// Entry notional is raised to this floor when below it.
    pub min_notional: f64,
    /// Quantities are floored to a multiple of this step.
    pub qty_step: f64,
    pub exit_mode: ExitMode,
}

impl Default for RunParams {
    fn default() -> Self {
        RunParams {
            fast_window: 20,
            slow_window: 50,
            stop_loss_pct: 0.005,
            take_profit_1_pct: 0.010,
            take_profit_2_pct: 0.020,
            tp1_partial: 0.50,
            taker_fee: 0.001,
            max_open_positions: 5,
            base_notional: 1.0,
            min_notional: 10.0,
            qty_step: 1e-5,
            exit_mode: ExitMode::Independent,
        }
    }
}

impl RunParams {
    /// Check every parameter before any simulation work. The engine calls
    /// this itself, so a malformed parameter set never runs partway.
    pub fn validate(&self) -> Result<(), OrobtError> {
        fn invalid(name: &str, reason: &str) -> OrobtError {
            OrobtError::InvalidParameter {
                name: name.to_string(),
                reason: reason.to_string(),
            }
        }

        if self.fast_window == 0 {
            return Err(invalid("fast_window", "must be at least 1"));
        }
        if self.slow_window == 0 {
            return Err(invalid("slow_window", "must be at least 1"));
        }
        if self.fast_window >= self.slow_window {
            return Err(invalid("fast_window", "must be smaller than slow_window"));
        }
        if self.stop_loss_pct <= 0.0 {
            return Err(invalid("stop_loss_pct", "must be positive"));
        }
        if self.take_profit_1_pct <= 0.0 {
            return Err(invalid("take_profit_1_pct", "must be positive"));
        }
        if self.take_profit_2_pct <= 0.0 {
            return Err(invalid("take_profit_2_pct", "must be positive"));
        }
        if self.take_profit_1_pct >= self.take_profit_2_pct {
            return Err(invalid(
                "take_profit_1_pct",
                "must be smaller than take_profit_2_pct",
            ));
        }
        if self.tp1_partial <= 0.0 || self.tp1_partial >= 1.0 {
            return Err(invalid(
                "tp1_partial",
                "must be a fraction strictly between 0 and 1",
            ));
        }
        if self.taker_fee <= 0.0 {
            return Err(invalid("taker_fee", "must be positive"));
        }
        if self.max_open_positions == 0 {
            return Err(invalid("max_open_positions", "must be at least 1"));
        }
        if self.base_notional <= 0.0 {
            return Err(invalid("base_notional", "must be positive"));
        }
        if self.min_notional < 0.0 {
            return Err(invalid("min_notional", "must be non-negative"));
        }
        if self.qty_step <= 0.0 {
            return Err(invalid("qty_step", "must be positive"));
        }
        Ok(())
    }

    /// One-line rule summary for reports, e.g.
    /// `SL 0.5%, TP1 1.0% (50%), TP2 2.0%, MaxPos 5, Fee 0.10%`.
    pub fn rules_summary(&self) -> String {
        format!(
            "SL {:.1}%, TP1 {:.1}% ({:.0}%), TP2 {:.1}%, MaxPos {}, Fee {:.2}%",
            self.stop_loss_pct * 100.0,
            self.take_profit_1_pct * 100.0,
            self.tp1_partial * 100.0,
            self.take_profit_2_pct * 100.0,
            self.max_open_positions,
            self.taker_fee * 100.0,
        )
    }
}

/// Everything a run produces: summary KPIs, the ordered fill log, and the
/// final position list (all closed after finalization).
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub kpis: Kpis,
    pub trade_log: Vec<TradeEvent>,
    pub positions: Vec<Position>,
}

/// Replay `candles` in order under `params`.
///
/// Errors before any simulation work on an invalid parameter set or an
/// empty candle sequence. Degenerate fills (quantity floors to zero) are
/// skipped silently; they are an expected edge case at small notionals.
pub fn run_backtest(candles: &[Candle], params: &RunParams) -> Result<BacktestResult, OrobtError> {
    params.validate()?;

    let Some(last_candle) = candles.last() else {
        return Err(OrobtError::InsufficientData {
            bars: 0,
            minimum: 1,
        });
    };

    let closes = candle::closes(candles);
    let mut positions: Vec<Position> = Vec::new();
    let mut trade_log: Vec<TradeEvent> = Vec::new();
    let mut realized_pnl = 0.0_f64;
    let mut drawdown = DrawdownTracker::default();

    for (i, bar) in candles.iter().enumerate() {
        let px = bar.close;

        // 1) Exit evaluation, insertion order.
        for pos in positions.iter_mut() {
            if pos.closed {
                continue;
            }
            realized_pnl += evaluate_exits(pos, bar.open_time, px, params, &mut trade_log);
        }

        // 2) Entry evaluation: one new position per bar at most.
        let open_count = positions.iter().filter(|p| p.is_open()).count();
        let signal = ma_cross_signal(&closes[..=i], params.fast_window, params.slow_window);
        if signal == Signal::Buy && open_count < params.max_open_positions {
            let qty = entry_quantity(params.base_notional, params.min_notional, px, params.qty_step);
            if qty > 0.0 {
                let fee = entry_fee(px, qty, params.taker_fee);
                realized_pnl -= fee;
                positions.push(Position::open(
                    bar.open_time,
                    px,
                    qty,
                    params.take_profit_1_pct,
                    params.take_profit_2_pct,
                    params.stop_loss_pct,
                ));
                trade_log.push(TradeEvent::Open {
                    time: bar.open_time,
                    price: px,
                    qty,
                    entry_fee: fee,
                });
            }
        }

        // 3) Realized-only equity curve.
        drawdown.observe(realized_pnl);
    }

    // Force-close whatever is still open at the last close.
    let last_px = last_candle.close;
    for pos in positions.iter_mut() {
        if pos.is_open() && pos.remaining_qty > 0.0 {
            let qty = round_step(pos.remaining_qty, params.qty_step);
            let pnl = fill_pnl(pos.entry_price, last_px, qty, params.taker_fee);
            realized_pnl += pnl;
            pos.apply_close(last_candle.open_time, pnl);
            trade_log.push(TradeEvent::ForceClose {
                time: last_candle.open_time,
                price: last_px,
                qty,
                pnl,
            });
        }
    }

    let kpis = Kpis::compute(&positions, &trade_log, realized_pnl, drawdown.max_drawdown());

    Ok(BacktestResult {
        kpis,
        trade_log,
        positions,
    })
}

/// Apply the per-bar exit protocol to one open position. Returns the P&L
/// realized on this bar (fills are also recorded on the position and in
/// the log).
fn evaluate_exits(
    pos: &mut Position,
    time: i64,
    px: f64,
    params: &RunParams,
    trade_log: &mut Vec<TradeEvent>,
) -> f64 {
    let mut realized = 0.0;
    let mut filled_this_bar = false;

    // Tier-1 partial.
    if pos.tp1_triggered(px) {
        let qty = round_step(pos.remaining_qty * params.tp1_partial, params.qty_step);
        if qty > 0.0 {
            let pnl = fill_pnl(pos.entry_price, px, qty, params.taker_fee);
            realized += pnl;
            pos.apply_partial(qty, pnl);
            trade_log.push(TradeEvent::Tp1Partial {
                time,
                price: px,
                qty,
                pnl,
            });
            filled_this_bar = true;
        }
    }

    let exclusive_done = params.exit_mode == ExitMode::Exclusive && filled_this_bar;

    // Stop-loss on the remainder.
    if !exclusive_done && pos.stop_triggered(px) {
        let qty = round_step(pos.remaining_qty, params.qty_step);
        if qty > 0.0 {
            let pnl = fill_pnl(pos.entry_price, px, qty, params.taker_fee);
            realized += pnl;
            pos.apply_close(time, pnl);
            trade_log.push(TradeEvent::StopClose {
                time,
                price: px,
                qty,
                pnl,
            });
            filled_this_bar = true;
        }
    }

    let exclusive_done = params.exit_mode == ExitMode::Exclusive && filled_this_bar;

    // Tier-2 full close on the remainder.
    if !exclusive_done && pos.tp2_triggered(px) {
        let qty = round_step(pos.remaining_qty, params.qty_step);
        if qty > 0.0 {
            let pnl = fill_pnl(pos.entry_price, px, qty, params.taker_fee);
            realized += pnl;
            pos.apply_close(time, pnl);
            trade_log.push(TradeEvent::Tp2Close {
                time,
                price: px,
                qty,
                pnl,
            });
        }
    }

    realized
}
