//! Simulated long position lifecycle.

/// A single simulated long entry. Exit prices are derived once at open
/// time and never recomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub open_time: i64,
    pub entry_price: f64,
    pub original_qty: f64,
    pub remaining_qty: f64,
    pub take_profit_1: f64,
    pub take_profit_2: f64,
    pub stop_loss: f64,
    pub closed: bool,
    pub close_time: Option<i64>,
    /// Accumulated P&L of this position's own fills (exit legs only; the
    /// entry fee is charged against the run total, not the position).
    pub realized_pnl: f64,
    pub took_tp1: bool,
}

impl Position {
    pub fn open(
        open_time: i64,
        entry_price: f64,
        qty: f64,
        tp1_pct: f64,
        tp2_pct: f64,
        sl_pct: f64,
    ) -> Self {
        Position {
            open_time,
            entry_price,
            original_qty: qty,
            remaining_qty: qty,
            take_profit_1: entry_price * (1.0 + tp1_pct),
            take_profit_2: entry_price * (1.0 + tp2_pct),
            stop_loss: entry_price * (1.0 - sl_pct),
            closed: false,
            close_time: None,
            realized_pnl: 0.0,
            took_tp1: false,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.closed
    }

    /// Tier-1 take-profit condition; guarded so it fires at most once.
    pub fn tp1_triggered(&self, price: f64) -> bool {
        !self.took_tp1 && price >= self.take_profit_1
    }

    pub fn stop_triggered(&self, price: f64) -> bool {
        !self.closed && price <= self.stop_loss
    }

    pub fn tp2_triggered(&self, price: f64) -> bool {
        !self.closed && price >= self.take_profit_2
    }

    /// Apply the tier-1 partial fill: reduce remaining quantity and latch
    /// the tier-1 guard. The position stays open.
    pub fn apply_partial(&mut self, qty: f64, pnl: f64) {
        self.remaining_qty -= qty;
        self.realized_pnl += pnl;
        self.took_tp1 = true;
    }

    /// Close out all remaining quantity. Terminal: no further fills.
    pub fn apply_close(&mut self, time: i64, pnl: f64) {
        self.remaining_qty = 0.0;
        self.closed = true;
        self.close_time = Some(time);
        self.realized_pnl += pnl;
    }
}
