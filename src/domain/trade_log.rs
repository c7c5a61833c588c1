//! Fill events recorded during a run.
//!
//! One variant per action kind so the five-way branches in KPI derivation
//! and reporting are checked for exhaustiveness at compile time.

/// An immutable record of one fill event. Append-only; the engine never
/// reads the log back.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeEvent {
    Open {
        time: i64,
        price: f64,
        qty: f64,
        entry_fee: f64,
    },
    Tp1Partial {
        time: i64,
        price: f64,
        qty: f64,
        pnl: f64,
    },
    StopClose {
        time: i64,
        price: f64,
        qty: f64,
        pnl: f64,
    },
    Tp2Close {
        time: i64,
        price: f64,
        qty: f64,
        pnl: f64,
    },
    ForceClose {
        time: i64,
        price: f64,
        qty: f64,
        pnl: f64,
    },
}

impl TradeEvent {
    pub fn time(&self) -> i64 {
        match *self {
            TradeEvent::Open { time, .. }
            | TradeEvent::Tp1Partial { time, .. }
            | TradeEvent::StopClose { time, .. }
            | TradeEvent::Tp2Close { time, .. }
            | TradeEvent::ForceClose { time, .. } => time,
        }
    }

    pub fn price(&self) -> f64 {
        match *self {
            TradeEvent::Open { price, .. }
            | TradeEvent::Tp1Partial { price, .. }
            | TradeEvent::StopClose { price, .. }
            | TradeEvent::Tp2Close { price, .. }
            | TradeEvent::ForceClose { price, .. } => price,
        }
    }

    pub fn qty(&self) -> f64 {
        match *self {
            TradeEvent::Open { qty, .. }
            | TradeEvent::Tp1Partial { qty, .. }
            | TradeEvent::StopClose { qty, .. }
            | TradeEvent::Tp2Close { qty, .. }
            | TradeEvent::ForceClose { qty, .. } => qty,
        }
    }

    /// Signed contribution of this event to the cumulative run P&L. An
    /// entry contributes its fee as a negative amount, so the whole log
    /// sums to the final realized equity.
    pub fn pnl(&self) -> f64 {
        match *self {
            TradeEvent::Open { entry_fee, .. } => -entry_fee,
            TradeEvent::Tp1Partial { pnl, .. }
            | TradeEvent::StopClose { pnl, .. }
            | TradeEvent::Tp2Close { pnl, .. }
            | TradeEvent::ForceClose { pnl, .. } => pnl,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            TradeEvent::Open { .. } => "OPEN",
            TradeEvent::Tp1Partial { .. } => "TP1 partial",
            TradeEvent::StopClose { .. } => "SL close",
            TradeEvent::Tp2Close { .. } => "TP2 close",
            TradeEvent::ForceClose { .. } => "FORCE CLOSE",
        }
    }

    pub fn is_exit(&self) -> bool {
        !matches!(self, TradeEvent::Open { .. })
    }
}
