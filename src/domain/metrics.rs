//! KPI derivation and drawdown accounting.

use super::position::Position;
use super::trade_log::TradeEvent;

/// Peak-to-trough tracking over the realized-P&L equity curve. The curve
/// starts at zero, so the peak never goes below zero either.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawdownTracker {
    peak: f64,
    max_drawdown: f64,
}

impl DrawdownTracker {
    pub fn observe(&mut self, equity: f64) {
        if equity > self.peak {
            self.peak = equity;
        }
        let drawdown = self.peak - equity;
        if drawdown > self.max_drawdown {
            self.max_drawdown = drawdown;
        }
    }

    pub fn peak(&self) -> f64 {
        self.peak
    }

    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }
}

/// Summary statistics for one completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct Kpis {
    pub trades_opened: usize,
    pub positions_closed: usize,
    /// Percentage of closed positions with non-negative P&L.
    pub win_rate: f64,
    /// Mean P&L of strictly positive closed positions, 0 if none.
    pub avg_win: f64,
    /// Mean P&L of strictly negative closed positions, 0 if none.
    pub avg_loss: f64,
    pub expectancy: f64,
    pub realized_pnl: f64,
    pub max_drawdown: f64,
}

impl Kpis {
    pub fn compute(
        positions: &[Position],
        trade_log: &[TradeEvent],
        realized_pnl: f64,
        max_drawdown: f64,
    ) -> Self {
        let closed: Vec<&Position> = positions.iter().filter(|p| p.closed).collect();

        let wins = closed.iter().filter(|p| p.realized_pnl >= 0.0).count();
        let win_rate = wins as f64 / closed.len().max(1) as f64 * 100.0;

        let winners: Vec<f64> = closed
            .iter()
            .map(|p| p.realized_pnl)
            .filter(|&pnl| pnl > 0.0)
            .collect();
        let losers: Vec<f64> = closed
            .iter()
            .map(|p| p.realized_pnl)
            .filter(|&pnl| pnl < 0.0)
            .collect();

        let avg_win = mean_or_zero(&winners);
        let avg_loss = mean_or_zero(&losers);
        let expectancy = (win_rate / 100.0) * avg_win + (1.0 - win_rate / 100.0) * avg_loss;

        let trades_opened = trade_log
            .iter()
            .filter(|ev| matches!(ev, TradeEvent::Open { .. }))
            .count();

        Kpis {
            trades_opened,
            positions_closed: closed.len(),
            win_rate,
            avg_win,
            avg_loss,
            expectancy,
            realized_pnl,
            max_drawdown,
        }
    }
}

fn mean_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
