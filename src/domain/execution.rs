//! Fill arithmetic shared by the backtest engine.
//!
//! Taker fees are charged symmetrically on the entry and exit notional;
//! quantities are floored to an exchange-style step size.

/// Floor `value` to a multiple of `step`.
pub fn round_step(value: f64, step: f64) -> f64 {
    (value / step).floor() * step
}

/// Round-trip fill P&L: gross price move minus taker fees on both legs.
pub fn fill_pnl(entry_price: f64, exit_price: f64, qty: f64, fee_rate: f64) -> f64 {
    let gross = qty * (exit_price - entry_price);
    let fees = (entry_price + exit_price) * qty * fee_rate;
    gross - fees
}

/// Fee charged on the entry leg alone.
pub fn entry_fee(price: f64, qty: f64, fee_rate: f64) -> f64 {
    price * qty * fee_rate
}

/// Size a new entry: the notional is raised to `min_notional` when below
/// it, then converted to a quantity floored to `step`. A zero result means
/// the entry is skipped.
pub fn entry_quantity(base_notional: f64, min_notional: f64, price: f64, step: f64) -> f64 {
    let notional = base_notional.max(min_notional);
    round_step(notional / price, step)
}
