//! Run configuration validation.
//!
//! Checks every key before a run starts so a bad config never fails
//! partway through a simulation.

use crate::domain::backtest::ExitMode;
use crate::domain::error::OrobtError;
use crate::ports::config_port::ConfigPort;

pub fn validate_run_config(config: &dyn ConfigPort) -> Result<(), OrobtError> {
    validate_windows(config)?;
    validate_risk(config)?;
    validate_execution(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> OrobtError {
    OrobtError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_windows(config: &dyn ConfigPort) -> Result<(), OrobtError> {
    let fast = config.get_int("strategy", "fast_window", 20);
    if fast < 1 {
        return Err(invalid("strategy", "fast_window", "must be at least 1"));
    }
    let slow = config.get_int("strategy", "slow_window", 50);
    if slow < 1 {
        return Err(invalid("strategy", "slow_window", "must be at least 1"));
    }
    if fast >= slow {
        return Err(invalid(
            "strategy",
            "fast_window",
            "must be smaller than slow_window",
        ));
    }
    Ok(())
}

fn validate_risk(config: &dyn ConfigPort) -> Result<(), OrobtError> {
    let sl = config.get_double("risk", "stop_loss_pct", 0.005);
    if sl <= 0.0 {
        return Err(invalid("risk", "stop_loss_pct", "must be positive"));
    }
    let tp1 = config.get_double("risk", "take_profit_1_pct", 0.010);
    if tp1 <= 0.0 {
        return Err(invalid("risk", "take_profit_1_pct", "must be positive"));
    }
    let tp2 = config.get_double("risk", "take_profit_2_pct", 0.020);
    if tp2 <= 0.0 {
        return Err(invalid("risk", "take_profit_2_pct", "must be positive"));
    }
    if tp1 >= tp2 {
        return Err(invalid(
            "risk",
            "take_profit_1_pct",
            "must be smaller than take_profit_2_pct",
        ));
    }
    let partial = config.get_double("risk", "tp1_partial", 0.50);
    if partial <= 0.0 || partial >= 1.0 {
        return Err(invalid(
            "risk",
            "tp1_partial",
            "must be a fraction strictly between 0 and 1",
        ));
    }
    let max_open = config.get_int("risk", "max_open_positions", 5);
    if max_open < 1 {
        return Err(invalid("risk", "max_open_positions", "must be at least 1"));
    }
    Ok(())
}

fn validate_execution(config: &dyn ConfigPort) -> Result<(), OrobtError> {
    let fee = config.get_double("execution", "taker_fee", 0.001);
    if fee <= 0.0 {
        return Err(invalid("execution", "taker_fee", "must be positive"));
    }
    let base = config.get_double("execution", "base_notional", 1.0);
    if base <= 0.0 {
        return Err(invalid("execution", "base_notional", "must be positive"));
    }
    let min = config.get_double("execution", "min_notional", 10.0);
    if min < 0.0 {
        return Err(invalid("execution", "min_notional", "must be non-negative"));
    }
    let step = config.get_double("execution", "qty_step", 1e-5);
    if step <= 0.0 {
        return Err(invalid("execution", "qty_step", "must be positive"));
    }
    if let Some(mode) = config.get_string("execution", "exit_mode") {
        if ExitMode::parse(&mode).is_none() {
            return Err(invalid(
                "execution",
                "exit_mode",
                "must be 'independent' or 'exclusive'",
            ));
        }
    }
    Ok(())
}
