//! Result sink port trait.

use crate::domain::backtest::{BacktestResult, RunParams};
use crate::domain::error::OrobtError;

/// Descriptive context for a run, used for report headers only.
#[derive(Debug, Clone)]
pub struct RunMeta {
    pub symbol: String,
    pub timeframe: String,
    pub params: RunParams,
}

/// Port for persisting a finished run: KPIs plus the full trade log.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, meta: &RunMeta) -> Result<(), OrobtError>;
}
