//! CSV report adapter.
//!
//! Writes two files into the output directory: `report.csv` with one
//! KPI per row, and `trades.csv` with the full ordered fill log.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::OrobtError;
use crate::ports::report_port::{ReportPort, RunMeta};
use chrono::DateTime;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvReportAdapter {
    output_dir: PathBuf,
}

impl CsvReportAdapter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    fn write_kpis(&self, path: &Path, result: &BacktestResult, meta: &RunMeta) -> Result<(), OrobtError> {
        let mut w = csv::Writer::from_path(path).map_err(report_error)?;
        let kpis = &result.kpis;

        let rows: [(&str, String); 12] = [
            ("kpi", "value".to_string()),
            ("Symbol", meta.symbol.clone()),
            ("Timeframe", meta.timeframe.clone()),
            ("Trades opened", kpis.trades_opened.to_string()),
            ("Positions closed", kpis.positions_closed.to_string()),
            ("Win rate %", format!("{:.2}", kpis.win_rate)),
            ("Total PNL", format!("{:.2}", kpis.realized_pnl)),
            ("Avg win", format!("{:.3}", kpis.avg_win)),
            ("Avg loss", format!("{:.3}", kpis.avg_loss)),
            ("Expectancy per trade", format!("{:.3}", kpis.expectancy)),
            ("Max drawdown", format!("{:.2}", kpis.max_drawdown)),
            ("Rules", meta.params.rules_summary()),
        ];
        for (name, value) in rows {
            w.write_record([name, value.as_str()]).map_err(report_error)?;
        }
        w.flush()?;
        Ok(())
    }

    fn write_trades(&self, path: &Path, result: &BacktestResult) -> Result<(), OrobtError> {
        let mut w = csv::Writer::from_path(path).map_err(report_error)?;
        w.write_record(["time", "action", "price", "qty", "pnl"])
            .map_err(report_error)?;
        for event in &result.trade_log {
            w.write_record([
                format_time(event.time()),
                event.action().to_string(),
                format!("{}", event.price()),
                format!("{}", event.qty()),
                format!("{:.4}", event.pnl()),
            ])
            .map_err(report_error)?;
        }
        w.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, meta: &RunMeta) -> Result<(), OrobtError> {
        fs::create_dir_all(&self.output_dir)?;
        self.write_kpis(&self.output_dir.join("report.csv"), result, meta)?;
        self.write_trades(&self.output_dir.join("trades.csv"), result)?;
        Ok(())
    }
}

fn report_error(e: csv::Error) -> OrobtError {
    OrobtError::Report {
        reason: e.to_string(),
    }
}

/// Render epoch milliseconds as a UTC timestamp, falling back to the raw
/// number when out of range.
fn format_time(millis: i64) -> String {
    match DateTime::from_timestamp_millis(millis) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => millis.to_string(),
    }
}
