//! CSV candle file adapter.
//!
//! One file per symbol/timeframe pair, named `{SYMBOL}_{TIMEFRAME}.csv`,
//! with header `open_time,open,high,low,close,volume` and `open_time` in
//! milliseconds since the Unix epoch.

use crate::domain::candle::Candle;
use crate::domain::error::OrobtError;
use crate::ports::candle_port::CandlePort;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

pub struct CsvCandleAdapter {
    base_path: PathBuf,
}

impl CsvCandleAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, timeframe: &str) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", symbol, timeframe))
    }
}

fn field<T: FromStr>(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<T, OrobtError>
where
    T::Err: std::fmt::Display,
{
    let raw = record.get(index).ok_or_else(|| OrobtError::CandleData {
        reason: format!("missing {} column", name),
    })?;
    raw.parse().map_err(|e| OrobtError::CandleData {
        reason: format!("invalid {} value {:?}: {}", name, raw, e),
    })
}

impl CandlePort for CsvCandleAdapter {
    fn fetch_candles(&self, symbol: &str, timeframe: &str) -> Result<Vec<Candle>, OrobtError> {
        let path = self.csv_path(symbol, timeframe);
        let content = fs::read_to_string(&path).map_err(|e| OrobtError::CandleData {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut candles = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| OrobtError::CandleData {
                reason: format!("CSV parse error: {}", e),
            })?;

            candles.push(Candle {
                open_time: field(&record, 0, "open_time")?,
                open: field(&record, 1, "open")?,
                high: field(&record, 2, "high")?,
                low: field(&record, 3, "low")?,
                close: field(&record, 4, "close")?,
                volume: field(&record, 5, "volume")?,
            });
        }

        candles.sort_by_key(|c| c.open_time);
        for pair in candles.windows(2) {
            if pair[0].open_time == pair[1].open_time {
                return Err(OrobtError::CandleData {
                    reason: format!(
                        "duplicate open_time {} in {}",
                        pair[0].open_time,
                        path.display()
                    ),
                });
            }
        }

        Ok(candles)
    }

    fn list_symbols(&self, timeframe: &str) -> Result<Vec<String>, OrobtError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| OrobtError::CandleData {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let suffix = format!("_{}.csv", timeframe);
        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| OrobtError::CandleData {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if name_str.ends_with(&suffix) {
                symbols.push(name_str[..name_str.len() - suffix.len()].to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn data_range(
        &self,
        symbol: &str,
        timeframe: &str,
    ) -> Result<Option<(i64, i64, usize)>, OrobtError> {
        if !self.csv_path(symbol, timeframe).exists() {
            return Ok(None);
        }
        let candles = self.fetch_candles(symbol, timeframe)?;
        Ok(match (candles.first(), candles.last()) {
            (Some(first), Some(last)) => Some((first.open_time, last.open_time, candles.len())),
            _ => None,
        })
    }
}
