//! Historical candle source port trait.

use crate::domain::candle::Candle;
use crate::domain::error::OrobtError;

pub trait CandlePort {
    /// Fetch all candles for a symbol/timeframe pair, ordered by
    /// `open_time` with no duplicate timestamps.
    fn fetch_candles(&self, symbol: &str, timeframe: &str) -> Result<Vec<Candle>, OrobtError>;

    fn list_symbols(&self, timeframe: &str) -> Result<Vec<String>, OrobtError>;

    /// First and last bar timestamp plus bar count, `None` when no data
    /// exists for the pair.
    fn data_range(
        &self,
        symbol: &str,
        timeframe: &str,
    ) -> Result<Option<(i64, i64, usize)>, OrobtError>;
}
