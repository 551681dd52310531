//! Market data access port trait.

use crate::domain::error::ScreenerError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::timeseries::Timeframe;

pub trait DataPort {
    /// Bars for one symbol and timeframe, oldest first.
    ///
    /// Returns `ScreenerError::Unavailable` when the source has no data for
    /// that timeframe at all.
    fn fetch_bars(&self, symbol: &str, timeframe: Timeframe)
    -> Result<Vec<OhlcvBar>, ScreenerError>;

    fn list_symbols(&self) -> Result<Vec<String>, ScreenerError>;
}
