#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
pub use zonescan::domain::ohlcv::OhlcvBar;
use zonescan::domain::error::ScreenerError;
use zonescan::domain::timeseries::{TimeSeries, Timeframe};
use zonescan::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<(String, Timeframe), Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, timeframe: Timeframe, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert((symbol.to_string(), timeframe), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Vec<OhlcvBar>, ScreenerError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(ScreenerError::DataSource {
                reason: reason.clone(),
            });
        }
        self.data
            .get(&(symbol.to_string(), timeframe))
            .cloned()
            .ok_or_else(|| ScreenerError::Unavailable {
                symbol: symbol.to_string(),
                timeframe,
            })
    }

    fn list_symbols(&self) -> Result<Vec<String>, ScreenerError> {
        let mut symbols: Vec<String> = self
            .data
            .keys()
            .filter(|(_, tf)| *tf == Timeframe::Daily)
            .map(|(s, _)| s.clone())
            .collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 9, 15, 0).unwrap()
}

pub fn step(timeframe: Timeframe) -> Duration {
    match timeframe {
        Timeframe::Weekly => Duration::weeks(1),
        Timeframe::Daily => Duration::days(1),
        Timeframe::FourHour => Duration::hours(4),
        Timeframe::Hourly => Duration::hours(1),
        Timeframe::FifteenMinute => Duration::minutes(15),
        Timeframe::FiveMinute => Duration::minutes(5),
    }
}

/// Bars from `(open, high, low, close)` tuples, one `timeframe` step apart.
pub fn bars_from(timeframe: Timeframe, ohlc: &[(f64, f64, f64, f64)], volume: u64) -> Vec<OhlcvBar> {
    ohlc.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| OhlcvBar {
            timestamp: start() + step(timeframe) * i as i32,
            open,
            high,
            low,
            close,
            volume,
        })
        .collect()
}

/// Steady uptrend: close rises by 1 per bar, every fifth bar carries a
/// deep lower wick that forms an ascending support line.
///
/// The wicks are deliberate. A strictly rising series without them has no
/// bar that is the extreme of its neighbourhood, so no pivots and no
/// trendlines would be found at all.
pub fn rising_with_wicks(timeframe: Timeframe, n: usize, volume: u64) -> Vec<OhlcvBar> {
    let ohlc: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let close = 100.0 + i as f64;
            let low = if i % 5 == 2 { close - 5.0 } else { close - 1.0 };
            (close, close + 1.0, low, close)
        })
        .collect();
    bars_from(timeframe, &ohlc, volume)
}

/// Descending resistance (highs on 114.5 - 0.2 i at every tenth bar from
/// bar 5), broken at bar 50, retested with a rejection wick at bar 53.
pub fn break_and_retest_hourly() -> Vec<OhlcvBar> {
    let mut ohlc: Vec<(f64, f64, f64, f64)> = (0..50)
        .map(|i| {
            let phase = ((i % 10) as f64 - 5.0).abs();
            let close = 110.0 - 0.2 * i as f64 + (4.0 - 8.0 * phase / 5.0);
            (close, close + 0.5, close - 0.5, close)
        })
        .collect();
    ohlc.extend([
        (98.0, 106.5, 97.5, 106.0),
        (106.0, 106.2, 105.2, 105.5),
        (105.5, 105.6, 104.8, 105.0),
        (104.6, 105.2, 103.2, 105.0),
    ]);
    bars_from(Timeframe::Hourly, &ohlc, 5_000)
}

/// Thirty daily bars climbing 0.2 per bar from a 97.5 low with one
/// volume spike on bar 26 (low 102.7).
///
/// With the hourly break and retest (current price 105) this leaves a single
/// support zone at the 23.6% retracement of the 97.5..104.3 swing, backed by
/// the level cluster at 102.7 and the spike bar's range.
pub fn climbing_daily_with_volume_spike() -> Vec<OhlcvBar> {
    let ohlc: Vec<(f64, f64, f64, f64)> = (0..30)
        .map(|i| {
            let low = 97.5 + 0.2 * i as f64;
            (low + 0.3, low + 1.0, low, low + 0.7)
        })
        .collect();
    let mut bars = bars_from(Timeframe::Daily, &ohlc, 100_000);
    bars[26].volume = 400_000;
    bars
}

pub fn series(timeframe: Timeframe, bars: Vec<OhlcvBar>) -> TimeSeries {
    TimeSeries::new(timeframe, bars).unwrap()
}
