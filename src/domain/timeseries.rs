//! Per-timeframe bar series and the multi-timeframe snapshot of one symbol.

use crate::domain::error::ScreenerError;
use crate::domain::ohlcv::OhlcvBar;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Bar interval. Declaration order is coarse to fine, so the derived `Ord`
/// makes the finest timeframe the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Weekly,
    Daily,
    FourHour,
    Hourly,
    FifteenMinute,
    FiveMinute,
}

impl Timeframe {
    pub const ALL: [Timeframe; 6] = [
        Timeframe::Weekly,
        Timeframe::Daily,
        Timeframe::FourHour,
        Timeframe::Hourly,
        Timeframe::FifteenMinute,
        Timeframe::FiveMinute,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Weekly => "weekly",
            Timeframe::Daily => "daily",
            Timeframe::FourHour => "4h",
            Timeframe::Hourly => "hourly",
            Timeframe::FifteenMinute => "15m",
            Timeframe::FiveMinute => "5m",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" | "1w" => Ok(Timeframe::Weekly),
            "daily" | "1d" => Ok(Timeframe::Daily),
            "4h" | "four_hour" => Ok(Timeframe::FourHour),
            "hourly" | "1h" => Ok(Timeframe::Hourly),
            "15m" | "fifteen_minute" => Ok(Timeframe::FifteenMinute),
            "5m" | "five_minute" => Ok(Timeframe::FiveMinute),
            other => Err(format!("unknown timeframe '{}'", other)),
        }
    }
}

/// Ordered bars of one timeframe. Timestamps strictly increase.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    timeframe: Timeframe,
    bars: Vec<OhlcvBar>,
}

impl TimeSeries {
    pub fn new(timeframe: Timeframe, bars: Vec<OhlcvBar>) -> Result<Self, ScreenerError> {
        for (i, bar) in bars.iter().enumerate() {
            if !bar.is_well_formed() {
                return Err(ScreenerError::InvalidSeries {
                    timeframe,
                    reason: format!("malformed prices at bar {} ({})", i, bar.timestamp),
                });
            }
            if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
                return Err(ScreenerError::InvalidSeries {
                    timeframe,
                    reason: format!("timestamps not increasing at bar {} ({})", i, bar.timestamp),
                });
            }
        }
        Ok(Self { timeframe, bars })
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&OhlcvBar> {
        self.bars.last()
    }

    /// The last `n` bars as an owned series (the whole series if shorter).
    pub fn tail(&self, n: usize) -> TimeSeries {
        let start = self.bars.len().saturating_sub(n);
        TimeSeries {
            timeframe: self.timeframe,
            bars: self.bars[start..].to_vec(),
        }
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume as f64).collect()
    }
}

/// Multi-timeframe snapshot of a single symbol.
#[derive(Debug, Clone)]
pub struct MarketData {
    pub symbol: String,
    series: BTreeMap<Timeframe, TimeSeries>,
}

impl MarketData {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            series: BTreeMap::new(),
        }
    }

    pub fn with_series(mut self, series: TimeSeries) -> Self {
        self.insert(series);
        self
    }

    pub fn insert(&mut self, series: TimeSeries) {
        self.series.insert(series.timeframe(), series);
    }

    pub fn get(&self, timeframe: Timeframe) -> Option<&TimeSeries> {
        self.series.get(&timeframe).filter(|s| !s.is_empty())
    }

    pub fn daily(&self) -> Option<&TimeSeries> {
        self.get(Timeframe::Daily)
    }

    pub fn timeframes(&self) -> impl Iterator<Item = (Timeframe, &TimeSeries)> {
        self.series
            .iter()
            .filter(|(_, s)| !s.is_empty())
            .map(|(tf, s)| (*tf, s))
    }

    /// Last close of the finest non-empty timeframe.
    pub fn current_price(&self) -> Option<f64> {
        self.series
            .values()
            .rev()
            .find_map(|s| s.last())
            .map(|b| b.close)
    }

    /// Daily data is always required; `required` adds further timeframes.
    pub fn is_usable(&self, required: &[Timeframe]) -> bool {
        self.daily().is_some() && required.iter().all(|tf| self.get(*tf).is_some())
    }
}
