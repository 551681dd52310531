//! CSV file data adapter.
//!
//! One file per symbol and timeframe, named `{SYMBOL}_{timeframe}.csv`
//! (for example `TCS_daily.csv`, `TCS_hourly.csv`) with the header
//! `timestamp,open,high,low,close,volume`. Timestamps are RFC 3339,
//! `%Y-%m-%d %H:%M:%S` (UTC) or plain `%Y-%m-%d` dates.

use crate::domain::error::ScreenerError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::timeseries::Timeframe;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", symbol, timeframe.as_str()))
    }
}

fn source_error(reason: String) -> ScreenerError {
    ScreenerError::DataSource { reason }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(ts.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

fn parse_price(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, ScreenerError> {
    record
        .get(index)
        .ok_or_else(|| source_error(format!("missing {} column", name)))?
        .trim()
        .parse()
        .map_err(|e| source_error(format!("invalid {} value: {}", name, e)))
}

/// Accepts integer volumes and the `1234.0` form some exporters write.
fn parse_volume(record: &csv::StringRecord) -> Result<u64, ScreenerError> {
    let raw = record
        .get(5)
        .ok_or_else(|| source_error("missing volume column".into()))?
        .trim();
    if let Ok(v) = raw.parse::<u64>() {
        return Ok(v);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v.round() as u64),
        _ => Err(source_error(format!("invalid volume value: {}", raw))),
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Vec<OhlcvBar>, ScreenerError> {
        let path = self.csv_path(symbol, timeframe);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ScreenerError::Unavailable {
                    symbol: symbol.to_string(),
                    timeframe,
                });
            }
            Err(e) => {
                return Err(source_error(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| source_error(format!("CSV parse error: {}", e)))?;

            let raw_ts = record
                .get(0)
                .ok_or_else(|| source_error("missing timestamp column".into()))?;
            let timestamp = parse_timestamp(raw_ts)
                .ok_or_else(|| source_error(format!("invalid timestamp: {}", raw_ts)))?;

            bars.push(OhlcvBar {
                timestamp,
                open: parse_price(&record, 1, "open")?,
                high: parse_price(&record, 2, "high")?,
                low: parse_price(&record, 3, "low")?,
                close: parse_price(&record, 4, "close")?,
                volume: parse_volume(&record)?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }

    /// Symbols with a daily file.
    fn list_symbols(&self) -> Result<Vec<String>, ScreenerError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            source_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let suffix = format!("_{}.csv", Timeframe::Daily.as_str());
        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| source_error(format!("directory entry error: {}", e)))?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(symbol) = name_str.strip_suffix(&suffix) {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
