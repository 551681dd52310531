//! Domain error types.

use crate::domain::timeseries::Timeframe;

/// Why a structure detector could not produce a result.
///
/// Distinct from an empty success: `Ok(vec![])` from a detector means the
/// computation ran and found no pattern.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("not computable: have {have} bars, need {need}")]
    InsufficientData { need: usize, have: usize },

    #[error("not computable: degenerate swing range ({low} .. {high})")]
    DegenerateRange { high: f64, low: f64 },
}

/// Top-level error type for zonescan.
#[derive(Debug, thiserror::Error)]
pub enum ScreenerError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("{timeframe} data unavailable for {symbol}")]
    Unavailable { symbol: String, timeframe: Timeframe },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("invalid {timeframe} series: {reason}")]
    InvalidSeries { timeframe: Timeframe, reason: String },

    #[error(transparent)]
    Universe(#[from] crate::domain::universe::UniverseError),

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&ScreenerError> for std::process::ExitCode {
    fn from(err: &ScreenerError) -> Self {
        let code: u8 = match err {
            ScreenerError::Io(_) | ScreenerError::Report { .. } => 1,
            ScreenerError::ConfigParse { .. }
            | ScreenerError::ConfigMissing { .. }
            | ScreenerError::ConfigInvalid { .. }
            | ScreenerError::Universe(_) => 2,
            ScreenerError::DataSource { .. } | ScreenerError::Unavailable { .. } => 3,
            ScreenerError::NoData { .. }
            | ScreenerError::InsufficientData { .. }
            | ScreenerError::InvalidSeries { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
