//! Fibonacci retracement levels of the dominant swing.

use super::price_structure::{Trend, classify_trend};
use crate::domain::config::AnalysisConfig;
use crate::domain::error::AnalysisError;
use crate::domain::timeseries::TimeSeries;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FibLevel {
    pub ratio: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FibonacciSet {
    pub trend: Trend,
    pub swing_high: f64,
    pub swing_high_index: usize,
    pub swing_low: f64,
    pub swing_low_index: usize,
    pub levels: Vec<FibLevel>,
}

/// Retracements over the last `fib_lookback` bars.
///
/// In an uptrend the swing runs from the window's lowest low to the highest
/// high after it and levels are measured down from the high. Otherwise the
/// swing runs from the highest high to the lowest low after it and levels
/// are measured up from the low. Indices refer to the full series.
pub fn fibonacci_levels(
    series: &TimeSeries,
    trend: Option<Trend>,
    cfg: &AnalysisConfig,
) -> Result<FibonacciSet, AnalysisError> {
    let n = series.len();
    if n < cfg.min_bars {
        return Err(AnalysisError::InsufficientData {
            need: cfg.min_bars,
            have: n,
        });
    }
    // a swing needs two bars inside the lookback window
    let start = n.saturating_sub(cfg.fib_lookback);
    if n - start < 2 {
        return Err(AnalysisError::InsufficientData {
            need: 2,
            have: n - start,
        });
    }
    let trend = match trend {
        Some(t) => t,
        None => classify_trend(series, cfg.trend_window)?,
    };

    let highs = series.highs();
    let lows = series.lows();

    let (high_idx, low_idx) = match trend {
        Trend::Bullish => {
            let low_idx = arg_extreme(&lows, start, |a, b| a < b);
            (arg_extreme(&highs, low_idx, |a, b| a > b), low_idx)
        }
        Trend::Bearish | Trend::Sideways => {
            let high_idx = arg_extreme(&highs, start, |a, b| a > b);
            (high_idx, arg_extreme(&lows, high_idx, |a, b| a < b))
        }
    };
    let swing_high = highs[high_idx];
    let swing_low = lows[low_idx];
    let range = swing_high - swing_low;

    if !range.is_finite() || range <= cfg.fib_min_range * swing_high {
        return Err(AnalysisError::DegenerateRange {
            high: swing_high,
            low: swing_low,
        });
    }

    let levels = cfg
        .fib_ratios
        .iter()
        .map(|&ratio| FibLevel {
            ratio,
            price: match trend {
                Trend::Bullish => swing_high - range * ratio,
                _ => swing_low + range * ratio,
            },
        })
        .collect();

    Ok(FibonacciSet {
        trend,
        swing_high,
        swing_high_index: high_idx,
        swing_low,
        swing_low_index: low_idx,
        levels,
    })
}

/// Index of the first most-extreme value in `values[from..]`, where
/// `better(a, b)` means `a` beats `b`.
fn arg_extreme(values: &[f64], from: usize, better: impl Fn(f64, f64) -> bool) -> usize {
    let mut best = from;
    for i in from + 1..values.len() {
        if better(values[i], values[best]) {
            best = i;
        }
    }
    best
}
