//! Trend classification, swing sequence and pullbacks.

use super::pivot::{Pivot, PivotKind, find_pivots};
use crate::domain::config::AnalysisConfig;
use crate::domain::error::AnalysisError;
use crate::domain::stats::{linear_slope, mean, return_volatility};
use crate::domain::timeseries::TimeSeries;
use serde::Serialize;
use std::fmt;

/// Slopes smaller than this fraction of the mean price per bar count as flat.
const FLAT_SLOPE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Bullish,
    Bearish,
    Sideways,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trend::Bullish => "bullish",
            Trend::Bearish => "bearish",
            Trend::Sideways => "sideways",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureQuality {
    High,
    Low,
}

impl fmt::Display for StructureQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StructureQuality::High => "high",
            StructureQuality::Low => "low",
        })
    }
}

/// A counter-trend swing followed by resumption of the trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pullback {
    pub start: Pivot,
    pub extreme: Pivot,
    pub resume: Pivot,
    /// Retracement as a fraction of the starting swing price.
    pub depth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceStructure {
    pub trend: Trend,
    pub swings: Vec<Pivot>,
    pub pullbacks: Vec<Pullback>,
    pub volatility: f64,
    pub quality: StructureQuality,
}

/// Bullish when the regression slopes of both highs and lows over the last
/// `window` bars are positive, bearish when both are negative.
pub fn classify_trend(series: &TimeSeries, window: usize) -> Result<Trend, AnalysisError> {
    let need = window.max(2);
    if series.len() < need {
        return Err(AnalysisError::InsufficientData {
            need,
            have: series.len(),
        });
    }
    let recent = series.tail(window);
    let highs = recent.highs();
    let lows = recent.lows();

    let sign = |values: &[f64]| -> i8 {
        let (Some(slope), Some(avg)) = (linear_slope(values), mean(values)) else {
            return 0;
        };
        let flat = FLAT_SLOPE * avg.abs();
        if slope > flat {
            1
        } else if slope < -flat {
            -1
        } else {
            0
        }
    };

    Ok(match (sign(&highs), sign(&lows)) {
        (1, 1) => Trend::Bullish,
        (-1, -1) => Trend::Bearish,
        _ => Trend::Sideways,
    })
}

/// Pivot highs and lows in bar order, collapsed so kinds alternate. Within
/// a run of one kind the most extreme pivot survives (earliest on ties).
pub fn swing_points(series: &TimeSeries, order: usize) -> Vec<Pivot> {
    let mut pivots = find_pivots(&series.highs(), order, PivotKind::High);
    pivots.extend(find_pivots(&series.lows(), order, PivotKind::Low));
    pivots.sort_by(|a, b| a.index.cmp(&b.index).then(a.kind.cmp(&b.kind)));

    let mut swings: Vec<Pivot> = Vec::with_capacity(pivots.len());
    for p in pivots {
        match swings.last_mut() {
            Some(last) if last.kind == p.kind => {
                let more_extreme = match p.kind {
                    PivotKind::High => p.price > last.price,
                    PivotKind::Low => p.price < last.price,
                };
                if more_extreme {
                    *last = p;
                }
            }
            _ => swings.push(p),
        }
    }
    swings
}

fn find_pullbacks(swings: &[Pivot], trend: Trend) -> Vec<Pullback> {
    let (first, middle, resumes): (PivotKind, PivotKind, fn(f64, f64) -> bool) = match trend {
        Trend::Bullish => (PivotKind::High, PivotKind::Low, |a, b| b > a),
        Trend::Bearish => (PivotKind::Low, PivotKind::High, |a, b| b < a),
        Trend::Sideways => return Vec::new(),
    };

    swings
        .windows(3)
        .filter(|w| w[0].kind == first && w[1].kind == middle && w[2].kind == first)
        .filter(|w| resumes(w[0].price, w[2].price))
        .map(|w| Pullback {
            start: w[0],
            extreme: w[1],
            resume: w[2],
            depth: (w[0].price - w[1].price).abs() / w[0].price,
        })
        .collect()
}

pub fn price_structure(
    series: &TimeSeries,
    cfg: &AnalysisConfig,
) -> Result<PriceStructure, AnalysisError> {
    if series.len() < cfg.min_bars {
        return Err(AnalysisError::InsufficientData {
            need: cfg.min_bars,
            have: series.len(),
        });
    }

    let trend = classify_trend(series, cfg.trend_window)?;
    let swings = swing_points(series, cfg.pivot_order);
    let pullbacks = find_pullbacks(&swings, trend);

    let closes = series.tail(cfg.trend_window).closes();
    let volatility = return_volatility(&closes).ok_or(AnalysisError::InsufficientData {
        need: 3,
        have: closes.len(),
    })?;
    let quality = if volatility < cfg.volatility_threshold {
        StructureQuality::High
    } else {
        StructureQuality::Low
    };

    Ok(PriceStructure {
        trend,
        swings,
        pullbacks,
        volatility,
        quality,
    })
}
