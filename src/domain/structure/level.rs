//! Horizontal support/resistance levels from four sources, merged into
//! clusters.

use super::pivot::{PivotKind, find_pivots};
use crate::domain::config::AnalysisConfig;
use crate::domain::error::AnalysisError;
use crate::domain::stats::{near, trailing_mean};
use crate::domain::timeseries::TimeSeries;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelSource {
    Pivot,
    Volume,
    Psychological,
    HistoricalExtreme,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Level {
    pub price: f64,
    pub strength: f64,
    pub touches: usize,
    pub sources: BTreeSet<LevelSource>,
}

impl Level {
    pub fn new(price: f64, strength: f64, source: LevelSource) -> Self {
        Self {
            price,
            strength,
            touches: 1,
            sources: BTreeSet::from([source]),
        }
    }
}

const ALL_TIME_STRENGTH: f64 = 3.0;
const WINDOW_EXTREME_STRENGTH: f64 = 2.0;
const BASE_STRENGTH: f64 = 1.0;

/// Spacing of psychological round numbers near `price`: the 1-2-5 step at
/// or below a tenth of the price.
pub fn round_number_step(price: f64) -> f64 {
    let raw = price.abs() * 0.1;
    if !raw.is_finite() || raw <= 0.0 {
        return 1.0;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let mantissa = raw / magnitude;
    let nice = if mantissa >= 5.0 {
        5.0
    } else if mantissa >= 2.0 {
        2.0
    } else {
        1.0
    };
    nice * magnitude
}

/// Cluster levels whose prices lie within `tolerance` of the cluster's
/// lowest price.
///
/// Members are folded into the anchor: strengths and touches add up and
/// sources are united. Output is ordered by strength (desc) then price.
/// Applying the merge twice gives the same result as applying it once.
pub fn merge_levels(levels: Vec<Level>, tolerance: f64) -> Vec<Level> {
    let mut sorted: Vec<Level> = levels
        .into_iter()
        .filter(|l| l.price.is_finite() && l.price > 0.0)
        .collect();
    sorted.sort_by(|a, b| a.price.total_cmp(&b.price));

    let mut merged: Vec<Level> = Vec::new();
    for level in sorted {
        match merged.last_mut() {
            Some(cluster) if near(cluster.price, level.price, tolerance) => {
                cluster.strength += level.strength;
                cluster.touches += level.touches;
                cluster.sources.extend(level.sources);
            }
            _ => merged.push(level),
        }
    }

    merged.sort_by(|a, b| {
        b.strength
            .total_cmp(&a.strength)
            .then(a.price.total_cmp(&b.price))
    });
    merged
}

pub fn find_levels(series: &TimeSeries, cfg: &AnalysisConfig) -> Result<Vec<Level>, AnalysisError> {
    let n = series.len();
    if n < cfg.min_bars {
        return Err(AnalysisError::InsufficientData {
            need: cfg.min_bars,
            have: n,
        });
    }

    let highs = series.highs();
    let lows = series.lows();
    let start = n.saturating_sub(cfg.sr_lookback);
    let mut levels = Vec::new();

    for (values, kind) in [(&highs[start..], PivotKind::High), (&lows[start..], PivotKind::Low)] {
        levels.extend(
            find_pivots(values, cfg.level_pivot_order, kind)
                .into_iter()
                .map(|p| Level::new(p.price, BASE_STRENGTH, LevelSource::Pivot)),
        );
    }

    for i in high_volume_bars(series, cfg) {
        levels.push(Level::new(highs[i], BASE_STRENGTH, LevelSource::Volume));
        levels.push(Level::new(lows[i], BASE_STRENGTH, LevelSource::Volume));
    }

    if let Some(last) = series.last() {
        levels.extend(
            round_numbers(last.close, cfg.round_number_band)
                .map(|p| Level::new(p, BASE_STRENGTH, LevelSource::Psychological)),
        );
    }

    let extreme_start = n.saturating_sub(cfg.extreme_window);
    for (values, strength) in [
        (&highs[..], ALL_TIME_STRENGTH),
        (&highs[extreme_start..], WINDOW_EXTREME_STRENGTH),
    ] {
        if let Some(max) = values.iter().copied().reduce(f64::max) {
            levels.push(Level::new(max, strength, LevelSource::HistoricalExtreme));
        }
    }
    for (values, strength) in [
        (&lows[..], ALL_TIME_STRENGTH),
        (&lows[extreme_start..], WINDOW_EXTREME_STRENGTH),
    ] {
        if let Some(min) = values.iter().copied().reduce(f64::min) {
            levels.push(Level::new(min, strength, LevelSource::HistoricalExtreme));
        }
    }

    Ok(merge_levels(levels, cfg.level_merge_tolerance))
}

/// Indices within the last `sr_lookback` bars whose volume exceeds
/// `volume_multiplier` times the mean of the preceding `volume_window` bars.
pub fn high_volume_bars(series: &TimeSeries, cfg: &AnalysisConfig) -> Vec<usize> {
    let volumes = series.volumes();
    let start = volumes.len().saturating_sub(cfg.sr_lookback);
    (start..volumes.len())
        .filter(|&i| {
            trailing_mean(&volumes, i, cfg.volume_window)
                .is_some_and(|avg| avg > 0.0 && volumes[i] > cfg.volume_multiplier * avg)
        })
        .collect()
}

/// Multiples of [`round_number_step`] within `band` of `price`.
pub fn round_numbers(price: f64, band: f64) -> impl Iterator<Item = f64> {
    let step = round_number_step(price);
    let lo = (price * (1.0 - band) / step - 1e-9).ceil() as i64;
    let hi = (price * (1.0 + band) / step + 1e-9).floor() as i64;
    (lo.max(1)..=hi).map(move |k| k as f64 * step)
}
