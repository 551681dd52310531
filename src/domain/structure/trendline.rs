//! Trendlines fitted through pairs of pivots.

use super::pivot::{Pivot, PivotKind, find_pivots};
use crate::domain::config::AnalysisConfig;
use crate::domain::error::AnalysisError;
use crate::domain::stats::near;
use crate::domain::timeseries::TimeSeries;
use serde::Serialize;

/// Relative slope per bar below which a line is called horizontal.
const HORIZONTAL_EPSILON: f64 = 1e-4;

/// Touch count at which the touch component of strength saturates.
const TOUCH_SATURATION: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendlineRole {
    Support,
    Resistance,
}

impl TrendlineRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendlineRole::Support => "support",
            TrendlineRole::Resistance => "resistance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineDirection {
    Ascending,
    Descending,
    Horizontal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trendline {
    pub role: TrendlineRole,
    pub start: Pivot,
    pub end: Pivot,
    pub slope: f64,
    pub intercept: f64,
    pub touches: usize,
    pub span: usize,
    pub strength: f64,
    pub direction: LineDirection,
    /// Line value at the last bar of the fitted series.
    pub current_level: f64,
}

impl Trendline {
    /// Line value at bar `index` of the series it was fitted on.
    pub fn value_at(&self, index: usize) -> f64 {
        self.intercept + self.slope * index as f64
    }
}

pub fn detect_trendlines(
    series: &TimeSeries,
    cfg: &AnalysisConfig,
) -> Result<Vec<Trendline>, AnalysisError> {
    if series.len() < cfg.min_bars {
        return Err(AnalysisError::InsufficientData {
            need: cfg.min_bars,
            have: series.len(),
        });
    }

    let highs = series.highs();
    let lows = series.lows();
    let mut lines = Vec::new();

    for (role, wicks, kind) in [
        (TrendlineRole::Support, &lows, PivotKind::Low),
        (TrendlineRole::Resistance, &highs, PivotKind::High),
    ] {
        let pivots = find_pivots(wicks, cfg.pivot_order, kind);
        for (a_pos, a) in pivots.iter().enumerate() {
            for b in &pivots[a_pos + 1..] {
                if let Some(line) = fit_line(role, a, b, wicks, cfg) {
                    lines.push(line);
                }
            }
        }
    }

    lines.sort_by(|x, y| {
        y.touches
            .cmp(&x.touches)
            .then(y.span.cmp(&x.span))
            .then(x.start.index.cmp(&y.start.index))
            .then(x.end.index.cmp(&y.end.index))
            .then(x.role.cmp(&y.role))
    });
    Ok(lines)
}

fn fit_line(
    role: TrendlineRole,
    a: &Pivot,
    b: &Pivot,
    wicks: &[f64],
    cfg: &AnalysisConfig,
) -> Option<Trendline> {
    let span = b.index - a.index;
    let slope = (b.price - a.price) / span as f64;
    let intercept = a.price - slope * a.index as f64;
    let at = |i: usize| intercept + slope * i as f64;

    let mut touches = 0;
    for i in a.index..=b.index {
        let value = at(i);
        if !value.is_finite() || value <= 0.0 {
            return None;
        }
        if near(wicks[i], value, cfg.trendline_tolerance) {
            touches += 1;
        }
    }
    if touches < cfg.min_trendline_touches {
        return None;
    }

    let len = wicks.len() as f64;
    let touch_score = (touches as f64 / TOUCH_SATURATION).min(1.0);
    let strength = 0.75 * touch_score + 0.25 * span as f64 / len;

    let mid = (a.price + b.price) / 2.0;
    let direction = if (slope / mid).abs() < HORIZONTAL_EPSILON {
        LineDirection::Horizontal
    } else if slope > 0.0 {
        LineDirection::Ascending
    } else {
        LineDirection::Descending
    };

    Some(Trendline {
        role,
        start: *a,
        end: *b,
        slope,
        intercept,
        touches,
        span,
        strength,
        direction,
        current_level: at(wicks.len() - 1),
    })
}
