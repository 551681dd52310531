//! Entry models evaluated against ranked liquidity zones.
//!
//! Both models share the stop/target derivation here. Model 1 lives in
//! [`direct`], the Model 2 break/retest state machine in [`retest`].

pub mod direct;
pub mod retest;

pub use direct::{DirectOutcome, DirectRejection, evaluate_direct};
pub use retest::{RetestState, evaluate_confirmation, evaluate_retest};

use crate::domain::confluence::{LiquidityZone, ZoneKind};
use crate::domain::config::TradingConfig;
use crate::domain::opportunity::{TimeframeSummary, TradeDirection, TradingOpportunity};
use crate::domain::structure::{Trend, Trendline};
use crate::domain::timeseries::TimeSeries;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Tolerance for ratio comparisons against configured minimums.
pub const RATIO_EPSILON: f64 = 1e-9;

/// Lower-timeframe bars and the trendlines fitted on exactly those bars.
#[derive(Debug, Clone)]
pub struct ConfirmationView {
    pub series: TimeSeries,
    pub lines: Vec<Trendline>,
}

/// Everything the entry models need besides the zones.
#[derive(Debug, Clone)]
pub struct EntryContext<'a> {
    pub symbol: &'a str,
    pub current_price: f64,
    pub trend: Option<Trend>,
    pub daily: &'a TimeSeries,
    pub confirmation: Option<&'a ConfirmationView>,
    /// Level prices usable as profit targets.
    pub target_levels: &'a [f64],
    pub timeframes: &'a [TimeframeSummary],
    pub created_at: DateTime<Utc>,
}

/// `|target - entry| / |entry - stop|` when stop and target sit on the
/// correct sides of entry for `direction` and the ratio is finite.
pub fn risk_reward(direction: TradeDirection, entry: f64, stop: f64, target: f64) -> Option<f64> {
    let sides_ok = match direction {
        TradeDirection::Long => stop < entry && entry < target,
        TradeDirection::Short => target < entry && entry < stop,
    };
    if !sides_ok {
        return None;
    }
    let rr = (target - entry).abs() / (entry - stop).abs();
    (rr.is_finite() && rr > 0.0).then_some(rr)
}

/// Longs only at support in a bullish trend, shorts only at resistance in a
/// bearish one. An unknown or sideways trend aligns with nothing.
pub fn trend_aligned(trend: Option<Trend>, kind: ZoneKind) -> bool {
    matches!(
        (trend, kind),
        (Some(Trend::Bullish), ZoneKind::Support) | (Some(Trend::Bearish), ZoneKind::Resistance)
    )
}

pub fn zone_direction(kind: ZoneKind) -> TradeDirection {
    match kind {
        ZoneKind::Support => TradeDirection::Long,
        ZoneKind::Resistance => TradeDirection::Short,
    }
}

/// Protective stop beyond the zone.
///
/// Candidates are the zone's far edge, the recent swing extreme and the
/// zone's trendline anchors, each pushed out by `stop_buffer`. Only those at
/// or beyond the far edge qualify; the one nearest entry wins.
pub fn derive_stop(
    direction: TradeDirection,
    entry: f64,
    zone: &LiquidityZone,
    daily: &TimeSeries,
    trading: &TradingConfig,
) -> Option<f64> {
    let recent = daily.tail(trading.swing_lookback);
    let buffer = trading.stop_buffer;

    match direction {
        TradeDirection::Long => {
            let far_edge = zone.lower_edge();
            let swing = recent.lows().into_iter().reduce(f64::min);
            std::iter::once(far_edge)
                .chain(swing)
                .chain(zone.anchors.iter().copied())
                .map(|p| p * (1.0 - buffer))
                .filter(|&s| s.is_finite() && s > 0.0 && s <= far_edge && s < entry)
                .reduce(f64::max)
        }
        TradeDirection::Short => {
            let far_edge = zone.upper_edge();
            let swing = recent.highs().into_iter().reduce(f64::max);
            std::iter::once(far_edge)
                .chain(swing)
                .chain(zone.anchors.iter().copied())
                .map(|p| p * (1.0 + buffer))
                .filter(|&s| s.is_finite() && s >= far_edge && s > entry)
                .reduce(f64::min)
        }
    }
}

/// Nearest target meeting the minimum risk-reward, with its ratio.
///
/// Candidates are opposing levels at least `min_target_gap` beyond entry
/// plus the fixed `target_risk_multiple` of risk.
pub fn derive_target(
    direction: TradeDirection,
    entry: f64,
    stop: f64,
    levels: &[f64],
    trading: &TradingConfig,
) -> Option<(f64, f64)> {
    let risk = (entry - stop).abs();
    let (fixed, gap_price) = match direction {
        TradeDirection::Long => (
            entry + risk * trading.target_risk_multiple,
            entry * (1.0 + trading.min_target_gap),
        ),
        TradeDirection::Short => (
            entry - risk * trading.target_risk_multiple,
            entry * (1.0 - trading.min_target_gap),
        ),
    };
    let beyond = |p: f64| match direction {
        TradeDirection::Long => p >= gap_price,
        TradeDirection::Short => p <= gap_price,
    };

    let mut candidates: Vec<f64> = levels
        .iter()
        .copied()
        .filter(|&p| p.is_finite() && p > 0.0 && beyond(p))
        .chain(std::iter::once(fixed))
        .collect();
    candidates.sort_by(|a, b| (a - entry).abs().total_cmp(&(b - entry).abs()));

    candidates.into_iter().find_map(|target| {
        risk_reward(direction, entry, stop, target)
            .filter(|&rr| rr + RATIO_EPSILON >= trading.min_risk_reward)
            .map(|rr| (target, rr))
    })
}

/// Pre-validation candidates: zones in rank order, Model 1 before Model 2
/// within each zone.
pub fn evaluate_entries(
    ctx: &EntryContext<'_>,
    zones: &[LiquidityZone],
    trading: &TradingConfig,
) -> Vec<TradingOpportunity> {
    let mut out = Vec::new();
    for zone in zones {
        match evaluate_direct(zone, ctx, trading) {
            DirectOutcome::Qualified(opp) => out.push(*opp),
            DirectOutcome::Rejected(reason) => {
                debug!(symbol = ctx.symbol, zone = zone.price, %reason, "model 1 rejected");
            }
        }
        if let Some(opp) = evaluate_confirmation(zone, ctx, trading) {
            out.push(opp);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use crate::domain::timeseries::Timeframe;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn flat_daily(low: f64, high: f64) -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = (0..15)
            .map(|i| OhlcvBar {
                timestamp: start + Duration::days(i),
                open: (low + high) / 2.0,
                high,
                low,
                close: (low + high) / 2.0,
                volume: 1000,
            })
            .collect();
        TimeSeries::new(Timeframe::Daily, bars).unwrap()
    }

    fn zone(price: f64, kind: ZoneKind) -> LiquidityZone {
        LiquidityZone {
            price,
            kind,
            width: 0.02,
            confirmations: vec![],
            score: 6.0,
            distance: 0.0,
            anchors: vec![],
        }
    }

    #[test]
    fn risk_reward_requires_correct_sides() {
        assert_relative_eq!(
            risk_reward(TradeDirection::Long, 100.0, 95.0, 110.0).unwrap(),
            2.0
        );
        assert_relative_eq!(
            risk_reward(TradeDirection::Short, 100.0, 105.0, 85.0).unwrap(),
            3.0
        );
        assert_eq!(risk_reward(TradeDirection::Long, 100.0, 105.0, 110.0), None);
        assert_eq!(risk_reward(TradeDirection::Short, 100.0, 95.0, 90.0), None);
        assert_eq!(risk_reward(TradeDirection::Long, 100.0, 100.0, 110.0), None);
    }

    #[test]
    fn long_stop_sits_below_far_edge() {
        // swing low 90 is further away than the zone edge
        let daily = flat_daily(90.0, 110.0);
        let z = zone(100.0, ZoneKind::Support);
        let stop = derive_stop(TradeDirection::Long, 100.0, &z, &daily, &TradingConfig::default())
            .unwrap();
        assert_relative_eq!(stop, 98.0 * 0.995, epsilon = 1e-9);
    }

    #[test]
    fn anchor_inside_zone_does_not_qualify() {
        let daily = flat_daily(90.0, 110.0);
        let mut z = zone(100.0, ZoneKind::Support);
        z.anchors = vec![99.5, 97.0];
        let stop = derive_stop(TradeDirection::Long, 100.0, &z, &daily, &TradingConfig::default())
            .unwrap();
        // 99.5 moved by the buffer is still above the edge at 98; 97 qualifies but
        // the edge itself is nearer
        assert_relative_eq!(stop, 98.0 * 0.995, epsilon = 1e-9);
    }

    #[test]
    fn short_stop_sits_above_far_edge() {
        let daily = flat_daily(90.0, 110.0);
        let z = zone(100.0, ZoneKind::Resistance);
        let stop = derive_stop(TradeDirection::Short, 100.0, &z, &daily, &TradingConfig::default())
            .unwrap();
        assert_relative_eq!(stop, 102.0 * 1.005, epsilon = 1e-9);
    }

    #[test]
    fn target_prefers_nearest_qualifying_level() {
        let trading = TradingConfig::default();
        // risk 5: 108 gives 1.6, 112 gives 2.4, fixed multiple gives 110
        let (target, rr) =
            derive_target(TradeDirection::Long, 100.0, 95.0, &[108.0, 112.0, 90.0], &trading)
                .unwrap();
        assert_relative_eq!(target, 110.0);
        assert_relative_eq!(rr, 2.0, epsilon = 1e-9);

        let (target, _) =
            derive_target(TradeDirection::Long, 100.0, 95.0, &[111.0], &trading).unwrap();
        assert_relative_eq!(target, 110.0);
    }

    #[test]
    fn short_target_below_entry() {
        let trading = TradingConfig::default();
        let (target, rr) =
            derive_target(TradeDirection::Short, 100.0, 104.0, &[91.5, 80.0], &trading).unwrap();
        assert_relative_eq!(target, 92.0);
        assert_relative_eq!(rr, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn level_beats_fixed_target_when_nearer() {
        let trading = TradingConfig {
            min_risk_reward: 1.5,
            ..TradingConfig::default()
        };
        let (target, rr) =
            derive_target(TradeDirection::Long, 100.0, 95.0, &[108.0], &trading).unwrap();
        assert_relative_eq!(target, 108.0);
        assert_relative_eq!(rr, 1.6, epsilon = 1e-9);
    }
}
