//! Model 2: trendline break, retest of the zone and rejection wick on the
//! confirmation timeframe.
//!
//! The evaluation is an explicit state machine over the confirmation bars:
//!
//! ```text
//! NoBreak -> Broken -> Retesting -> Confirmed
//!               \          \
//!                +----------+----> Expired
//! ```
//!
//! `Expired` is terminal: once more than `retest_window` bars pass after the
//! break without a rejection, later bars cannot confirm the setup.

use super::{EntryContext, derive_stop, derive_target, trend_aligned, zone_direction};
use crate::domain::config::TradingConfig;
use crate::domain::confluence::LiquidityZone;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::opportunity::{EntryModel, TradeDirection, TradingOpportunity};
use crate::domain::structure::{Trendline, TrendlineRole};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RetestState {
    NoBreak,
    Broken { break_index: usize },
    Retesting { break_index: usize, retest_index: usize },
    Confirmed { break_index: usize, confirm_index: usize, entry: f64 },
    Expired { break_index: usize },
}

impl RetestState {
    fn rank(&self) -> u8 {
        match self {
            RetestState::NoBreak => 0,
            RetestState::Expired { .. } => 1,
            RetestState::Broken { .. } => 2,
            RetestState::Retesting { .. } => 3,
            RetestState::Confirmed { .. } => 4,
        }
    }

    fn on_bar(
        self,
        index: usize,
        bar: &OhlcvBar,
        zone: &LiquidityZone,
        direction: TradeDirection,
        trading: &TradingConfig,
    ) -> RetestState {
        let break_index = match self {
            RetestState::Broken { break_index } | RetestState::Retesting { break_index, .. } => {
                break_index
            }
            terminal => return terminal,
        };
        if index - break_index > trading.retest_window {
            return RetestState::Expired { break_index };
        }

        let band_low = zone.price * (1.0 - trading.retest_tolerance);
        let band_high = zone.price * (1.0 + trading.retest_tolerance);
        if !bar.overlaps(band_low, band_high) {
            return self;
        }
        if is_rejection(bar, zone.price, direction, trading.wick_body_ratio) {
            return RetestState::Confirmed {
                break_index,
                confirm_index: index,
                entry: bar.close,
            };
        }
        match self {
            RetestState::Retesting { .. } => self,
            _ => RetestState::Retesting {
                break_index,
                retest_index: index,
            },
        }
    }
}

/// Wick toward the zone at least `ratio` times the body, closing back on
/// the trade side of the zone.
fn is_rejection(bar: &OhlcvBar, zone_price: f64, direction: TradeDirection, ratio: f64) -> bool {
    let body = bar.body();
    match direction {
        TradeDirection::Long => {
            let wick = bar.lower_wick();
            wick > 0.0 && wick >= ratio * body && bar.close >= zone_price
        }
        TradeDirection::Short => {
            let wick = bar.upper_wick();
            wick > 0.0 && wick >= ratio * body && bar.close <= zone_price
        }
    }
}

/// First fresh close through `line` (beyond `break_buffer`) within the last
/// `break_lookback` bars and after the line's second pivot.
fn find_break(
    line: &Trendline,
    bars: &[OhlcvBar],
    direction: TradeDirection,
    trading: &TradingConfig,
) -> Option<usize> {
    let n = bars.len();
    let first = (line.end.index + 1)
        .max(n.saturating_sub(trading.break_lookback))
        .max(1);
    (first..n).find(|&k| {
        let (now, before) = (line.value_at(k), line.value_at(k - 1));
        match direction {
            TradeDirection::Long => {
                bars[k].close > now * (1.0 + trading.break_buffer) && bars[k - 1].close <= before
            }
            TradeDirection::Short => {
                bars[k].close < now * (1.0 - trading.break_buffer) && bars[k - 1].close >= before
            }
        }
    })
}

/// Runs the state machine for one trendline.
pub fn evaluate_retest(
    line: &Trendline,
    bars: &[OhlcvBar],
    zone: &LiquidityZone,
    direction: TradeDirection,
    trading: &TradingConfig,
) -> RetestState {
    let wanted = match direction {
        TradeDirection::Long => TrendlineRole::Resistance,
        TradeDirection::Short => TrendlineRole::Support,
    };
    if line.role != wanted {
        return RetestState::NoBreak;
    }
    let Some(break_index) = find_break(line, bars, direction, trading) else {
        return RetestState::NoBreak;
    };

    let mut state = RetestState::Broken { break_index };
    for (index, bar) in bars.iter().enumerate().skip(break_index + 1) {
        state = state.on_bar(index, bar, zone, direction, trading);
        if matches!(
            state,
            RetestState::Confirmed { .. } | RetestState::Expired { .. }
        ) {
            break;
        }
    }
    state
}

/// Model 2 candidate for `zone`, if the zone agrees with the daily trend and
/// any trendline on the confirmation timeframe reaches `Confirmed`.
pub fn evaluate_confirmation(
    zone: &LiquidityZone,
    ctx: &EntryContext<'_>,
    trading: &TradingConfig,
) -> Option<TradingOpportunity> {
    let view = ctx.confirmation?;
    let distance = (ctx.current_price - zone.price).abs() / ctx.current_price;
    if distance > trading.model2_distance_tolerance {
        return None;
    }
    if !trend_aligned(ctx.trend, zone.kind) {
        debug!(symbol = ctx.symbol, zone = zone.price, trend = ?ctx.trend, "model 2 against trend");
        return None;
    }
    let direction = zone_direction(zone.kind);
    let bars = view.series.bars();

    let mut best: Option<(RetestState, &Trendline)> = None;
    for line in &view.lines {
        let state = evaluate_retest(line, bars, zone, direction, trading);
        if best.is_none_or(|(b, _)| state.rank() > b.rank()) {
            best = Some((state, line));
        }
    }
    let (state, line) = best?;
    debug!(symbol = ctx.symbol, zone = zone.price, ?state, "model 2 state");

    let RetestState::Confirmed { entry, .. } = state else {
        return None;
    };
    let stop = derive_stop(direction, entry, zone, ctx.daily, trading)?;
    let (target, risk_reward) = derive_target(direction, entry, stop, ctx.target_levels, trading)?;

    let mut confirmations = zone.tags();
    confirmations.push(format!("trendline_break:{}", line.role.as_str()));

    Some(TradingOpportunity {
        symbol: ctx.symbol.to_string(),
        model: EntryModel::Confirmation,
        direction,
        entry,
        stop,
        target,
        risk_reward,
        confluence_score: zone.score + 1.0,
        zone_price: zone.price,
        confirmations,
        notes: vec![format!(
            "{} {} line broken, zone {:.2} retested with rejection",
            view.series.timeframe(),
            line.role.as_str(),
            zone.price
        )],
        timeframes: ctx.timeframes.to_vec(),
        created_at: ctx.created_at,
    })
}
