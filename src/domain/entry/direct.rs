//! Model 1: direct entry at a zone that agrees with the daily trend.

use super::{EntryContext, derive_stop, derive_target, trend_aligned, zone_direction};
use crate::domain::config::TradingConfig;
use crate::domain::confluence::LiquidityZone;
use crate::domain::opportunity::{EntryModel, TradeDirection, TradingOpportunity};
use crate::domain::structure::Trend;

#[derive(Debug, Clone, PartialEq)]
pub enum DirectOutcome {
    Qualified(Box<TradingOpportunity>),
    Rejected(DirectRejection),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DirectRejection {
    #[error("zone {distance:.4} away from price, limit {limit}")]
    TooFar { distance: f64, limit: f64 },

    #[error("zone does not align with {trend:?} trend")]
    TrendMismatch { trend: Option<Trend> },

    #[error("no stop beyond the zone")]
    NoStop,

    #[error("no target meets the minimum risk-reward")]
    NoTarget,
}

pub fn evaluate_direct(
    zone: &LiquidityZone,
    ctx: &EntryContext<'_>,
    trading: &TradingConfig,
) -> DirectOutcome {
    let distance = (ctx.current_price - zone.price).abs() / ctx.current_price;
    if distance > trading.model1_distance_tolerance {
        return DirectOutcome::Rejected(DirectRejection::TooFar {
            distance,
            limit: trading.model1_distance_tolerance,
        });
    }

    if !trend_aligned(ctx.trend, zone.kind) {
        return DirectOutcome::Rejected(DirectRejection::TrendMismatch { trend: ctx.trend });
    }
    let direction = zone_direction(zone.kind);
    let entry = zone.price;

    let Some(stop) = derive_stop(direction, entry, zone, ctx.daily, trading) else {
        return DirectOutcome::Rejected(DirectRejection::NoStop);
    };
    let Some((target, risk_reward)) =
        derive_target(direction, entry, stop, ctx.target_levels, trading)
    else {
        return DirectOutcome::Rejected(DirectRejection::NoTarget);
    };

    let side = match direction {
        TradeDirection::Long => "support",
        TradeDirection::Short => "resistance",
    };
    DirectOutcome::Qualified(Box::new(TradingOpportunity {
        symbol: ctx.symbol.to_string(),
        model: EntryModel::Direct,
        direction,
        entry,
        stop,
        target,
        risk_reward,
        confluence_score: zone.score,
        zone_price: zone.price,
        confirmations: zone.tags(),
        notes: vec![format!(
            "limit entry at {} zone {:.2} ({} confirmations)",
            side,
            zone.price,
            zone.confirmation_count()
        )],
        timeframes: ctx.timeframes.to_vec(),
        created_at: ctx.created_at,
    }))
}
