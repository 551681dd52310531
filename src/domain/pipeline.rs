//! Per-symbol screening pipeline.
//!
//! Structure analysis on every timeframe, zone building, both entry models
//! and validation. A pure function of the market data, configuration and
//! creation timestamp.

use crate::domain::config::ScreenerConfig;
use crate::domain::confluence::{LiquidityZone, build_zones};
use crate::domain::entry::{ConfirmationView, EntryContext, evaluate_entries};
use crate::domain::error::ScreenerError;
use crate::domain::opportunity::{TimeframeSummary, TradingOpportunity};
use crate::domain::structure::{StructureAnalysis, analyze, detect_trendlines};
use crate::domain::timeseries::{MarketData, Timeframe};
use crate::domain::validator::{RejectionReason, validate};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedOpportunity {
    pub opportunity: TradingOpportunity,
    pub reason: RejectionReason,
}

#[derive(Debug, Clone)]
pub struct SymbolScreening {
    pub symbol: String,
    pub current_price: f64,
    pub analyses: Vec<StructureAnalysis>,
    pub timeframes: Vec<TimeframeSummary>,
    pub zones: Vec<LiquidityZone>,
    pub accepted: Vec<TradingOpportunity>,
    pub rejected: Vec<RejectedOpportunity>,
}

impl SymbolScreening {
    pub fn analysis(&self, timeframe: Timeframe) -> Option<&StructureAnalysis> {
        self.analyses.iter().find(|a| a.timeframe == timeframe)
    }
}

pub fn screen_symbol(
    market: &MarketData,
    config: &ScreenerConfig,
    created_at: DateTime<Utc>,
) -> Result<SymbolScreening, ScreenerError> {
    let symbol = market.symbol.as_str();
    let daily = market.daily().ok_or_else(|| ScreenerError::NoData {
        symbol: symbol.to_string(),
    })?;
    if daily.len() < config.analysis.min_bars {
        return Err(ScreenerError::InsufficientData {
            symbol: symbol.to_string(),
            bars: daily.len(),
            minimum: config.analysis.min_bars,
        });
    }
    let current_price = market.current_price().ok_or_else(|| ScreenerError::NoData {
        symbol: symbol.to_string(),
    })?;

    let analyses: Vec<StructureAnalysis> = market
        .timeframes()
        .map(|(_, series)| analyze(series, &config.analysis))
        .collect();
    for analysis in &analyses {
        if let Err(e) = &analysis.structure {
            warn!(symbol, timeframe = %analysis.timeframe, error = %e, "structure not computable");
        }
    }

    let timeframes: Vec<TimeframeSummary> = market
        .timeframes()
        .zip(&analyses)
        .filter_map(|((_, series), analysis)| TimeframeSummary::from_analysis(series, analysis))
        .collect();

    let zones = build_zones(market, &analyses, &config.analysis);
    info!(symbol, current_price, zones = zones.len(), "zones built");

    let daily_analysis = analyses.iter().find(|a| a.timeframe == Timeframe::Daily);
    let trend = daily_analysis.and_then(StructureAnalysis::trend);
    let quality = daily_analysis.and_then(StructureAnalysis::quality);

    let target_levels: Vec<f64> = analyses
        .iter()
        .filter(|a| config.analysis.zone_timeframes.contains(&a.timeframe))
        .flat_map(|a| a.level_slice().iter().map(|l| l.price))
        .collect();

    let confirmation = market
        .get(config.trading.confirmation_timeframe)
        .map(|series| {
            let series = series.tail(config.trading.model2_history);
            let lines = detect_trendlines(&series, &config.analysis).unwrap_or_default();
            ConfirmationView { series, lines }
        });

    let ctx = EntryContext {
        symbol,
        current_price,
        trend,
        daily,
        confirmation: confirmation.as_ref(),
        target_levels: &target_levels,
        timeframes: &timeframes,
        created_at,
    };

    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for opportunity in evaluate_entries(&ctx, &zones, &config.trading) {
        match validate(
            &opportunity,
            quality,
            &config.trading,
            config.analysis.min_confluence_score,
        ) {
            Ok(()) => accepted.push(opportunity),
            Err(reason) => {
                debug!(symbol, model = %opportunity.model, %reason, "opportunity rejected");
                rejected.push(RejectedOpportunity {
                    opportunity,
                    reason,
                });
            }
        }
    }
    info!(
        symbol,
        accepted = accepted.len(),
        rejected = rejected.len(),
        "screening complete"
    );

    Ok(SymbolScreening {
        symbol: symbol.to_string(),
        current_price,
        analyses,
        timeframes,
        zones,
        accepted,
        rejected,
    })
}
