//! Symbol universe: list parsing, market data loading and batch screening.
//!
//! Loading goes through the `DataPort` one symbol at a time. Screening the
//! loaded markets is pure and runs on the rayon pool; one symbol's failure
//! is recorded as a [`SkippedSymbol`] and never affects another.

use crate::domain::config::ScreenerConfig;
use crate::domain::error::ScreenerError;
use crate::domain::pipeline::{SymbolScreening, screen_symbol};
use crate::domain::prescreen;
use crate::domain::summary::{ScreeningReport, ScreeningSummary};
use crate::domain::timeseries::{MarketData, TimeSeries, Timeframe};
use crate::ports::data_port::DataPort;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),

    #[error("no symbols to screen")]
    Empty,

    #[error("all symbols failed to load")]
    AllSymbolsFailed,
}

pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipStage {
    Load,
    Prescreen,
    Screen,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub stage: SkipStage,
    pub reason: String,
}

/// Loads daily plus every requested timeframe for one symbol.
///
/// Daily data is mandatory. A finer or coarser timeframe that fails to load
/// is logged and left out.
pub fn load_market_data(
    port: &dyn DataPort,
    symbol: &str,
    timeframes: &[Timeframe],
) -> Result<MarketData, ScreenerError> {
    let daily = TimeSeries::new(Timeframe::Daily, port.fetch_bars(symbol, Timeframe::Daily)?)?;
    if daily.is_empty() {
        return Err(ScreenerError::NoData {
            symbol: symbol.to_string(),
        });
    }
    let mut market = MarketData::new(symbol).with_series(daily);

    for &timeframe in timeframes.iter().filter(|&&tf| tf != Timeframe::Daily) {
        let loaded = port
            .fetch_bars(symbol, timeframe)
            .and_then(|bars| TimeSeries::new(timeframe, bars));
        match loaded {
            Ok(series) => market.insert(series),
            Err(e) => warn!(symbol, %timeframe, error = %e, "skipping timeframe"),
        }
    }
    Ok(market)
}

/// Result of screening already-loaded markets.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub screenings: Vec<SymbolScreening>,
    pub skipped: Vec<SkippedSymbol>,
}

/// Prescreens and screens every market in parallel. Output follows input
/// order.
pub fn screen_markets(
    markets: &[MarketData],
    config: &ScreenerConfig,
    created_at: DateTime<Utc>,
) -> BatchOutcome {
    let results: Vec<Result<SymbolScreening, SkippedSymbol>> = markets
        .par_iter()
        .map(|market| screen_one(market, config, created_at))
        .collect();

    let mut outcome = BatchOutcome::default();
    for result in results {
        match result {
            Ok(screening) => outcome.screenings.push(screening),
            Err(skipped) => {
                warn!(symbol = %skipped.symbol, stage = ?skipped.stage, reason = %skipped.reason, "skipping symbol");
                outcome.skipped.push(skipped);
            }
        }
    }
    outcome
}

fn screen_one(
    market: &MarketData,
    config: &ScreenerConfig,
    created_at: DateTime<Utc>,
) -> Result<SymbolScreening, SkippedSymbol> {
    let skip = |stage: SkipStage, reason: String| SkippedSymbol {
        symbol: market.symbol.clone(),
        stage,
        reason,
    };
    if config.prescreen.enabled {
        let daily = market
            .daily()
            .ok_or_else(|| skip(SkipStage::Prescreen, "no daily bars".to_string()))?;
        prescreen::passes(daily, &config.prescreen)
            .map_err(|e| skip(SkipStage::Prescreen, e.to_string()))?;
    }
    screen_symbol(market, config, created_at).map_err(|e| skip(SkipStage::Screen, e.to_string()))
}

/// Loads, prescreens and screens a symbol universe, then assembles the
/// report with accepted opportunities ordered by confluence, highest first.
pub fn screen_universe(
    port: &dyn DataPort,
    symbols: &[String],
    config: &ScreenerConfig,
    created_at: DateTime<Utc>,
) -> Result<ScreeningReport, ScreenerError> {
    if symbols.is_empty() {
        return Err(UniverseError::Empty.into());
    }

    let mut markets = Vec::with_capacity(symbols.len());
    let mut load_failures = Vec::new();
    for symbol in symbols {
        match load_market_data(port, symbol, &config.data.timeframes) {
            Ok(market) => markets.push(market),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "skipping symbol");
                load_failures.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    stage: SkipStage::Load,
                    reason: e.to_string(),
                });
            }
        }
    }
    if markets.is_empty() {
        return Err(UniverseError::AllSymbolsFailed.into());
    }
    info!(loaded = markets.len(), requested = symbols.len(), "market data loaded");

    let outcome = screen_markets(&markets, config, created_at);
    Ok(assemble_report(
        symbols.len(),
        outcome,
        load_failures,
        created_at,
    ))
}

pub fn assemble_report(
    symbols_requested: usize,
    outcome: BatchOutcome,
    mut skipped: Vec<SkippedSymbol>,
    generated_at: DateTime<Utc>,
) -> ScreeningReport {
    skipped.extend(outcome.skipped);
    let symbols_screened = outcome.screenings.len();
    let mut zones_found = 0;
    let mut opportunities = Vec::new();
    let mut rejected = Vec::new();
    for screening in outcome.screenings {
        zones_found += screening.zones.len();
        opportunities.extend(screening.accepted);
        rejected.extend(screening.rejected);
    }
    // stable: equal scores keep symbol order
    opportunities.sort_by(|a, b| b.confluence_score.total_cmp(&a.confluence_score));

    ScreeningReport {
        generated_at,
        symbols_requested,
        symbols_screened,
        zones_found,
        summary: ScreeningSummary::compute(&opportunities),
        opportunities,
        rejected,
        skipped,
    }
}
