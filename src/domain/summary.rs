//! Summary statistics over a screening run and the report document.

use super::opportunity::{EntryModel, TradeDirection, TradingOpportunity};
use super::pipeline::RejectedOpportunity;
use super::stats::mean;
use super::universe::SkippedSymbol;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestOpportunity {
    pub symbol: String,
    pub model: EntryModel,
    pub direction: TradeDirection,
    pub confluence_score: f64,
    pub risk_reward: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningSummary {
    pub total: usize,
    pub direct: usize,
    pub confirmation: usize,
    pub long: usize,
    pub short: usize,
    pub avg_risk_reward: f64,
    pub avg_confluence: f64,
    pub avg_risk_pct: f64,
    pub avg_reward_pct: f64,
    pub best: Option<BestOpportunity>,
}

impl ScreeningSummary {
    pub fn compute(opportunities: &[TradingOpportunity]) -> Self {
        let direct = opportunities
            .iter()
            .filter(|o| o.model == EntryModel::Direct)
            .count();
        let long = opportunities
            .iter()
            .filter(|o| o.direction == TradeDirection::Long)
            .count();

        let average = |f: fn(&TradingOpportunity) -> f64| -> f64 {
            let values: Vec<f64> = opportunities.iter().map(f).collect();
            mean(&values).unwrap_or(0.0)
        };

        // highest confluence, then highest R:R; first wins on a full tie
        let best = opportunities
            .iter()
            .reduce(|best, o| match compare_rank(o, best) {
                Ordering::Greater => o,
                _ => best,
            })
            .map(|o| BestOpportunity {
                symbol: o.symbol.clone(),
                model: o.model,
                direction: o.direction,
                confluence_score: o.confluence_score,
                risk_reward: o.risk_reward,
            });

        ScreeningSummary {
            total: opportunities.len(),
            direct,
            confirmation: opportunities.len() - direct,
            long,
            short: opportunities.len() - long,
            avg_risk_reward: average(|o| o.risk_reward),
            avg_confluence: average(|o| o.confluence_score),
            avg_risk_pct: average(TradingOpportunity::risk_pct),
            avg_reward_pct: average(TradingOpportunity::reward_pct),
            best,
        }
    }
}

fn compare_rank(a: &TradingOpportunity, b: &TradingOpportunity) -> Ordering {
    a.confluence_score
        .total_cmp(&b.confluence_score)
        .then(a.risk_reward.total_cmp(&b.risk_reward))
}

/// Everything a report adapter renders for one screening run.
#[derive(Debug, Clone, Serialize)]
pub struct ScreeningReport {
    pub generated_at: DateTime<Utc>,
    pub symbols_requested: usize,
    pub symbols_screened: usize,
    pub zones_found: usize,
    pub summary: ScreeningSummary,
    pub opportunities: Vec<TradingOpportunity>,
    pub rejected: Vec<RejectedOpportunity>,
    pub skipped: Vec<SkippedSymbol>,
}
