//! Trade proposals and the per-timeframe context attached to them.

use crate::domain::stats::tail_mean;
use crate::domain::structure::{StructureAnalysis, StructureQuality, Trend};
use crate::domain::timeseries::{TimeSeries, Timeframe};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    Long,
    Short,
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TradeDirection::Long => "LONG",
            TradeDirection::Short => "SHORT",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryModel {
    /// Model 1: limit entry at the zone.
    Direct,
    /// Model 2: trendline break, retest and rejection on a lower timeframe.
    Confirmation,
}

impl fmt::Display for EntryModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntryModel::Direct => "Model 1 (direct)",
            EntryModel::Confirmation => "Model 2 (confirmation)",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeTrend {
    Increasing,
    Decreasing,
}

const SHORT_VOLUME_WINDOW: usize = 5;
const LONG_VOLUME_WINDOW: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeframeSummary {
    pub timeframe: Timeframe,
    pub trend: Option<Trend>,
    pub quality: Option<StructureQuality>,
    pub last_close: f64,
    pub volume_trend: Option<VolumeTrend>,
}

impl TimeframeSummary {
    pub fn from_analysis(series: &TimeSeries, analysis: &StructureAnalysis) -> Option<Self> {
        let last = series.last()?;
        let volumes = series.volumes();
        let volume_trend = if volumes.len() >= LONG_VOLUME_WINDOW {
            match (
                tail_mean(&volumes, SHORT_VOLUME_WINDOW),
                tail_mean(&volumes, LONG_VOLUME_WINDOW),
            ) {
                (Some(recent), Some(base)) if recent > base => Some(VolumeTrend::Increasing),
                (Some(_), Some(_)) => Some(VolumeTrend::Decreasing),
                _ => None,
            }
        } else {
            None
        };

        Some(TimeframeSummary {
            timeframe: series.timeframe(),
            trend: analysis.trend(),
            quality: analysis.quality(),
            last_close: last.close,
            volume_trend,
        })
    }
}

/// A proposed trade. Built once by an entry model and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradingOpportunity {
    pub symbol: String,
    pub model: EntryModel,
    pub direction: TradeDirection,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    pub risk_reward: f64,
    pub confluence_score: f64,
    pub zone_price: f64,
    pub confirmations: Vec<String>,
    pub notes: Vec<String>,
    pub timeframes: Vec<TimeframeSummary>,
    pub created_at: DateTime<Utc>,
}

impl TradingOpportunity {
    pub fn risk_pct(&self) -> f64 {
        (self.entry - self.stop).abs() / self.entry
    }

    pub fn reward_pct(&self) -> f64 {
        (self.target - self.entry).abs() / self.entry
    }

    /// Stop and target lie on the correct sides of entry.
    pub fn sides_valid(&self) -> bool {
        match self.direction {
            TradeDirection::Long => self.stop < self.entry && self.entry < self.target,
            TradeDirection::Short => self.target < self.entry && self.entry < self.stop,
        }
    }
}
