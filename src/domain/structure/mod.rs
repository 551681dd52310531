//! Price structure detectors.
//!
//! Each detector is a pure function of a [`TimeSeries`] and the analysis
//! configuration. A series that is too short yields
//! [`AnalysisError::InsufficientData`]; an empty `Ok` means the detector ran
//! and found nothing.

pub mod fibonacci;
pub mod level;
pub mod pivot;
pub mod price_structure;
pub mod trendline;

pub use fibonacci::{FibLevel, FibonacciSet, fibonacci_levels};
pub use level::{
    Level, LevelSource, find_levels, high_volume_bars, merge_levels, round_number_step, round_numbers,
};
pub use pivot::{Pivot, PivotKind, find_pivots};
pub use price_structure::{
    PriceStructure, Pullback, StructureQuality, Trend, classify_trend, price_structure,
};
pub use trendline::{LineDirection, Trendline, TrendlineRole, detect_trendlines};

use crate::domain::config::AnalysisConfig;
use crate::domain::error::AnalysisError;
use crate::domain::timeseries::{TimeSeries, Timeframe};

/// All four detectors run over one timeframe. A failure in one detector
/// does not suppress the others.
#[derive(Debug, Clone)]
pub struct StructureAnalysis {
    pub timeframe: Timeframe,
    pub trendlines: Result<Vec<Trendline>, AnalysisError>,
    pub levels: Result<Vec<Level>, AnalysisError>,
    pub fibonacci: Result<FibonacciSet, AnalysisError>,
    pub structure: Result<PriceStructure, AnalysisError>,
}

impl StructureAnalysis {
    pub fn trend(&self) -> Option<Trend> {
        self.structure.as_ref().ok().map(|s| s.trend)
    }

    pub fn quality(&self) -> Option<StructureQuality> {
        self.structure.as_ref().ok().map(|s| s.quality)
    }

    pub fn trendline_slice(&self) -> &[Trendline] {
        self.trendlines.as_deref().unwrap_or(&[])
    }

    pub fn level_slice(&self) -> &[Level] {
        self.levels.as_deref().unwrap_or(&[])
    }

    pub fn fib_slice(&self) -> &[FibLevel] {
        self.fibonacci
            .as_ref()
            .map(|f| f.levels.as_slice())
            .unwrap_or(&[])
    }
}

pub fn analyze(series: &TimeSeries, cfg: &AnalysisConfig) -> StructureAnalysis {
    let structure = price_structure(series, cfg);
    let trend = structure.as_ref().ok().map(|s| s.trend);

    StructureAnalysis {
        timeframe: series.timeframe(),
        trendlines: detect_trendlines(series, cfg),
        levels: find_levels(series, cfg),
        fibonacci: fibonacci_levels(series, trend, cfg),
        structure,
    }
}
