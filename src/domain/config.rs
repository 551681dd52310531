//! Screener configuration.
//!
//! Built once from a [`ConfigPort`], validated, then passed by shared
//! reference through every stage. Every key has a default so an empty
//! section still yields a runnable configuration.

use crate::domain::error::ScreenerError;
use crate::domain::timeseries::Timeframe;
use crate::ports::config_port::ConfigPort;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_FIB_RATIOS: [f64; 5] = [0.236, 0.382, 0.5, 0.618, 0.786];
pub const DEFAULT_ZONE_OFFSETS: [f64; 7] = [0.01, 0.02, 0.03, 0.05, 0.08, 0.10, 0.15];

/// Structure detection and zone building parameters (`[analysis]`).
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub min_bars: usize,
    pub pivot_order: usize,
    pub level_pivot_order: usize,
    pub trendline_tolerance: f64,
    pub min_trendline_touches: usize,
    pub sr_lookback: usize,
    pub volume_multiplier: f64,
    pub volume_window: usize,
    pub round_number_band: f64,
    pub extreme_window: usize,
    pub level_merge_tolerance: f64,
    pub fib_ratios: Vec<f64>,
    pub fib_lookback: usize,
    pub fib_min_range: f64,
    pub trend_window: usize,
    pub volatility_threshold: f64,

    pub zone_timeframes: Vec<Timeframe>,
    pub zone_range: f64,
    pub zone_offsets: Vec<f64>,
    pub zone_width: f64,
    pub min_confirmations: usize,
    pub min_confluence_score: f64,
    pub max_zones: usize,
    pub zone_trendline_tolerance: f64,
    pub zone_trendline_count: usize,
    pub zone_level_tolerance: f64,
    pub zone_level_count: usize,
    pub zone_fib_tolerance: f64,
    pub zone_volume_tolerance: f64,
    pub zone_round_tolerance: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_bars: 20,
            pivot_order: 3,
            level_pivot_order: 2,
            trendline_tolerance: 0.005,
            min_trendline_touches: 2,
            sr_lookback: 50,
            volume_multiplier: 1.5,
            volume_window: 20,
            round_number_band: 0.20,
            extreme_window: 252,
            level_merge_tolerance: 0.02,
            fib_ratios: DEFAULT_FIB_RATIOS.to_vec(),
            fib_lookback: 50,
            fib_min_range: 0.005,
            trend_window: 20,
            volatility_threshold: 0.05,

            zone_timeframes: vec![Timeframe::Weekly, Timeframe::Daily],
            zone_range: 0.15,
            zone_offsets: DEFAULT_ZONE_OFFSETS.to_vec(),
            zone_width: 0.02,
            min_confirmations: 3,
            min_confluence_score: 5.0,
            max_zones: 5,
            zone_trendline_tolerance: 0.02,
            zone_trendline_count: 5,
            zone_level_tolerance: 0.015,
            zone_level_count: 10,
            zone_fib_tolerance: 0.01,
            zone_volume_tolerance: 0.02,
            zone_round_tolerance: 0.005,
        }
    }
}

/// Entry model and risk parameters (`[trading]`).
#[derive(Debug, Clone, PartialEq)]
pub struct TradingConfig {
    pub max_risk_pct: f64,
    pub min_risk_reward: f64,
    pub model1_distance_tolerance: f64,
    pub model2_distance_tolerance: f64,
    pub retest_tolerance: f64,
    pub break_buffer: f64,
    pub break_lookback: usize,
    pub retest_window: usize,
    pub wick_body_ratio: f64,
    pub model2_history: usize,
    pub confirmation_timeframe: Timeframe,
    pub stop_buffer: f64,
    pub swing_lookback: usize,
    pub min_target_gap: f64,
    pub target_risk_multiple: f64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            max_risk_pct: 0.05,
            min_risk_reward: 2.0,
            model1_distance_tolerance: 0.02,
            model2_distance_tolerance: 0.05,
            retest_tolerance: 0.02,
            break_buffer: 0.005,
            break_lookback: 5,
            retest_window: 3,
            wick_body_ratio: 1.5,
            model2_history: 200,
            confirmation_timeframe: Timeframe::Hourly,
            stop_buffer: 0.005,
            swing_lookback: 10,
            min_target_gap: 0.01,
            target_risk_multiple: 2.0,
        }
    }
}

/// Pre-screening thresholds (`[prescreen]`).
#[derive(Debug, Clone, PartialEq)]
pub struct PrescreenConfig {
    pub enabled: bool,
    pub min_price: f64,
    pub max_price: f64,
    pub min_avg_volume: f64,
    pub max_volatility: f64,
    pub max_avg_daily_change: f64,
    pub window: usize,
}

impl Default for PrescreenConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_price: 50.0,
            max_price: 5000.0,
            min_avg_volume: 50_000.0,
            max_volatility: 0.10,
            max_avg_daily_change: 0.15,
            window: 20,
        }
    }
}

/// Where bars come from (`[data]`).
#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub dir: PathBuf,
    pub symbols: Option<String>,
    pub timeframes: Vec<Timeframe>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            symbols: None,
            timeframes: vec![Timeframe::Weekly, Timeframe::Daily, Timeframe::Hourly],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("unknown report format '{}'", other)),
        }
    }
}

/// Report output (`[report]`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportConfig {
    pub format: ReportFormat,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScreenerConfig {
    pub data: DataConfig,
    pub analysis: AnalysisConfig,
    pub trading: TradingConfig,
    pub prescreen: PrescreenConfig,
    pub report: ReportConfig,
}

impl ScreenerConfig {
    pub fn from_port(port: &dyn ConfigPort) -> Result<Self, ScreenerError> {
        let d = ScreenerConfig::default();

        let data = DataConfig {
            dir: port
                .get_string("data", "dir")
                .map(|s| PathBuf::from(s.trim()))
                .unwrap_or(d.data.dir),
            symbols: port
                .get_string("data", "symbols")
                .filter(|s| !s.trim().is_empty()),
            timeframes: timeframe_list(port, "data", "timeframes", d.data.timeframes)?,
        };

        let a = &d.analysis;
        let sec = "analysis";
        let analysis = AnalysisConfig {
            min_bars: usize_key(port, sec, "min_bars", a.min_bars)?,
            pivot_order: usize_key(port, sec, "pivot_order", a.pivot_order)?,
            level_pivot_order: usize_key(port, sec, "level_pivot_order", a.level_pivot_order)?,
            trendline_tolerance: port.get_double(sec, "trendline_tolerance", a.trendline_tolerance),
            min_trendline_touches: usize_key(
                port,
                sec,
                "min_trendline_touches",
                a.min_trendline_touches,
            )?,
            sr_lookback: usize_key(port, sec, "sr_lookback", a.sr_lookback)?,
            volume_multiplier: port.get_double(sec, "volume_multiplier", a.volume_multiplier),
            volume_window: usize_key(port, sec, "volume_window", a.volume_window)?,
            round_number_band: port.get_double(sec, "round_number_band", a.round_number_band),
            extreme_window: usize_key(port, sec, "extreme_window", a.extreme_window)?,
            level_merge_tolerance: port.get_double(
                sec,
                "level_merge_tolerance",
                a.level_merge_tolerance,
            ),
            fib_ratios: float_list(port, sec, "fib_ratios", a.fib_ratios.clone())?,
            fib_lookback: usize_key(port, sec, "fib_lookback", a.fib_lookback)?,
            fib_min_range: port.get_double(sec, "fib_min_range", a.fib_min_range),
            trend_window: usize_key(port, sec, "trend_window", a.trend_window)?,
            volatility_threshold: port.get_double(
                sec,
                "volatility_threshold",
                a.volatility_threshold,
            ),
            zone_timeframes: timeframe_list(
                port,
                sec,
                "zone_timeframes",
                a.zone_timeframes.clone(),
            )?,
            zone_range: port.get_double(sec, "zone_range", a.zone_range),
            zone_offsets: float_list(port, sec, "zone_offsets", a.zone_offsets.clone())?,
            zone_width: port.get_double(sec, "zone_width", a.zone_width),
            min_confirmations: usize_key(port, sec, "min_confirmations", a.min_confirmations)?,
            min_confluence_score: port.get_double(
                sec,
                "min_confluence_score",
                a.min_confluence_score,
            ),
            max_zones: usize_key(port, sec, "max_zones", a.max_zones)?,
            zone_trendline_tolerance: port.get_double(
                sec,
                "zone_trendline_tolerance",
                a.zone_trendline_tolerance,
            ),
            zone_trendline_count: usize_key(
                port,
                sec,
                "zone_trendline_count",
                a.zone_trendline_count,
            )?,
            zone_level_tolerance: port.get_double(
                sec,
                "zone_level_tolerance",
                a.zone_level_tolerance,
            ),
            zone_level_count: usize_key(port, sec, "zone_level_count", a.zone_level_count)?,
            zone_fib_tolerance: port.get_double(sec, "zone_fib_tolerance", a.zone_fib_tolerance),
            zone_volume_tolerance: port.get_double(
                sec,
                "zone_volume_tolerance",
                a.zone_volume_tolerance,
            ),
            zone_round_tolerance: port.get_double(
                sec,
                "zone_round_tolerance",
                a.zone_round_tolerance,
            ),
        };

        let t = &d.trading;
        let sec = "trading";
        let confirmation_timeframe = match port.get_string(sec, "confirmation_timeframe") {
            Some(s) => parse_timeframe(sec, "confirmation_timeframe", &s)?,
            None => t.confirmation_timeframe,
        };
        let trading = TradingConfig {
            max_risk_pct: port.get_double(sec, "max_risk_pct", t.max_risk_pct),
            min_risk_reward: port.get_double(sec, "min_risk_reward", t.min_risk_reward),
            model1_distance_tolerance: port.get_double(
                sec,
                "model1_distance_tolerance",
                t.model1_distance_tolerance,
            ),
            model2_distance_tolerance: port.get_double(
                sec,
                "model2_distance_tolerance",
                t.model2_distance_tolerance,
            ),
            retest_tolerance: port.get_double(sec, "retest_tolerance", t.retest_tolerance),
            break_buffer: port.get_double(sec, "break_buffer", t.break_buffer),
            break_lookback: usize_key(port, sec, "break_lookback", t.break_lookback)?,
            retest_window: usize_key(port, sec, "retest_window", t.retest_window)?,
            wick_body_ratio: port.get_double(sec, "wick_body_ratio", t.wick_body_ratio),
            model2_history: usize_key(port, sec, "model2_history", t.model2_history)?,
            confirmation_timeframe,
            stop_buffer: port.get_double(sec, "stop_buffer", t.stop_buffer),
            swing_lookback: usize_key(port, sec, "swing_lookback", t.swing_lookback)?,
            min_target_gap: port.get_double(sec, "min_target_gap", t.min_target_gap),
            target_risk_multiple: port.get_double(
                sec,
                "target_risk_multiple",
                t.target_risk_multiple,
            ),
        };

        let p = &d.prescreen;
        let sec = "prescreen";
        let prescreen = PrescreenConfig {
            enabled: port.get_bool(sec, "enabled", p.enabled),
            min_price: port.get_double(sec, "min_price", p.min_price),
            max_price: port.get_double(sec, "max_price", p.max_price),
            min_avg_volume: port.get_double(sec, "min_avg_volume", p.min_avg_volume),
            max_volatility: port.get_double(sec, "max_volatility", p.max_volatility),
            max_avg_daily_change: port.get_double(
                sec,
                "max_avg_daily_change",
                p.max_avg_daily_change,
            ),
            window: usize_key(port, sec, "window", p.window)?,
        };

        let format = match port.get_string("report", "format") {
            Some(s) => s.parse::<ReportFormat>().map_err(|reason| ScreenerError::ConfigInvalid {
                section: "report".into(),
                key: "format".into(),
                reason,
            })?,
            None => ReportFormat::default(),
        };
        let report = ReportConfig {
            format,
            output: port
                .get_string("report", "output")
                .filter(|s| !s.trim().is_empty())
                .map(|s| PathBuf::from(s.trim())),
        };

        Ok(ScreenerConfig {
            data,
            analysis,
            trading,
            prescreen,
            report,
        })
    }
}

fn usize_key(
    port: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, ScreenerError> {
    let value = port.get_int(section, key, default as i64);
    usize::try_from(value).map_err(|_| ScreenerError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: format!("{} must be non-negative, got {}", key, value),
    })
}

fn float_list(
    port: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: Vec<f64>,
) -> Result<Vec<f64>, ScreenerError> {
    let Some(raw) = port.get_string(section, key) else {
        return Ok(default);
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>().map_err(|_| ScreenerError::ConfigInvalid {
                section: section.into(),
                key: key.into(),
                reason: format!("'{}' is not a number", s),
            })
        })
        .collect()
}

fn timeframe_list(
    port: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: Vec<Timeframe>,
) -> Result<Vec<Timeframe>, ScreenerError> {
    let Some(raw) = port.get_string(section, key) else {
        return Ok(default);
    };
    let mut out = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let tf = parse_timeframe(section, key, name)?;
        if !out.contains(&tf) {
            out.push(tf);
        }
    }
    Ok(out)
}

fn parse_timeframe(section: &str, key: &str, value: &str) -> Result<Timeframe, ScreenerError> {
    value
        .parse::<Timeframe>()
        .map_err(|reason| ScreenerError::ConfigInvalid {
            section: section.into(),
            key: key.into(),
            reason,
        })
}
