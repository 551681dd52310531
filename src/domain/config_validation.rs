//! Configuration validation.
//!
//! Rejects inconsistent values before any screening runs. Works on the
//! parsed [`ScreenerConfig`] so every default is checked too.

use crate::domain::config::ScreenerConfig;
use crate::domain::error::ScreenerError;

pub fn validate_config(config: &ScreenerConfig) -> Result<(), ScreenerError> {
    validate_data(config)?;
    validate_analysis(config)?;
    validate_trading(config)?;
    validate_prescreen(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> ScreenerError {
    ScreenerError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Open interval (0, 1).
fn fraction(section: &str, key: &str, value: f64) -> Result<(), ScreenerError> {
    if !(value > 0.0 && value < 1.0) {
        return Err(invalid(section, key, format!("{} must be between 0 and 1", key)));
    }
    Ok(())
}

fn positive(section: &str, key: &str, value: f64) -> Result<(), ScreenerError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid(section, key, format!("{} must be positive", key)));
    }
    Ok(())
}

fn non_negative(section: &str, key: &str, value: f64) -> Result<(), ScreenerError> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(invalid(section, key, format!("{} must be non-negative", key)));
    }
    Ok(())
}

fn non_zero(section: &str, key: &str, value: usize) -> Result<(), ScreenerError> {
    if value == 0 {
        return Err(invalid(section, key, format!("{} must be at least 1", key)));
    }
    Ok(())
}

fn validate_data(config: &ScreenerConfig) -> Result<(), ScreenerError> {
    if config.data.timeframes.is_empty() {
        return Err(invalid("data", "timeframes", "at least one timeframe required"));
    }
    Ok(())
}

fn validate_analysis(config: &ScreenerConfig) -> Result<(), ScreenerError> {
    let a = &config.analysis;
    let sec = "analysis";

    for (key, value) in [
        ("min_bars", a.min_bars),
        ("pivot_order", a.pivot_order),
        ("level_pivot_order", a.level_pivot_order),
        ("sr_lookback", a.sr_lookback),
        ("volume_window", a.volume_window),
        ("extreme_window", a.extreme_window),
        ("fib_lookback", a.fib_lookback),
        ("trend_window", a.trend_window),
        ("max_zones", a.max_zones),
        ("zone_trendline_count", a.zone_trendline_count),
        ("zone_level_count", a.zone_level_count),
    ] {
        non_zero(sec, key, value)?;
    }
    if a.min_trendline_touches < 2 {
        return Err(invalid(
            sec,
            "min_trendline_touches",
            "a trendline needs at least 2 touches",
        ));
    }

    for (key, value) in [
        ("trendline_tolerance", a.trendline_tolerance),
        ("round_number_band", a.round_number_band),
        ("level_merge_tolerance", a.level_merge_tolerance),
        ("fib_min_range", a.fib_min_range),
        ("volatility_threshold", a.volatility_threshold),
        ("zone_range", a.zone_range),
        ("zone_width", a.zone_width),
        ("zone_trendline_tolerance", a.zone_trendline_tolerance),
        ("zone_level_tolerance", a.zone_level_tolerance),
        ("zone_fib_tolerance", a.zone_fib_tolerance),
        ("zone_volume_tolerance", a.zone_volume_tolerance),
        ("zone_round_tolerance", a.zone_round_tolerance),
    ] {
        fraction(sec, key, value)?;
    }
    positive(sec, "volume_multiplier", a.volume_multiplier)?;
    non_negative(sec, "min_confluence_score", a.min_confluence_score)?;

    if a.fib_ratios.is_empty() {
        return Err(invalid(sec, "fib_ratios", "at least one ratio required"));
    }
    for &ratio in &a.fib_ratios {
        fraction(sec, "fib_ratios", ratio)?;
    }
    for &offset in &a.zone_offsets {
        fraction(sec, "zone_offsets", offset)?;
    }
    if a.zone_timeframes.is_empty() {
        return Err(invalid(sec, "zone_timeframes", "at least one timeframe required"));
    }
    Ok(())
}

fn validate_trading(config: &ScreenerConfig) -> Result<(), ScreenerError> {
    let t = &config.trading;
    let sec = "trading";

    for (key, value) in [
        ("max_risk_pct", t.max_risk_pct),
        ("model1_distance_tolerance", t.model1_distance_tolerance),
        ("model2_distance_tolerance", t.model2_distance_tolerance),
        ("retest_tolerance", t.retest_tolerance),
        ("break_buffer", t.break_buffer),
        ("min_target_gap", t.min_target_gap),
    ] {
        fraction(sec, key, value)?;
    }
    non_negative(sec, "stop_buffer", t.stop_buffer)?;
    if t.stop_buffer >= 1.0 {
        return Err(invalid(sec, "stop_buffer", "stop_buffer must be below 1"));
    }
    positive(sec, "min_risk_reward", t.min_risk_reward)?;
    positive(sec, "wick_body_ratio", t.wick_body_ratio)?;
    positive(sec, "target_risk_multiple", t.target_risk_multiple)?;

    for (key, value) in [
        ("break_lookback", t.break_lookback),
        ("retest_window", t.retest_window),
        ("model2_history", t.model2_history),
        ("swing_lookback", t.swing_lookback),
    ] {
        non_zero(sec, key, value)?;
    }
    Ok(())
}

fn validate_prescreen(config: &ScreenerConfig) -> Result<(), ScreenerError> {
    let p = &config.prescreen;
    let sec = "prescreen";

    non_negative(sec, "min_price", p.min_price)?;
    positive(sec, "max_price", p.max_price)?;
    if p.min_price > p.max_price {
        return Err(invalid(sec, "min_price", "min_price must not exceed max_price"));
    }
    non_negative(sec, "min_avg_volume", p.min_avg_volume)?;
    positive(sec, "max_volatility", p.max_volatility)?;
    positive(sec, "max_avg_daily_change", p.max_avg_daily_change)?;
    if p.window < 2 {
        return Err(invalid(sec, "window", "window must be at least 2"));
    }
    Ok(())
}
