//! Cheap liquidity and volatility filter run before structure analysis.

use crate::domain::config::PrescreenConfig;
use crate::domain::stats::{mean, return_volatility, returns, tail_mean};
use crate::domain::timeseries::TimeSeries;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PrescreenRejection {
    #[error("no daily bars")]
    Empty,

    #[error("price {price:.2} outside [{min}, {max}]")]
    PriceOutOfRange { price: f64, min: f64, max: f64 },

    #[error("average volume {average:.0} below {min:.0}")]
    ThinVolume { average: f64, min: f64 },

    #[error("volatility {volatility:.4} above {max:.4}")]
    TooVolatile { volatility: f64, max: f64 },

    #[error("average daily change {change:.4} above {max:.4}")]
    ErraticMoves { change: f64, max: f64 },
}

/// Checks the last `window` daily bars against the configured limits.
pub fn passes(daily: &TimeSeries, cfg: &PrescreenConfig) -> Result<(), PrescreenRejection> {
    let last = daily.last().ok_or(PrescreenRejection::Empty)?;
    if last.close < cfg.min_price || last.close > cfg.max_price {
        return Err(PrescreenRejection::PriceOutOfRange {
            price: last.close,
            min: cfg.min_price,
            max: cfg.max_price,
        });
    }

    let recent = daily.tail(cfg.window);
    let average = tail_mean(&recent.volumes(), cfg.window).unwrap_or(0.0);
    if average < cfg.min_avg_volume {
        return Err(PrescreenRejection::ThinVolume {
            average,
            min: cfg.min_avg_volume,
        });
    }

    let closes = recent.closes();
    if let Some(volatility) = return_volatility(&closes) {
        if volatility > cfg.max_volatility {
            return Err(PrescreenRejection::TooVolatile {
                volatility,
                max: cfg.max_volatility,
            });
        }
    }

    let abs_changes: Vec<f64> = returns(&closes).iter().map(|r| r.abs()).collect();
    if let Some(change) = mean(&abs_changes) {
        if change > cfg.max_avg_daily_change {
            return Err(PrescreenRejection::ErraticMoves {
                change,
                max: cfg.max_avg_daily_change,
            });
        }
    }
    Ok(())
}
