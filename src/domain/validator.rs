//! Final risk gate for proposed trades.

use crate::domain::config::TradingConfig;
use crate::domain::entry::RATIO_EPSILON;
use crate::domain::opportunity::{TradeDirection, TradingOpportunity};
use crate::domain::structure::StructureQuality;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    #[error("{direction} stop/target on the wrong side of entry")]
    WrongSides { direction: TradeDirection },

    #[error("risk-reward {value} is not a finite positive number")]
    InvalidRiskReward { value: f64 },

    #[error("risk {risk_pct:.4} exceeds maximum {max:.4}")]
    RiskTooHigh { risk_pct: f64, max: f64 },

    #[error("risk-reward {value:.2} below minimum {min:.2}")]
    RiskRewardTooLow { value: f64, min: f64 },

    #[error("confluence {score:.2} below minimum {min:.2}")]
    ConfluenceTooLow { score: f64, min: f64 },

    #[error("low quality price structure")]
    LowQuality,
}

/// Accepts or rejects one opportunity. `quality` is the daily structure
/// quality; `None` (not computable) does not reject.
pub fn validate(
    opportunity: &TradingOpportunity,
    quality: Option<StructureQuality>,
    trading: &TradingConfig,
    min_confluence: f64,
) -> Result<(), RejectionReason> {
    if !opportunity.sides_valid() {
        return Err(RejectionReason::WrongSides {
            direction: opportunity.direction,
        });
    }
    let rr = opportunity.risk_reward;
    if !rr.is_finite() || rr <= 0.0 {
        return Err(RejectionReason::InvalidRiskReward { value: rr });
    }
    let risk_pct = opportunity.risk_pct();
    if risk_pct > trading.max_risk_pct + RATIO_EPSILON {
        return Err(RejectionReason::RiskTooHigh {
            risk_pct,
            max: trading.max_risk_pct,
        });
    }
    if rr + RATIO_EPSILON < trading.min_risk_reward {
        return Err(RejectionReason::RiskRewardTooLow {
            value: rr,
            min: trading.min_risk_reward,
        });
    }
    if opportunity.confluence_score + RATIO_EPSILON < min_confluence {
        return Err(RejectionReason::ConfluenceTooLow {
            score: opportunity.confluence_score,
            min: min_confluence,
        });
    }
    if quality == Some(StructureQuality::Low) {
        return Err(RejectionReason::LowQuality);
    }
    Ok(())
}
