//! Risk evaluation types

use rust_decimal::Decimal;
use serde::Serialize;
use super::MarketConditions;

/// Outcome of one risk evaluation. Lives only for the duration of one
/// decision; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RiskEvaluation {
    pub approved: bool,
    pub verdict: RiskVerdict,
    /// Position size reserved against the exposure counter on approval.
    pub approved_position_size: Decimal,
    /// Cost budget ceiling the scheduler must not exceed at submission time.
    pub max_cost_ceiling: Decimal,
    /// Market-condition snapshot the decision was made under.
    pub conditions: MarketConditions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskVerdict {
    Approved,
    BelowProfitFloor,
    ExceedsPositionLimit,
    LowConfidence,
    ExposureCapReached,
    CircuitBreakerOpen,
    Expired,
}

impl RiskVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskVerdict::Approved => "approved",
            RiskVerdict::BelowProfitFloor => "below_profit_floor",
            RiskVerdict::ExceedsPositionLimit => "exceeds_position_limit",
            RiskVerdict::LowConfidence => "low_confidence",
            RiskVerdict::ExposureCapReached => "exposure_cap_reached",
            RiskVerdict::CircuitBreakerOpen => "circuit_breaker_open",
            RiskVerdict::Expired => "expired",
        }
    }
}
