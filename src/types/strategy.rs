//! Tunable strategy parameters and learning records

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::Serialize;
use crate::config::Config;
use super::Opportunity;

/// The tunable knob set. Owned by the adaptive coordinator; pushed as a full
/// copy into risk evaluation and scheduling on each retune, so readers never
/// observe a partially updated set.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyParameters {
    pub scan_interval_ms: u64,
    /// Floor on acceptable net profit per trade.
    pub min_profit_threshold: Decimal,
    pub max_position_size: Decimal,
    /// 0-1 scaling applied to position limits; tightened on poor outcomes.
    pub risk_tolerance: Decimal,
    /// 0-1; raises the scoring threshold.
    pub aggressiveness: Decimal,
    /// 0-1; how strongly each adaptation pass moves the knobs.
    pub adaptation_rate: Decimal,
}

impl StrategyParameters {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scan_interval_ms: config.scan_interval_ms,
            min_profit_threshold: config.min_profit_threshold,
            max_position_size: config.max_position_size,
            risk_tolerance: config.risk_tolerance,
            aggressiveness: config.aggressiveness,
            adaptation_rate: config.adaptation_rate,
        }
    }

    /// Keeps adapted knobs inside sane operating bounds.
    pub fn clamp(&mut self) {
        self.risk_tolerance = self.risk_tolerance.clamp(dec!(0.05), dec!(1));
        self.aggressiveness = self.aggressiveness.clamp(dec!(0), dec!(1));
        self.adaptation_rate = self.adaptation_rate.clamp(dec!(0), dec!(1));
        if self.min_profit_threshold < dec!(0) {
            self.min_profit_threshold = dec!(0);
        }
    }
}

/// Pattern signature used for historical-success lookups: pair plus a
/// profit-percentage bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PatternKey {
    pub pair: String,
    pub profit_bucket: i64,
}

impl PatternKey {
    /// Buckets are 0.25% wide; similar-margin trades on the same pair share
    /// a bucket.
    pub fn for_opportunity(opportunity: &Opportunity) -> Self {
        let bucket = (opportunity.profit_pct() / dec!(0.0025))
            .floor()
            .to_i64()
            .unwrap_or(0);
        Self {
            pair: opportunity.pair.clone(),
            profit_bucket: bucket,
        }
    }
}

/// Per-execution outcome summary appended to the bounded learning log.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceRecord {
    pub execution_id: String,
    pub pattern: PatternKey,
    pub success: bool,
    pub realized_profit: Decimal,
    pub recorded_at: DateTime<Utc>,
}
