//! Candidate trade opportunity types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// A candidate cross-exchange arbitrage trade. Immutable once created;
/// discarded after expiry or after being consumed by an execution attempt.
#[derive(Debug, Clone, Serialize)]
pub struct Opportunity {
    pub id: String,
    pub pair: String,
    pub source_venue: String,
    pub destination_venue: String,
    pub source_price: Decimal,
    pub destination_price: Decimal,
    pub volume: Decimal,
    pub expected_profit: Decimal,
    pub net_profit: Decimal,
    /// 0-100 confidence score from the feed
    pub confidence: u8,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Opportunity {
    /// Expected profit as a fraction of trade notional (volume priced at the
    /// source venue). Zero when the notional is degenerate.
    pub fn profit_pct(&self) -> Decimal {
        let notional = self.volume * self.source_price;
        if notional <= dec!(0) {
            return dec!(0);
        }
        self.expected_profit / notional
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Coarse three-valued estimate used across market-condition dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConditionLevel {
    Low,
    Normal,
    High,
}

/// Coarse market-condition snapshot. Replaced wholesale by the coordinator's
/// periodic sampler; readers always see a complete snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarketConditions {
    pub volatility: ConditionLevel,
    pub liquidity: ConditionLevel,
    pub execution_cost: ConditionLevel,
    pub competition: ConditionLevel,
}

impl Default for MarketConditions {
    fn default() -> Self {
        Self {
            volatility: ConditionLevel::Normal,
            liquidity: ConditionLevel::Normal,
            execution_cost: ConditionLevel::Normal,
            competition: ConditionLevel::Normal,
        }
    }
}
