//! Weighted opportunity scoring

use rust_decimal::prelude::ToPrimitive;
use crate::config::{SCORE_THRESHOLD_BASE, SCORE_THRESHOLD_SPREAD};
use crate::types::{ConditionLevel, MarketConditions, Opportunity, StrategyParameters};

const W_PROFITABILITY: f64 = 0.30;
const W_MARKET: f64 = 0.20;
const W_HISTORICAL: f64 = 0.25;
const W_TIMING: f64 = 0.10;
const W_COMPETITION: f64 = 0.15;

/// Profit percentage at which the profitability factor saturates.
const PROFIT_PCT_SATURATION: f64 = 0.05;

#[derive(Debug, Clone, Copy)]
pub struct ScoreFactors {
    pub profitability: f64,
    pub market: f64,
    pub historical: f64,
    pub timing: f64,
    pub competition: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub proceed: bool,
    pub score: f64,
    pub threshold: f64,
    pub confidence: f64,
    pub factors: ScoreFactors,
}

/// Scores one opportunity as a weighted sum of five normalized factors and
/// compares it against a threshold that rises with aggressiveness.
pub fn score_opportunity(
    opportunity: &Opportunity,
    conditions: &MarketConditions,
    parameters: &StrategyParameters,
    historical_rate: f64,
    hour_utc: u32,
) -> Decision {
    let factors = ScoreFactors {
        profitability: profitability_factor(opportunity),
        market: market_factor(conditions),
        historical: historical_rate.clamp(0.0, 1.0),
        timing: timing_factor(hour_utc),
        competition: competition_factor(conditions.competition),
    };

    let score = factors.profitability * W_PROFITABILITY
        + factors.market * W_MARKET
        + factors.historical * W_HISTORICAL
        + factors.timing * W_TIMING
        + factors.competition * W_COMPETITION;

    let aggressiveness = parameters.aggressiveness.to_f64().unwrap_or(0.5);
    let threshold = SCORE_THRESHOLD_BASE + aggressiveness * SCORE_THRESHOLD_SPREAD;

    let confidence = 0.5 * (opportunity.confidence as f64 / 100.0) + 0.5 * factors.historical;

    Decision {
        proceed: score >= threshold,
        score,
        threshold,
        confidence,
        factors,
    }
}

fn profitability_factor(opportunity: &Opportunity) -> f64 {
    let profit_pct = opportunity.profit_pct().to_f64().unwrap_or(0.0);
    (profit_pct / PROFIT_PCT_SATURATION).clamp(0.0, 1.0)
}

fn market_factor(conditions: &MarketConditions) -> f64 {
    let volatility = match conditions.volatility {
        ConditionLevel::Low => 1.0,
        ConditionLevel::Normal => 0.7,
        ConditionLevel::High => 0.3,
    };
    let liquidity = match conditions.liquidity {
        ConditionLevel::High => 1.0,
        ConditionLevel::Normal => 0.7,
        ConditionLevel::Low => 0.4,
    };
    let execution_cost = match conditions.execution_cost {
        ConditionLevel::Low => 1.0,
        ConditionLevel::Normal => 0.6,
        ConditionLevel::High => 0.2,
    };
    (volatility + liquidity + execution_cost) / 3.0
}

/// Cross-venue flow peaks in the EU/US session overlap; quiet hours score
/// neutral rather than zero so off-hours trades stay possible.
fn timing_factor(hour_utc: u32) -> f64 {
    match hour_utc {
        13..=16 => 1.0,
        8..=12 | 17..=20 => 0.75,
        _ => 0.5,
    }
}

fn competition_factor(level: ConditionLevel) -> f64 {
    match level {
        ConditionLevel::Low => 0.9,
        ConditionLevel::Normal => 0.6,
        ConditionLevel::High => 0.3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use rust_decimal_macros::dec;

    fn opportunity(profit_pct: rust_decimal::Decimal, confidence: u8) -> Opportunity {
        let now = Utc::now();
        Opportunity {
            id: uuid::Uuid::new_v4().to_string(),
            pair: "WETH/USDC".to_string(),
            source_venue: "uniswap_v3".to_string(),
            destination_venue: "sushiswap".to_string(),
            source_price: dec!(1),
            destination_price: dec!(1) + profit_pct,
            volume: dec!(1),
            expected_profit: profit_pct,
            net_profit: profit_pct,
            confidence,
            created_at: now,
            expires_at: now + ChronoDuration::seconds(60),
        }
    }

    fn parameters() -> StrategyParameters {
        StrategyParameters {
            scan_interval_ms: 1000,
            min_profit_threshold: dec!(0.01),
            max_position_size: dec!(10),
            risk_tolerance: dec!(0.5),
            aggressiveness: dec!(0.5),
            adaptation_rate: dec!(1),
        }
    }

    #[test]
    fn threshold_rises_with_aggressiveness() {
        let opp = opportunity(dec!(0.02), 85);
        let conditions = MarketConditions::default();

        let mut timid = parameters();
        timid.aggressiveness = dec!(0);
        let mut bold = parameters();
        bold.aggressiveness = dec!(1);

        let low = score_opportunity(&opp, &conditions, &timid, 0.5, 14);
        let high = score_opportunity(&opp, &conditions, &bold, 0.5, 14);
        assert!(high.threshold > low.threshold);
        assert_eq!(low.score, high.score);
    }

    #[test]
    fn factors_are_normalized() {
        let opp = opportunity(dec!(0.10), 100);
        let conditions = MarketConditions::default();
        let decision = score_opportunity(&opp, &conditions, &parameters(), 1.0, 14);

        let f = decision.factors;
        for factor in [f.profitability, f.market, f.historical, f.timing, f.competition] {
            assert!((0.0..=1.0).contains(&factor));
        }
        assert!(decision.score <= 1.0);
    }

    #[test]
    fn rich_opportunity_in_calm_market_proceeds() {
        let opp = opportunity(dec!(0.05), 90);
        let conditions = MarketConditions {
            volatility: ConditionLevel::Low,
            liquidity: ConditionLevel::High,
            execution_cost: ConditionLevel::Low,
            competition: ConditionLevel::Low,
        };
        let decision = score_opportunity(&opp, &conditions, &parameters(), 0.9, 14);
        assert!(decision.proceed);
    }

    #[test]
    fn hostile_market_blocks_thin_margin() {
        let opp = opportunity(dec!(0.001), 50);
        let conditions = MarketConditions {
            volatility: ConditionLevel::High,
            liquidity: ConditionLevel::Low,
            execution_cost: ConditionLevel::High,
            competition: ConditionLevel::High,
        };
        let decision = score_opportunity(&opp, &conditions, &parameters(), 0.1, 3);
        assert!(!decision.proceed);
    }
}
