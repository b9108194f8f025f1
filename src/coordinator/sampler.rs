//! Market-condition sampling boundary

use crate::types::{ConditionLevel, MarketConditions};

/// Periodic market-condition estimation. Real estimation (order-book depth,
/// realized volatility, mempool pressure) lives behind this boundary; tests
/// inject deterministic samplers.
pub trait MarketSampler: Send + Sync {
    fn sample(&self, previous: &MarketConditions) -> MarketConditions;
}

/// Random-walk sampler for simulation runs: each dimension occasionally
/// steps to a new level, so condition-change events fire at a realistic rate.
pub struct SimulatedMarketSampler {
    change_probability: f64,
}

impl SimulatedMarketSampler {
    pub fn new(change_probability: f64) -> Self {
        Self { change_probability }
    }

    fn step(&self, current: ConditionLevel) -> ConditionLevel {
        if rand::random::<f64>() >= self.change_probability {
            return current;
        }
        match (rand::random::<f64>() * 3.0) as u8 {
            0 => ConditionLevel::Low,
            1 => ConditionLevel::Normal,
            _ => ConditionLevel::High,
        }
    }
}

impl Default for SimulatedMarketSampler {
    fn default() -> Self {
        Self::new(0.15)
    }
}

impl MarketSampler for SimulatedMarketSampler {
    fn sample(&self, previous: &MarketConditions) -> MarketConditions {
        MarketConditions {
            volatility: self.step(previous.volatility),
            liquidity: self.step(previous.liquidity),
            execution_cost: self.step(previous.execution_cost),
            competition: self.step(previous.competition),
        }
    }
}
