//! Execution backend boundary
//!
//! Abstracts actual trade submission and confirmation wait. The simulated
//! implementation models realistic latency, slippage and failure modes so the
//! retry protocol is exercised end to end without touching a chain.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;
use std::time::Duration;
use tracing::debug;
use crate::errors::{EngineError, EngineResult};
use crate::types::{ExecutionParams, SubmissionResult, SubmissionStatus};

#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Submits one attempt and awaits a terminal outcome. Transport-level
    /// failures (network, timeout, nonce class) are returned as errors and
    /// classified for retry; `Reverted` is a terminal on-chain outcome.
    async fn submit(&self, params: &ExecutionParams) -> EngineResult<SubmissionResult>;
}

#[async_trait]
pub trait CostEstimator: Send + Sync {
    /// Live cost estimate for one submission, same units as profit.
    async fn estimate(&self, params: &ExecutionParams) -> EngineResult<Decimal>;
}

/// Simulated backend with configurable failure mix.
pub struct SimulatedExecutionBackend {
    latency: Duration,
    revert_rate: f64,
    transient_error_rate: f64,
}

impl SimulatedExecutionBackend {
    pub fn new(latency_ms: u64, revert_rate: f64, transient_error_rate: f64) -> Self {
        Self {
            latency: Duration::from_millis(latency_ms),
            revert_rate,
            transient_error_rate,
        }
    }
}

impl Default for SimulatedExecutionBackend {
    fn default() -> Self {
        Self::new(150, 0.08, 0.1)
    }
}

#[async_trait]
impl ExecutionBackend for SimulatedExecutionBackend {
    async fn submit(&self, params: &ExecutionParams) -> EngineResult<SubmissionResult> {
        tokio::time::sleep(self.latency).await;

        let roll = rand::random::<f64>();
        if roll < self.transient_error_rate {
            return Err(EngineError::Network {
                message: format!("connection reset while submitting {}", params.execution_id),
            });
        }
        if roll < self.transient_error_rate + self.revert_rate {
            let cost_used = params.cost_ceiling * dec!(0.8);
            return Ok(SubmissionResult {
                status: SubmissionStatus::Reverted,
                tx_ref: None,
                cost_used,
                realized_profit: -cost_used,
            });
        }

        // Realized profit lands a little under the floor-adjusted target.
        let slippage = Decimal::from_f64(rand::random::<f64>() * 0.02).unwrap_or(Decimal::ZERO);
        let realized_profit = params.min_acceptable_profit * (dec!(1) - slippage);
        let cost_used = params.cost_ceiling
            * Decimal::from_f64(0.3 + rand::random::<f64>() * 0.5).unwrap_or(dec!(0.5));

        let tx_ref = format!("0x{}", uuid::Uuid::new_v4().simple());
        debug!(execution_id = %params.execution_id, %tx_ref, "simulated submission confirmed");

        Ok(SubmissionResult {
            status: SubmissionStatus::Success,
            tx_ref: Some(tx_ref),
            cost_used,
            realized_profit,
        })
    }
}

/// Flat-fee estimator with light noise, standing in for fee-oracle lookups.
pub struct SimulatedCostEstimator {
    base_cost: Decimal,
}

impl SimulatedCostEstimator {
    pub fn new(base_cost: Decimal) -> Self {
        Self { base_cost }
    }
}

impl Default for SimulatedCostEstimator {
    fn default() -> Self {
        Self::new(dec!(0.02))
    }
}

#[async_trait]
impl CostEstimator for SimulatedCostEstimator {
    async fn estimate(&self, _params: &ExecutionParams) -> EngineResult<Decimal> {
        let noise = Decimal::from_f64(rand::random::<f64>() * 0.5 + 0.75).unwrap_or(dec!(1));
        Ok(self.base_cost * noise)
    }
}
