//! Risk evaluation policy engine
//!
//! Pure function of the opportunity, market conditions, and strategy
//! parameters, plus the evaluator's own limit state (exposure counter,
//! daily-loss counter, circuit breaker). Every approval reserves exposure;
//! every terminal execution outcome releases it.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use crate::config::{COST_CEILING_RATIO, Config};
use crate::errors::CircuitBreaker;
use crate::events::{EventBus, SystemEvent};
use crate::types::{
    ConditionLevel, Execution, MarketConditions, Opportunity, RiskEvaluation, RiskVerdict,
    StrategyParameters,
};

#[derive(Debug, Clone)]
pub struct RiskLimits {
    pub confidence_floor: u8,
    pub max_aggregate_exposure: Decimal,
    pub daily_loss_limit: Decimal,
}

impl RiskLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            confidence_floor: config.confidence_floor,
            max_aggregate_exposure: config.max_aggregate_exposure,
            daily_loss_limit: config.daily_loss_limit,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RiskStats {
    pub approved: u64,
    pub rejected: u64,
}

#[derive(Debug, Clone)]
struct DailyLoss {
    date: NaiveDate,
    loss: Decimal,
}

pub struct RiskEvaluator {
    limits: RiskLimits,
    breaker: Arc<CircuitBreaker>,
    exposure: RwLock<Decimal>,
    daily: RwLock<DailyLoss>,
    stats: RwLock<RiskStats>,
    events: EventBus,
}

impl RiskEvaluator {
    pub fn new(limits: RiskLimits, breaker: Arc<CircuitBreaker>, events: EventBus) -> Arc<Self> {
        Arc::new(Self {
            limits,
            breaker,
            exposure: RwLock::new(Decimal::ZERO),
            daily: RwLock::new(DailyLoss {
                date: Utc::now().date_naive(),
                loss: Decimal::ZERO,
            }),
            stats: RwLock::new(RiskStats::default()),
            events,
        })
    }

    /// Evaluates one opportunity. Called exactly once per opportunity before
    /// it may enter the execution queue.
    pub async fn evaluate(
        &self,
        opportunity: &Opportunity,
        conditions: &MarketConditions,
        parameters: &StrategyParameters,
    ) -> RiskEvaluation {
        if self.breaker.is_open().await {
            return self
                .reject(opportunity, conditions, RiskVerdict::CircuitBreakerOpen)
                .await;
        }

        if opportunity.is_expired() {
            return self
                .reject(opportunity, conditions, RiskVerdict::Expired)
                .await;
        }

        if opportunity.net_profit < parameters.min_profit_threshold {
            return self
                .reject(opportunity, conditions, RiskVerdict::BelowProfitFloor)
                .await;
        }

        if opportunity.confidence < self.limits.confidence_floor {
            return self
                .reject(opportunity, conditions, RiskVerdict::LowConfidence)
                .await;
        }

        let position_limit = self.position_limit(conditions, parameters);
        if opportunity.volume > position_limit {
            return self
                .reject(opportunity, conditions, RiskVerdict::ExceedsPositionLimit)
                .await;
        }

        {
            // Reserve exposure under the write lock so concurrent approvals
            // cannot overshoot the aggregate cap.
            let mut exposure = self.exposure.write().await;
            if *exposure + opportunity.volume > self.limits.max_aggregate_exposure {
                drop(exposure);
                return self
                    .reject(opportunity, conditions, RiskVerdict::ExposureCapReached)
                    .await;
            }
            *exposure += opportunity.volume;
        }

        self.stats.write().await.approved += 1;

        RiskEvaluation {
            approved: true,
            verdict: RiskVerdict::Approved,
            approved_position_size: opportunity.volume,
            max_cost_ceiling: self.cost_ceiling(opportunity, conditions),
            conditions: *conditions,
        }
    }

    /// Position limit scales with risk tolerance and tightens in adverse
    /// market conditions.
    fn position_limit(
        &self,
        conditions: &MarketConditions,
        parameters: &StrategyParameters,
    ) -> Decimal {
        let mut limit = parameters.max_position_size * parameters.risk_tolerance;
        if conditions.volatility == ConditionLevel::High {
            limit *= dec!(0.5);
        }
        if conditions.liquidity == ConditionLevel::Low {
            limit *= dec!(0.7);
        }
        limit
    }

    /// Cost budget the scheduler must stay under at submission time.
    fn cost_ceiling(&self, opportunity: &Opportunity, conditions: &MarketConditions) -> Decimal {
        let cost_factor = match conditions.execution_cost {
            ConditionLevel::Low => dec!(1.2),
            ConditionLevel::Normal => dec!(1),
            ConditionLevel::High => dec!(0.7),
        };
        opportunity.expected_profit * COST_CEILING_RATIO * cost_factor
    }

    async fn reject(
        &self,
        opportunity: &Opportunity,
        conditions: &MarketConditions,
        verdict: RiskVerdict,
    ) -> RiskEvaluation {
        // A rejection is a policy outcome, not an error.
        info!(
            opportunity_id = %opportunity.id,
            pair = %opportunity.pair,
            verdict = verdict.as_str(),
            "Opportunity rejected"
        );
        self.stats.write().await.rejected += 1;

        RiskEvaluation {
            approved: false,
            verdict,
            approved_position_size: Decimal::ZERO,
            max_cost_ceiling: Decimal::ZERO,
            conditions: *conditions,
        }
    }

    /// Terminal-outcome notification from the scheduler. Releases the
    /// reserved exposure and feeds realized losses into the daily counter and
    /// the circuit breaker's rolling window.
    pub async fn on_execution_terminal(&self, execution: &Execution) {
        if !execution.evaluation.approved {
            return;
        }

        self.release_reserved(execution.evaluation.approved_position_size)
            .await;

        let realized = execution.realized_profit.unwrap_or(Decimal::ZERO);
        if self.breaker.record_outcome(realized).await {
            let reason = self
                .breaker
                .trip_reason()
                .await
                .unwrap_or_else(|| "loss limit breached".to_string());
            self.events
                .publish(SystemEvent::CircuitBreakerTripped { reason });
        }

        if realized < Decimal::ZERO {
            let today = Utc::now().date_naive();
            let breach = {
                let mut daily = self.daily.write().await;
                if daily.date != today {
                    daily.date = today;
                    daily.loss = Decimal::ZERO;
                }
                daily.loss += -realized;
                daily.loss > self.limits.daily_loss_limit
            };
            if breach && !self.breaker.is_open().await {
                let reason = format!("daily loss limit {} breached", self.limits.daily_loss_limit);
                self.breaker.trip(&reason).await;
                self.events
                    .publish(SystemEvent::CircuitBreakerTripped { reason });
            }
        }
    }

    /// Releases exposure reserved by an approval that never became an
    /// execution (for example a failed queue insert).
    pub async fn release_reserved(&self, size: Decimal) {
        let mut exposure = self.exposure.write().await;
        if *exposure < size {
            warn!(
                reserved = %size,
                outstanding = %*exposure,
                "Exposure release exceeds outstanding reservation"
            );
            *exposure = Decimal::ZERO;
        } else {
            *exposure -= size;
        }
    }

    /// Trips the breaker system-wide and records the reason and timestamp.
    pub async fn emergency_stop_all(&self, reason: &str) {
        self.breaker.trip(reason).await;
        self.events.publish(SystemEvent::CircuitBreakerTripped {
            reason: reason.to_string(),
        });
    }

    pub async fn reset_breaker(&self) {
        self.breaker.reset().await;
    }

    pub async fn is_breaker_open(&self) -> bool {
        self.breaker.is_open().await
    }

    pub async fn current_exposure(&self) -> Decimal {
        *self.exposure.read().await
    }

    pub async fn stats(&self) -> RiskStats {
        self.stats.read().await.clone()
    }
}
