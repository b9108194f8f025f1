//! Adaptive coordinator
//!
//! Scores incoming opportunities, samples market conditions, learns from
//! execution outcomes, and periodically retunes the shared strategy
//! parameters. The parameter set is always replaced as a whole value.

use chrono::{Timelike, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, mpsc, watch};
use tracing::{debug, error, info};
use crate::config::{
    ADAPT_MIN_INTERVAL_SECS, ADAPTATION_WINDOW_SECS, Config, DECISION_LOG_CAPACITY,
    MIN_ADAPTATION_SAMPLES, PERFORMANCE_LOG_CAPACITY, SUCCESS_RATE_FLOOR, SUCCESS_RATE_UPPER,
};
use crate::events::{AdaptationTrigger, EventBus, SystemEvent};
use crate::storage;
use crate::types::{
    Execution, ExecutionStatus, MarketConditions, Opportunity, PatternKey, PerformanceRecord,
    StrategyParameters,
};
use super::{Decision, MarketSampler, PatternTracker, score_opportunity};

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub sample_interval_secs: u64,
    pub adaptation_window_secs: u64,
    pub success_rate_floor: f64,
    pub success_rate_upper: f64,
    pub min_adaptation_samples: usize,
    pub persist_records: bool,
}

impl CoordinatorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sample_interval_secs: config.sample_interval_secs,
            adaptation_window_secs: ADAPTATION_WINDOW_SECS,
            success_rate_floor: SUCCESS_RATE_FLOOR,
            success_rate_upper: SUCCESS_RATE_UPPER,
            min_adaptation_samples: MIN_ADAPTATION_SAMPLES,
            persist_records: config.persist_records,
        }
    }
}

#[derive(Debug, Clone)]
struct DecisionRecord {
    opportunity_id: String,
    proceed: bool,
    #[allow(dead_code)]
    score: f64,
    outcome: Option<bool>,
}

pub struct AdaptiveCoordinator {
    parameters: Arc<RwLock<StrategyParameters>>,
    conditions: Arc<RwLock<MarketConditions>>,
    sampler: Arc<dyn MarketSampler>,
    patterns: RwLock<PatternTracker>,
    decisions: RwLock<VecDeque<DecisionRecord>>,
    agent_scores: RwLock<HashMap<&'static str, f64>>,
    last_adapted: RwLock<Option<Instant>>,
    events: EventBus,
    config: CoordinatorConfig,
    cycles: AtomicU64,
}

impl AdaptiveCoordinator {
    pub fn new(
        config: CoordinatorConfig,
        initial_parameters: StrategyParameters,
        sampler: Arc<dyn MarketSampler>,
        events: EventBus,
    ) -> Arc<Self> {
        Arc::new(Self {
            parameters: Arc::new(RwLock::new(initial_parameters)),
            conditions: Arc::new(RwLock::new(MarketConditions::default())),
            sampler,
            patterns: RwLock::new(PatternTracker::new(PERFORMANCE_LOG_CAPACITY)),
            decisions: RwLock::new(VecDeque::with_capacity(DECISION_LOG_CAPACITY)),
            agent_scores: RwLock::new(HashMap::new()),
            last_adapted: RwLock::new(None),
            events,
            config,
            cycles: AtomicU64::new(0),
        })
    }

    /// Shared handle read by the scheduler for parameter snapshots.
    pub fn parameters_handle(&self) -> Arc<RwLock<StrategyParameters>> {
        self.parameters.clone()
    }

    pub async fn current_parameters(&self) -> StrategyParameters {
        self.parameters.read().await.clone()
    }

    pub async fn current_conditions(&self) -> MarketConditions {
        *self.conditions.read().await
    }

    /// Scores one opportunity against live conditions, parameters, and the
    /// historical pattern log, and records the decision for accuracy
    /// tracking.
    pub async fn score(&self, opportunity: &Opportunity) -> Decision {
        let conditions = *self.conditions.read().await;
        let parameters = self.parameters.read().await.clone();

        let key = PatternKey::for_opportunity(opportunity);
        // Unmatched patterns default to neutral so novel trades are not
        // starved out of the learning loop.
        let historical = self
            .patterns
            .read()
            .await
            .success_rate(&key)
            .unwrap_or(0.5);

        let decision = score_opportunity(
            opportunity,
            &conditions,
            &parameters,
            historical,
            Utc::now().hour(),
        );

        {
            let mut decisions = self.decisions.write().await;
            if decisions.len() >= DECISION_LOG_CAPACITY {
                decisions.pop_front();
            }
            decisions.push_back(DecisionRecord {
                opportunity_id: opportunity.id.clone(),
                proceed: decision.proceed,
                score: decision.score,
                outcome: None,
            });
        }

        debug!(
            opportunity_id = %opportunity.id,
            score = decision.score,
            threshold = decision.threshold,
            proceed = decision.proceed,
            "scored opportunity"
        );

        decision
    }

    /// Learning feedback for one terminal execution: appends a performance
    /// record, backfills the decision outcome, and considers adaptation.
    pub async fn on_execution_outcome(&self, execution: &Execution) {
        let success = execution.status == ExecutionStatus::Succeeded;
        let record = PerformanceRecord {
            execution_id: execution.id.clone(),
            pattern: PatternKey::for_opportunity(&execution.opportunity),
            success,
            realized_profit: execution.realized_profit.unwrap_or(Decimal::ZERO),
            recorded_at: Utc::now(),
        };

        self.patterns.write().await.record(record.clone());

        if self.config.persist_records {
            if let Err(e) = storage::save_performance_record(&record) {
                error!("Failed to persist performance record: {}", e);
            }
        }

        {
            let mut decisions = self.decisions.write().await;
            if let Some(decision) = decisions
                .iter_mut()
                .rev()
                .find(|d| d.opportunity_id == execution.opportunity.id)
            {
                decision.outcome = Some(success);
            }
        }

        self.update_agent_score("scheduler", if success { 1.0 } else { 0.0 })
            .await;

        self.maybe_adapt().await;
    }

    /// Consumes the scheduler's terminal-outcome channel.
    pub async fn run_outcome_loop(
        self: Arc<Self>,
        mut outcomes: mpsc::UnboundedReceiver<Execution>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                outcome = outcomes.recv() => match outcome {
                    Some(execution) => self.on_execution_outcome(&execution).await,
                    None => break,
                },
            }
        }
        debug!("coordinator outcome loop exited");
    }

    /// Periodic market-condition sampling task. On change the shared value is
    /// replaced wholesale and a change event is emitted so dependents react
    /// without polling.
    pub async fn run_sampling(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.sample_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = interval.tick() => {
                    self.cycles.fetch_add(1, Ordering::Relaxed);
                    let previous = *self.conditions.read().await;
                    let current = self.sampler.sample(&previous);
                    if current != previous {
                        *self.conditions.write().await = current;
                        info!(?previous, ?current, "Market conditions changed");
                        self.events.publish(SystemEvent::MarketConditionsChanged {
                            previous,
                            current,
                        });
                    }
                }
            }
        }
        debug!("coordinator sampling loop exited");
    }

    /// Retunes strategy parameters when the rolling window shows the system
    /// over- or under-performing. Multipliers are damped by the adaptation
    /// rate and the result is clamped and swapped in as a whole value.
    pub async fn maybe_adapt(&self) {
        {
            let last = self.last_adapted.read().await;
            if let Some(at) = *last {
                if at.elapsed() < Duration::from_secs(ADAPT_MIN_INTERVAL_SECS) {
                    return;
                }
            }
        }

        let window = Duration::from_secs(self.config.adaptation_window_secs);
        let stats = self.patterns.read().await.windowed_stats(window);
        if stats.samples < self.config.min_adaptation_samples {
            return;
        }

        let min_profit = self.parameters.read().await.min_profit_threshold;
        let trigger = if stats.success_rate < self.config.success_rate_floor {
            Some(AdaptationTrigger::LowSuccessRate)
        } else if stats.average_profit < min_profit {
            Some(AdaptationTrigger::LowAverageProfit)
        } else if stats.success_rate > self.config.success_rate_upper {
            Some(AdaptationTrigger::HighSuccessRate)
        } else {
            None
        };

        let Some(trigger) = trigger else { return };

        let (tolerance_mult, profit_mult) = match trigger {
            AdaptationTrigger::LowSuccessRate | AdaptationTrigger::LowAverageProfit => {
                (dec!(0.9), dec!(1.1))
            }
            AdaptationTrigger::HighSuccessRate => (dec!(1.05), dec!(0.95)),
            AdaptationTrigger::ManualOverride => return,
        };

        let snapshot = {
            let mut parameters = self.parameters.write().await;
            let rate = parameters.adaptation_rate;
            parameters.risk_tolerance *= damp(tolerance_mult, rate);
            parameters.min_profit_threshold *= damp(profit_mult, rate);
            parameters.clamp();
            parameters.clone()
        };

        *self.last_adapted.write().await = Some(Instant::now());

        info!(
            ?trigger,
            success_rate = stats.success_rate,
            samples = stats.samples,
            risk_tolerance = %snapshot.risk_tolerance,
            min_profit_threshold = %snapshot.min_profit_threshold,
            "Strategy parameters adapted"
        );
        self.events.publish(SystemEvent::ParametersAdapted {
            parameters: snapshot,
            trigger,
        });
    }

    /// Applies a manual override to one named parameter and swaps in the
    /// updated set atomically.
    pub async fn set_manual_override(
        &self,
        name: &str,
        value: Decimal,
    ) -> crate::errors::EngineResult<StrategyParameters> {
        let snapshot = {
            let mut parameters = self.parameters.write().await;
            match name {
                "min_profit_threshold" => parameters.min_profit_threshold = value,
                "max_position_size" => parameters.max_position_size = value,
                "risk_tolerance" => parameters.risk_tolerance = value,
                "aggressiveness" => parameters.aggressiveness = value,
                "adaptation_rate" => parameters.adaptation_rate = value,
                "scan_interval_ms" => {
                    parameters.scan_interval_ms =
                        rust_decimal::prelude::ToPrimitive::to_u64(&value).unwrap_or(2_000)
                }
                other => {
                    return Err(crate::errors::EngineError::UnknownParameter {
                        name: other.to_string(),
                    });
                }
            }
            parameters.clamp();
            parameters.clone()
        };

        info!(parameter = name, value = %value, "Manual parameter override");
        self.events.publish(SystemEvent::ParametersAdapted {
            parameters: snapshot.clone(),
            trigger: AdaptationTrigger::ManualOverride,
        });
        Ok(snapshot)
    }

    /// Fraction of resolved decisions whose proceed/skip call matched the
    /// eventual outcome.
    pub async fn decision_accuracy(&self) -> f64 {
        let decisions = self.decisions.read().await;
        let mut resolved = 0usize;
        let mut correct = 0usize;
        for decision in decisions.iter() {
            if let Some(outcome) = decision.outcome {
                resolved += 1;
                if decision.proceed == outcome {
                    correct += 1;
                }
            }
        }
        if resolved == 0 {
            0.0
        } else {
            correct as f64 / resolved as f64
        }
    }

    /// Exponential moving average of per-agent performance, 0.8/0.2 blend.
    pub async fn update_agent_score(&self, agent: &'static str, observation: f64) {
        let mut scores = self.agent_scores.write().await;
        let entry = scores.entry(agent).or_insert(1.0);
        *entry = 0.8 * *entry + 0.2 * observation;
    }

    pub async fn agent_scores(&self) -> HashMap<&'static str, f64> {
        self.agent_scores.read().await.clone()
    }

    pub fn coordination_cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub async fn pattern_log_len(&self) -> usize {
        self.patterns.read().await.len()
    }
}

fn damp(multiplier: Decimal, rate: Decimal) -> Decimal {
    dec!(1) + (multiplier - dec!(1)) * rate
}
