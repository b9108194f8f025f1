#![allow(dead_code)]

//! Shared deterministic fixtures for integration tests

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use arb_orchestrator::coordinator::MarketSampler;
use arb_orchestrator::errors::{CircuitBreaker, EngineError, EngineResult};
use arb_orchestrator::events::EventBus;
use arb_orchestrator::execution::{
    CostEstimator, ExecutionBackend, ExecutionScheduler, SchedulerConfig,
};
use arb_orchestrator::feed::OpportunitySource;
use arb_orchestrator::risk::{RiskEvaluator, RiskLimits};
use arb_orchestrator::types::{
    Execution, ExecutionParams, MarketConditions, Opportunity, RiskEvaluation, RiskVerdict,
    StrategyParameters, SubmissionResult, SubmissionStatus,
};

pub fn opportunity(pair: &str, profit: Decimal, volume: Decimal, confidence: u8) -> Opportunity {
    opportunity_with_ttl(pair, profit, volume, confidence, 60)
}

pub fn opportunity_with_ttl(
    pair: &str,
    profit: Decimal,
    volume: Decimal,
    confidence: u8,
    ttl_secs: i64,
) -> Opportunity {
    let now = Utc::now();
    Opportunity {
        id: uuid::Uuid::new_v4().to_string(),
        pair: pair.to_string(),
        source_venue: "uniswap_v3".to_string(),
        destination_venue: "sushiswap".to_string(),
        source_price: dec!(1),
        destination_price: dec!(1) + profit,
        volume,
        expected_profit: profit,
        net_profit: profit,
        confidence,
        created_at: now,
        expires_at: now + ChronoDuration::seconds(ttl_secs),
    }
}

pub fn parameters() -> StrategyParameters {
    StrategyParameters {
        scan_interval_ms: 10,
        min_profit_threshold: dec!(0.01),
        max_position_size: dec!(10),
        risk_tolerance: dec!(0.5),
        aggressiveness: dec!(0.5),
        adaptation_rate: dec!(1),
    }
}

pub fn limits() -> RiskLimits {
    RiskLimits {
        confidence_floor: 60,
        max_aggregate_exposure: dec!(100),
        daily_loss_limit: dec!(100),
    }
}

pub fn approved_evaluation(volume: Decimal, ceiling: Decimal) -> RiskEvaluation {
    RiskEvaluation {
        approved: true,
        verdict: RiskVerdict::Approved,
        approved_position_size: volume,
        max_cost_ceiling: ceiling,
        conditions: MarketConditions::default(),
    }
}

/// Scripted submission outcomes, consumed in submission order; once the
/// script drains every further submission succeeds with the given profit.
#[derive(Debug, Clone, Copy)]
pub enum BackendStep {
    Succeed { profit: Decimal },
    Revert,
    NetworkError,
}

pub struct ScriptedBackend {
    steps: Mutex<VecDeque<BackendStep>>,
    default_profit: Decimal,
    latency: Duration,
    pub submission_order: Mutex<Vec<String>>,
    pub submissions: AtomicUsize,
    concurrent: AtomicUsize,
    pub max_concurrent: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(steps: Vec<BackendStep>, latency_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            default_profit: dec!(0.01),
            latency: Duration::from_millis(latency_ms),
            submission_order: Mutex::new(Vec::new()),
            submissions: AtomicUsize::new(0),
            concurrent: AtomicUsize::new(0),
            max_concurrent: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ExecutionBackend for ScriptedBackend {
    async fn submit(&self, params: &ExecutionParams) -> EngineResult<SubmissionResult> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        let now = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now, Ordering::SeqCst);
        self.submission_order.lock().await.push(params.pair.clone());

        tokio::time::sleep(self.latency).await;
        let step = self.steps.lock().await.pop_front();
        self.concurrent.fetch_sub(1, Ordering::SeqCst);

        match step.unwrap_or(BackendStep::Succeed {
            profit: self.default_profit,
        }) {
            BackendStep::Succeed { profit } => Ok(SubmissionResult {
                status: SubmissionStatus::Success,
                tx_ref: Some(format!("0x{}", uuid::Uuid::new_v4().simple())),
                cost_used: dec!(0.001),
                realized_profit: profit,
            }),
            BackendStep::Revert => Ok(SubmissionResult {
                status: SubmissionStatus::Reverted,
                tx_ref: None,
                cost_used: dec!(0.001),
                realized_profit: dec!(-0.001),
            }),
            BackendStep::NetworkError => Err(EngineError::Network {
                message: "network timeout".to_string(),
            }),
        }
    }
}

pub struct FixedCostEstimator(pub Decimal);

#[async_trait]
impl CostEstimator for FixedCostEstimator {
    async fn estimate(&self, _params: &ExecutionParams) -> EngineResult<Decimal> {
        Ok(self.0)
    }
}

/// Sampler that always reports the same conditions, keeping scoring
/// deterministic in tests.
pub struct FixedSampler(pub MarketConditions);

impl MarketSampler for FixedSampler {
    fn sample(&self, _previous: &MarketConditions) -> MarketConditions {
        self.0
    }
}

/// Feed that drains a fixed list of opportunities, then idles.
pub struct StaticFeed {
    items: Mutex<VecDeque<Opportunity>>,
    paused: AtomicBool,
}

impl StaticFeed {
    pub fn new(items: Vec<Opportunity>) -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(items.into()),
            paused: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl OpportunitySource for StaticFeed {
    async fn next(&self) -> Option<Opportunity> {
        if self.paused.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(10)).await;
            return None;
        }
        let next = self.items.lock().await.pop_front();
        if next.is_none() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        next
    }

    async fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    async fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    async fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

pub struct TestRig {
    pub scheduler: Arc<ExecutionScheduler>,
    pub evaluator: Arc<RiskEvaluator>,
    pub events: EventBus,
    pub outcomes: mpsc::UnboundedReceiver<Execution>,
}

pub fn scheduler_config(max_concurrent: usize, max_retries: u32) -> SchedulerConfig {
    SchedulerConfig {
        max_concurrent_executions: max_concurrent,
        max_retries,
        retry_base_delay_ms: 5,
        queue_capacity: 64,
        drain_grace_secs: 5,
        history_capacity: 1_000,
        persist_records: false,
    }
}

/// Scheduler + evaluator wired like the supervisor does it, minus the
/// coordinator loops, for direct protocol-level tests.
pub fn build_rig(
    backend: Arc<dyn ExecutionBackend>,
    cost: Arc<dyn CostEstimator>,
    config: SchedulerConfig,
) -> TestRig {
    let events = EventBus::new();
    let breaker = Arc::new(CircuitBreaker::new(3_600, dec!(1000)));
    let evaluator = RiskEvaluator::new(limits(), breaker, events.clone());
    let (outcome_tx, outcomes) = mpsc::unbounded_channel();
    let parameters = Arc::new(tokio::sync::RwLock::new(parameters()));
    let scheduler = ExecutionScheduler::new(
        config,
        backend,
        cost,
        evaluator.clone(),
        parameters,
        events.clone(),
        outcome_tx,
    );
    TestRig {
        scheduler,
        evaluator,
        events,
        outcomes,
    }
}

/// Receives `n` terminal outcomes, failing the test on timeout.
pub async fn collect_outcomes(
    outcomes: &mut mpsc::UnboundedReceiver<Execution>,
    n: usize,
) -> Vec<Execution> {
    let mut collected = Vec::with_capacity(n);
    for _ in 0..n {
        let execution = tokio::time::timeout(Duration::from_secs(10), outcomes.recv())
            .await
            .expect("timed out waiting for terminal outcome")
            .expect("outcome channel closed");
        collected.push(execution);
    }
    collected
}
