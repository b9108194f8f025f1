//! Execution scheduler
//!
//! Owns the priority queue and every execution from dequeue to terminal
//! status. Concurrency is bounded by a counting semaphore rather than a
//! queue-wide lock, so queueing never blocks and in-flight work never blocks
//! the dequeue loop.

use chrono::Utc;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify, OwnedSemaphorePermit, RwLock, Semaphore, mpsc};
use tracing::{debug, error, info, warn};
use crate::config::{
    Config, FLASH_LOAN_FEE_RATE, SIZING_FULL_MARGIN, SIZING_HALF_MARGIN,
    SIZING_THREE_QUARTER_MARGIN, SLIPPAGE_BUFFER,
};
use crate::errors::{EngineError, EngineResult};
use crate::events::{EventBus, SystemEvent};
use crate::risk::RiskEvaluator;
use crate::storage;
use crate::types::{
    Execution, ExecutionParams, ExecutionStatus, Opportunity, RiskEvaluation, SubmissionResult,
    SubmissionStatus, StrategyParameters,
};
use super::{CostEstimator, ExecutionBackend, ExecutionHistory, PriorityQueue};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_concurrent_executions: usize,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub queue_capacity: usize,
    pub drain_grace_secs: u64,
    pub history_capacity: usize,
    pub persist_records: bool,
}

impl SchedulerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_concurrent_executions: config.max_concurrent_executions,
            max_retries: config.max_retries,
            retry_base_delay_ms: config.retry_base_delay_ms,
            queue_capacity: config.queue_capacity,
            drain_grace_secs: config.drain_grace_secs,
            history_capacity: crate::config::EXECUTION_HISTORY_CAPACITY,
            persist_records: config.persist_records,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchedulerStats {
    pub queued: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub expired: u64,
    pub retries: u64,
    pub total_realized_profit: rust_decimal::Decimal,
}

enum AttemptOutcome {
    Settled(SubmissionResult),
    Abort(String),
    Transient(EngineError),
}

pub struct ExecutionScheduler {
    queue: Mutex<PriorityQueue>,
    queue_notify: Notify,
    permits: Arc<Semaphore>,
    backend: Arc<dyn ExecutionBackend>,
    cost_estimator: Arc<dyn CostEstimator>,
    risk: Arc<RiskEvaluator>,
    events: EventBus,
    outcome_tx: mpsc::UnboundedSender<Execution>,
    history: RwLock<ExecutionHistory>,
    parameters: Arc<RwLock<StrategyParameters>>,
    stats: RwLock<SchedulerStats>,
    active: AtomicUsize,
    accepting: AtomicBool,
    abandon_retries: AtomicBool,
    config: SchedulerConfig,
}

impl ExecutionScheduler {
    pub fn new(
        config: SchedulerConfig,
        backend: Arc<dyn ExecutionBackend>,
        cost_estimator: Arc<dyn CostEstimator>,
        risk: Arc<RiskEvaluator>,
        parameters: Arc<RwLock<StrategyParameters>>,
        events: EventBus,
        outcome_tx: mpsc::UnboundedSender<Execution>,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(PriorityQueue::new(config.queue_capacity)),
            queue_notify: Notify::new(),
            permits: Arc::new(Semaphore::new(config.max_concurrent_executions)),
            backend,
            cost_estimator,
            risk,
            events,
            outcome_tx,
            history: RwLock::new(ExecutionHistory::new(config.history_capacity)),
            parameters,
            stats: RwLock::new(SchedulerStats::default()),
            active: AtomicUsize::new(0),
            accepting: AtomicBool::new(true),
            abandon_retries: AtomicBool::new(false),
            config,
        })
    }

    /// Non-blocking priority insert. The opportunity must already carry its
    /// risk evaluation; nothing enters the queue unevaluated.
    pub async fn queue(
        &self,
        opportunity: Opportunity,
        evaluation: RiskEvaluation,
    ) -> EngineResult<String> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(EngineError::SchedulerStopped);
        }

        let execution = Execution::new(opportunity, evaluation, self.config.max_retries);
        let execution_id = execution.id.clone();
        let priority = execution.priority;

        self.queue.lock().await.push(execution)?;
        self.stats.write().await.queued += 1;
        self.events.publish(SystemEvent::ExecutionQueued {
            execution_id: execution_id.clone(),
            priority,
        });
        self.queue_notify.notify_one();

        Ok(execution_id)
    }

    /// Continuously-active dispatch loop. Acquires an admission permit first,
    /// then waits for queued work, so at most `max_concurrent_executions`
    /// attempts are ever in flight.
    pub async fn run(self: Arc<Self>) {
        info!(
            "Execution scheduler running (concurrency limit {})",
            self.config.max_concurrent_executions
        );

        loop {
            let permit = match self.permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                // Semaphore is closed during shutdown.
                Err(_) => break,
            };

            let execution = loop {
                if let Some(execution) = self.queue.lock().await.pop() {
                    break execution;
                }
                if !self.accepting.load(Ordering::SeqCst) {
                    return;
                }
                self.queue_notify.notified().await;
                if !self.accepting.load(Ordering::SeqCst) {
                    return;
                }
            };

            self.active.fetch_add(1, Ordering::SeqCst);
            let scheduler = self.clone();
            tokio::spawn(async move {
                scheduler.drive(execution, permit).await;
            });
        }

        info!("Execution scheduler dispatch loop exited");
    }

    /// Runs one execution to a terminal status, retrying transient submission
    /// failures with exponential backoff. The admission permit is held for
    /// the whole attempt chain, which keeps a retrying execution ahead of all
    /// queued work.
    async fn drive(self: Arc<Self>, mut execution: Execution, _permit: OwnedSemaphorePermit) {
        if execution.opportunity.is_expired() {
            debug!(execution_id = %execution.id, "opportunity expired before dispatch");
            self.finish(
                execution,
                ExecutionStatus::Expired,
                None,
                Some("expired before dispatch".to_string()),
            )
            .await;
            return;
        }

        execution.started_at = Some(Utc::now());
        execution.status = ExecutionStatus::Executing;
        self.events.publish(SystemEvent::ExecutionStarted {
            execution_id: execution.id.clone(),
            attempt: execution.retry_count,
        });

        let params = self.build_params(&execution).await;

        loop {
            let outcome = self.attempt(&execution, &params).await;
            match outcome {
                AttemptOutcome::Settled(result) => {
                    match result.status {
                        SubmissionStatus::Success => {
                            self.finish(execution, ExecutionStatus::Succeeded, Some(result), None)
                                .await;
                        }
                        SubmissionStatus::Reverted => {
                            self.finish(
                                execution,
                                ExecutionStatus::Failed,
                                Some(result),
                                Some("reverted on-chain".to_string()),
                            )
                            .await;
                        }
                    }
                    return;
                }
                AttemptOutcome::Abort(reason) => {
                    self.finish(execution, ExecutionStatus::Failed, None, Some(reason))
                        .await;
                    return;
                }
                AttemptOutcome::Transient(err) => {
                    let abandoned = self.abandon_retries.load(Ordering::SeqCst);
                    if abandoned || execution.retry_count >= execution.max_retries {
                        let reason = if abandoned {
                            format!("{} (retries abandoned by emergency stop)", err)
                        } else {
                            format!("{} (after {} retries)", err, execution.retry_count)
                        };
                        self.finish(execution, ExecutionStatus::Failed, None, Some(reason))
                            .await;
                        return;
                    }

                    let delay = self.backoff_delay(execution.retry_count);
                    execution.retry_count += 1;
                    self.stats.write().await.retries += 1;
                    warn!(
                        execution_id = %execution.id,
                        attempt = execution.retry_count,
                        max_retries = execution.max_retries,
                        "Retryable submission failure: {}. Backing off {:?}",
                        err, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// One submission attempt: cost-ceiling pre-check, then backend submit.
    async fn attempt(&self, execution: &Execution, params: &ExecutionParams) -> AttemptOutcome {
        match self.cost_estimator.estimate(params).await {
            Ok(estimate) if estimate > execution.evaluation.max_cost_ceiling => {
                return AttemptOutcome::Abort(
                    EngineError::CostCeilingExceeded {
                        estimate,
                        ceiling: execution.evaluation.max_cost_ceiling,
                    }
                    .to_string(),
                );
            }
            Ok(_) => {}
            Err(err) if err.is_retryable() => return AttemptOutcome::Transient(err),
            Err(err) => return AttemptOutcome::Abort(err.to_string()),
        }

        match self.backend.submit(params).await {
            Ok(result) => AttemptOutcome::Settled(result),
            Err(err) if err.is_retryable() => AttemptOutcome::Transient(err),
            Err(err) => AttemptOutcome::Abort(err.to_string()),
        }
    }

    /// Venue routing, margin-bucketed sizing, and the slippage-buffered
    /// profit floor for one execution.
    async fn build_params(&self, execution: &Execution) -> ExecutionParams {
        let strategy = self.parameters.read().await.clone();
        let opportunity = &execution.opportunity;

        let (buy_venue, sell_venue) = if opportunity.source_price <= opportunity.destination_price
        {
            (
                opportunity.source_venue.clone(),
                opportunity.destination_venue.clone(),
            )
        } else {
            (
                opportunity.destination_venue.clone(),
                opportunity.source_venue.clone(),
            )
        };

        // Thinner margins commit less size.
        let profit_pct = opportunity.profit_pct();
        let sizing_factor = if profit_pct >= SIZING_FULL_MARGIN {
            dec!(1)
        } else if profit_pct >= SIZING_THREE_QUARTER_MARGIN {
            dec!(0.75)
        } else if profit_pct >= SIZING_HALF_MARGIN {
            dec!(0.5)
        } else {
            dec!(0.25)
        };

        let volume = (execution.evaluation.approved_position_size
            * sizing_factor
            * (dec!(1) - FLASH_LOAN_FEE_RATE))
            .min(strategy.max_position_size);

        let min_acceptable_profit = (opportunity.net_profit * (dec!(1) - SLIPPAGE_BUFFER))
            .max(strategy.min_profit_threshold);

        ExecutionParams {
            execution_id: execution.id.clone(),
            pair: opportunity.pair.clone(),
            buy_venue,
            sell_venue,
            volume,
            min_acceptable_profit,
            cost_ceiling: execution.evaluation.max_cost_ceiling,
        }
    }

    fn backoff_delay(&self, retry_count: u32) -> Duration {
        let exp = self
            .config
            .retry_base_delay_ms
            .saturating_mul(1u64 << retry_count.min(16));
        let jitter = (exp as f64 * 0.1 * (rand::random::<f64>() - 0.5)) as i64;
        Duration::from_millis((exp as i64).saturating_add(jitter).max(0) as u64)
    }

    /// Single terminal transition point: updates the record, notifies the
    /// risk evaluator and the learning feedback channel, appends history, and
    /// emits the terminal event. Called exactly once per execution.
    async fn finish(
        &self,
        mut execution: Execution,
        status: ExecutionStatus,
        result: Option<SubmissionResult>,
        error_detail: Option<String>,
    ) {
        debug_assert!(execution.status.can_transition_to(status));
        execution.completed_at = Some(Utc::now());
        execution.status = status;
        execution.error_detail = error_detail;

        if let Some(result) = result {
            execution.tx_ref = result.tx_ref;
            execution.cost_used = Some(result.cost_used);
            execution.realized_profit = Some(result.realized_profit);
        }

        {
            let mut stats = self.stats.write().await;
            match status {
                ExecutionStatus::Succeeded => {
                    stats.succeeded += 1;
                    if let Some(profit) = execution.realized_profit {
                        stats.total_realized_profit += profit;
                    }
                }
                ExecutionStatus::Failed => stats.failed += 1,
                ExecutionStatus::Expired => stats.expired += 1,
                _ => {}
            }
        }

        match status {
            ExecutionStatus::Succeeded => {
                let realized = execution.realized_profit.unwrap_or_default();
                info!(
                    execution_id = %execution.id,
                    pair = %execution.opportunity.pair,
                    realized_profit = %realized,
                    "Execution succeeded"
                );
                self.events.publish(SystemEvent::ExecutionSucceeded {
                    execution_id: execution.id.clone(),
                    realized_profit: realized,
                });
            }
            ExecutionStatus::Failed => {
                let reason = execution
                    .error_detail
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string());
                warn!(execution_id = %execution.id, %reason, "Execution failed");
                self.events.publish(SystemEvent::ExecutionFailed {
                    execution_id: execution.id.clone(),
                    reason,
                });
            }
            ExecutionStatus::Expired => {
                self.events.publish(SystemEvent::ExecutionExpired {
                    execution_id: execution.id.clone(),
                });
            }
            _ => {}
        }

        // Exposure release and loss-window accounting happen on every
        // terminal path, or the evaluator's counter would leak.
        self.risk.on_execution_terminal(&execution).await;

        self.history.write().await.push(execution.clone());

        if self.config.persist_records {
            if let Err(e) = storage::save_execution(&execution) {
                error!("Failed to persist execution record: {}", e);
            }
        }

        if self.outcome_tx.send(execution).is_err() {
            debug!("learning feedback channel closed");
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    /// Stops dequeuing and lets in-flight executions finish naturally, up to
    /// the configured grace timeout.
    pub async fn stop(&self) {
        info!("Stopping execution scheduler...");
        self.accepting.store(false, Ordering::SeqCst);
        self.queue_notify.notify_waiters();
        self.queue_notify.notify_one();
        self.permits.close();

        let deadline = Instant::now() + Duration::from_secs(self.config.drain_grace_secs);
        while self.active.load(Ordering::SeqCst) > 0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let remaining = self.active.load(Ordering::SeqCst);
        if remaining > 0 {
            warn!("{} executions still in flight after drain grace period", remaining);
        } else {
            info!("Execution scheduler drained");
        }
    }

    /// Stop, and additionally instruct in-flight attempts to abandon their
    /// remaining retries once the current attempt resolves.
    pub async fn emergency_stop(&self) {
        self.abandon_retries.store(true, Ordering::SeqCst);
        self.stop().await;
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub async fn queue_depth(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn stats(&self) -> SchedulerStats {
        self.stats.read().await.clone()
    }

    pub async fn recent_history(&self, n: usize) -> Vec<Execution> {
        self.history.read().await.recent(n)
    }

    pub async fn history_len(&self) -> usize {
        self.history.read().await.len()
    }
}
