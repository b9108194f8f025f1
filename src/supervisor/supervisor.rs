//! System supervisor
//!
//! Wires the agents into one event-driven pipeline and owns their lifecycle:
//! ordered startup (risk evaluator and scheduler before the coordinator),
//! ordered shutdown with in-flight draining, periodic health aggregation,
//! bounded component restarts, and emergency stop.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use crate::config::Config;
use crate::coordinator::AdaptiveCoordinator;
use crate::errors::EngineResult;
use crate::events::{EventBus, SystemEvent};
use crate::execution::ExecutionScheduler;
use crate::feed::OpportunitySource;
use crate::risk::RiskEvaluator;
use crate::types::{
    ComponentState, ComponentStatus, Execution, Opportunity, SystemHealth, SystemStats,
    SystemStatus,
};
use crate::utils;

pub const COMPONENT_RISK: &str = "risk_evaluator";
pub const COMPONENT_SCHEDULER: &str = "execution_scheduler";
pub const COMPONENT_COORDINATOR: &str = "adaptive_coordinator";
pub const COMPONENT_SOURCE: &str = "opportunity_source";

/// Startup order; shutdown walks it in reverse.
const STARTUP_ORDER: [&str; 4] = [
    COMPONENT_RISK,
    COMPONENT_SCHEDULER,
    COMPONENT_COORDINATOR,
    COMPONENT_SOURCE,
];

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub health_poll_interval_secs: u64,
    pub stale_component_secs: u64,
    pub restart_cooldown_secs: u64,
    pub max_restart_attempts: u32,
}

impl SupervisorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            health_poll_interval_secs: config.health_poll_interval_secs,
            stale_component_secs: config.stale_component_secs,
            restart_cooldown_secs: config.restart_cooldown_secs,
            max_restart_attempts: config.max_restart_attempts,
        }
    }
}

pub struct Supervisor {
    config: SupervisorConfig,
    evaluator: Arc<RiskEvaluator>,
    scheduler: Arc<ExecutionScheduler>,
    coordinator: Arc<AdaptiveCoordinator>,
    source: Arc<dyn OpportunitySource>,
    events: EventBus,
    components: RwLock<HashMap<&'static str, ComponentStatus>>,
    health: RwLock<SystemHealth>,
    // The pump stops before the scheduler drains; auxiliary loops (sampling,
    // outcomes, health) stop after, so late outcomes still reach the learner.
    pump_shutdown: watch::Sender<bool>,
    aux_shutdown: watch::Sender<bool>,
    outcome_rx: Mutex<Option<mpsc::UnboundedReceiver<Execution>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    opportunities_seen: AtomicU64,
    running: AtomicBool,
    emergency: AtomicBool,
    started_at: Instant,
}

impl Supervisor {
    pub fn new(
        config: SupervisorConfig,
        evaluator: Arc<RiskEvaluator>,
        scheduler: Arc<ExecutionScheduler>,
        coordinator: Arc<AdaptiveCoordinator>,
        source: Arc<dyn OpportunitySource>,
        outcome_rx: mpsc::UnboundedReceiver<Execution>,
        events: EventBus,
    ) -> Arc<Self> {
        let (pump_shutdown, _) = watch::channel(false);
        let (aux_shutdown, _) = watch::channel(false);

        let mut components = HashMap::new();
        for name in STARTUP_ORDER {
            components.insert(
                name,
                ComponentStatus {
                    name,
                    state: ComponentState::Stopped,
                    last_heartbeat: Utc::now(),
                    restart_count: 0,
                    error_count: 0,
                },
            );
        }

        Arc::new(Self {
            config,
            evaluator,
            scheduler,
            coordinator,
            source,
            events,
            components: RwLock::new(components),
            health: RwLock::new(SystemHealth::Healthy),
            pump_shutdown,
            aux_shutdown,
            outcome_rx: Mutex::new(Some(outcome_rx)),
            tasks: Mutex::new(Vec::new()),
            opportunities_seen: AtomicU64::new(0),
            running: AtomicBool::new(false),
            emergency: AtomicBool::new(false),
            started_at: Instant::now(),
        })
    }

    /// Ordered startup. The coordinator's loops start only after the
    /// evaluator and scheduler are running, since it feeds off both.
    pub async fn start(self: Arc<Self>) -> EngineResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Supervisor already running");
            return Ok(());
        }

        info!("🚀 Starting orchestration supervisor...");

        // Risk evaluator: passive component, running once constructed.
        self.set_component_state(COMPONENT_RISK, ComponentState::Starting).await;
        self.set_component_state(COMPONENT_RISK, ComponentState::Running).await;

        // Execution scheduler dispatch loop.
        self.set_component_state(COMPONENT_SCHEDULER, ComponentState::Starting).await;
        {
            let scheduler = self.scheduler.clone();
            let handle = self.clone().spawn_supervised(COMPONENT_SCHEDULER, move || {
                let scheduler = scheduler.clone();
                async move {
                    scheduler.run().await;
                }
            });
            self.tasks.lock().await.push(handle);
        }
        self.set_component_state(COMPONENT_SCHEDULER, ComponentState::Running).await;

        // Adaptive coordinator: market sampling plus the learning loop.
        self.set_component_state(COMPONENT_COORDINATOR, ComponentState::Starting).await;
        {
            let coordinator = self.coordinator.clone();
            let aux_rx = self.aux_shutdown.subscribe();
            let handle = self.clone().spawn_supervised(COMPONENT_COORDINATOR, move || {
                let coordinator = coordinator.clone();
                let aux_rx = aux_rx.clone();
                async move {
                    coordinator.run_sampling(aux_rx).await;
                }
            });
            self.tasks.lock().await.push(handle);
        }
        {
            let outcome_rx = match self.outcome_rx.lock().await.take() {
                Some(rx) => rx,
                // A supervisor cannot be restarted once stopped; the learning
                // channel was consumed by the first start.
                None => {
                    self.running.store(false, Ordering::SeqCst);
                    return Err(crate::errors::EngineError::ComponentStart {
                        name: COMPONENT_COORDINATOR,
                        message: "outcome channel already consumed".to_string(),
                    });
                }
            };
            let coordinator = self.coordinator.clone();
            let aux_rx = self.aux_shutdown.subscribe();
            let handle = tokio::spawn(async move {
                coordinator.run_outcome_loop(outcome_rx, aux_rx).await;
            });
            self.tasks.lock().await.push(handle);
        }
        self.set_component_state(COMPONENT_COORDINATOR, ComponentState::Running).await;

        // Opportunity pipeline pump.
        self.set_component_state(COMPONENT_SOURCE, ComponentState::Starting).await;
        {
            let supervisor = self.clone();
            let pump_rx = self.pump_shutdown.subscribe();
            let handle = self.clone().spawn_supervised(COMPONENT_SOURCE, move || {
                let supervisor = supervisor.clone();
                let pump_rx = pump_rx.clone();
                async move {
                    supervisor.run_pipeline(pump_rx).await;
                }
            });
            self.tasks.lock().await.push(handle);
        }
        self.set_component_state(COMPONENT_SOURCE, ComponentState::Running).await;

        // Health poller.
        {
            let supervisor = self.clone();
            let aux_rx = self.aux_shutdown.subscribe();
            let handle = tokio::spawn(async move {
                supervisor.run_health_poll(aux_rx).await;
            });
            self.tasks.lock().await.push(handle);
        }

        info!("✅ Supervisor started ({} components)", STARTUP_ORDER.len());
        Ok(())
    }

    /// Discovery pipeline: feed → coordinator scoring → risk evaluation →
    /// scheduler queue.
    async fn run_pipeline(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                next = self.source.next() => {
                    self.touch(COMPONENT_SOURCE).await;
                    match next {
                        Some(opportunity) => self.process_opportunity(opportunity).await,
                        None => {
                            let idle_ms = self.coordinator.current_parameters().await.scan_interval_ms;
                            tokio::time::sleep(Duration::from_millis(idle_ms.min(1_000))).await;
                        }
                    }
                }
            }
        }
        info!("Opportunity pipeline stopped");
    }

    async fn process_opportunity(&self, opportunity: Opportunity) {
        self.opportunities_seen.fetch_add(1, Ordering::Relaxed);
        self.events.publish(SystemEvent::OpportunityDetected {
            id: opportunity.id.clone(),
            pair: opportunity.pair.clone(),
            net_profit: opportunity.net_profit,
        });

        let decision = self.coordinator.score(&opportunity).await;
        self.touch(COMPONENT_COORDINATOR).await;
        utils::print_opportunity(&opportunity, &decision);
        if !decision.proceed {
            return;
        }

        let conditions = self.coordinator.current_conditions().await;
        let parameters = self.coordinator.current_parameters().await;
        let evaluation = self
            .evaluator
            .evaluate(&opportunity, &conditions, &parameters)
            .await;
        self.touch(COMPONENT_RISK).await;

        if !evaluation.approved {
            self.events.publish(SystemEvent::OpportunityRejected {
                id: opportunity.id.clone(),
                verdict: evaluation.verdict,
            });
            return;
        }

        let reserved = evaluation.approved_position_size;
        match self.scheduler.queue(opportunity, evaluation).await {
            Ok(_) => self.touch(COMPONENT_SCHEDULER).await,
            Err(e) => {
                // The approval already reserved exposure; give it back or the
                // counter leaks.
                warn!("Failed to queue approved opportunity: {}", e);
                self.evaluator.release_reserved(reserved).await;
            }
        }
    }

    /// Periodic liveness aggregation into a single system health level.
    async fn run_health_poll(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.health_poll_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last_cycles = self.coordinator.coordination_cycles();

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = interval.tick() => {
                    // The sampler heartbeats through its cycle counter.
                    let cycles = self.coordinator.coordination_cycles();
                    if cycles > last_cycles {
                        self.touch(COMPONENT_COORDINATOR).await;
                    }
                    last_cycles = cycles;
                    if self.scheduler.is_accepting() {
                        self.touch(COMPONENT_SCHEDULER).await;
                    }

                    self.detect_stale_components().await;
                    let health = self.aggregate_health().await;
                    *self.health.write().await = health;

                    info!(
                        "🏥 Health: {:?} | active: {} | queued: {} | exposure: {}",
                        health,
                        self.scheduler.active_count(),
                        self.scheduler.queue_depth().await,
                        self.evaluator.current_exposure().await,
                    );
                }
            }
        }
    }

    async fn detect_stale_components(&self) {
        let stale_after = chrono::Duration::seconds(self.config.stale_component_secs as i64);
        let now = Utc::now();
        let mut components = self.components.write().await;
        for status in components.values_mut() {
            if status.state == ComponentState::Running && now - status.last_heartbeat > stale_after
            {
                warn!("⚠️ Component {} appears stale", status.name);
                status.state = ComponentState::Error;
                status.error_count += 1;
            }
        }
    }

    async fn aggregate_health(&self) -> SystemHealth {
        let breaker_open = self.evaluator.is_breaker_open().await;
        let components = self.components.read().await;
        let errored = components
            .values()
            .filter(|c| matches!(c.state, ComponentState::Error | ComponentState::Restarting))
            .count();

        if breaker_open || errored >= 2 {
            SystemHealth::Critical
        } else if errored == 1 {
            SystemHealth::Degraded
        } else {
            SystemHealth::Healthy
        }
    }

    /// Runs a component body, restarting it with a cooldown when it dies
    /// outside of shutdown. Exhausted restart budgets escalate to a
    /// system-wide emergency stop.
    fn spawn_supervised<F, Fut>(self: Arc<Self>, name: &'static str, factory: F) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let supervisor = self;
        tokio::spawn(async move {
            let mut shutdown = supervisor.aux_shutdown.subscribe();
            loop {
                let mut body = tokio::spawn(factory());
                tokio::select! {
                    _ = shutdown.changed() => {
                        body.abort();
                        break;
                    }
                    result = &mut body => {
                        if *supervisor.aux_shutdown.borrow()
                            || *supervisor.pump_shutdown.borrow()
                            || supervisor.emergency.load(Ordering::SeqCst)
                        {
                            break;
                        }
                        match result {
                            Err(e) if e.is_panic() => {
                                error!("Component {} panicked: {:?}", name, e)
                            }
                            _ => warn!("Component {} exited unexpectedly", name),
                        }

                        let restarts = {
                            let mut components = supervisor.components.write().await;
                            let status = components.get_mut(name).expect("known component");
                            status.state = ComponentState::Error;
                            status.error_count += 1;
                            status.restart_count += 1;
                            status.restart_count
                        };
                        supervisor.publish_component_state(name, ComponentState::Error);

                        if restarts > supervisor.config.max_restart_attempts {
                            error!(
                                "Component {} exhausted {} restart attempts",
                                name, supervisor.config.max_restart_attempts
                            );
                            supervisor
                                .emergency_stop(&format!("component {} restart budget exhausted", name))
                                .await;
                            break;
                        }

                        supervisor
                            .set_component_state(name, ComponentState::Restarting)
                            .await;
                        tokio::time::sleep(Duration::from_secs(
                            supervisor.config.restart_cooldown_secs,
                        ))
                        .await;
                        supervisor
                            .set_component_state(name, ComponentState::Running)
                            .await;
                    }
                }
            }
        })
    }

    /// Ordered shutdown: stop feeding the pipeline, drain the scheduler, then
    /// stop the auxiliary loops.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        info!("🛑 Stopping orchestration supervisor...");

        self.source.pause().await;
        self.set_component_state(COMPONENT_SOURCE, ComponentState::Stopped).await;
        let _ = self.pump_shutdown.send(true);

        self.scheduler.stop().await;
        self.set_component_state(COMPONENT_SCHEDULER, ComponentState::Stopped).await;

        let _ = self.aux_shutdown.send(true);
        self.set_component_state(COMPONENT_COORDINATOR, ComponentState::Stopped).await;
        self.set_component_state(COMPONENT_RISK, ComponentState::Stopped).await;

        let mut tasks = self.tasks.lock().await;
        for task in tasks.drain(..) {
            task.abort();
        }

        info!("✅ Supervisor stopped");
    }

    /// Cascades an emergency stop: trips the breaker, stops accepting new
    /// work, tells in-flight attempts to abandon retries, and pauses the
    /// feed.
    pub async fn emergency_stop(&self, reason: &str) {
        error!("🚨 EMERGENCY STOP: {}", reason);
        self.emergency.store(true, Ordering::SeqCst);
        self.events.publish(SystemEvent::EmergencyStop {
            reason: reason.to_string(),
            at: Utc::now(),
        });

        self.evaluator.emergency_stop_all(reason).await;
        self.scheduler.emergency_stop().await;
        self.source.pause().await;

        *self.health.write().await = SystemHealth::Critical;
    }

    /// Clears the circuit breaker after an operator has reviewed the trip.
    pub async fn reset_circuit_breaker(&self) {
        self.evaluator.reset_breaker().await;
    }

    pub async fn set_manual_override(
        &self,
        parameter: &str,
        value: Decimal,
    ) -> EngineResult<()> {
        self.coordinator.set_manual_override(parameter, value).await?;
        Ok(())
    }

    pub async fn system_status(&self) -> SystemStatus {
        let components = self.components.read().await;
        let mut component_list: Vec<ComponentStatus> = STARTUP_ORDER
            .iter()
            .filter_map(|name| components.get(name).cloned())
            .collect();
        component_list.sort_by_key(|c| {
            STARTUP_ORDER
                .iter()
                .position(|n| *n == c.name)
                .unwrap_or(usize::MAX)
        });

        SystemStatus {
            health: *self.health.read().await,
            components: component_list,
            circuit_breaker_open: self.evaluator.is_breaker_open().await,
            stats: self.stats().await,
        }
    }

    pub async fn stats(&self) -> SystemStats {
        let risk_stats = self.evaluator.stats().await;
        let scheduler_stats = self.scheduler.stats().await;
        let uptime_seconds = self.started_at.elapsed().as_secs();

        let profit_per_hour = if uptime_seconds > 0 {
            scheduler_stats.total_realized_profit * Decimal::from(3_600u64)
                / Decimal::from_u64(uptime_seconds).unwrap_or(Decimal::ONE)
        } else {
            Decimal::ZERO
        };

        SystemStats {
            opportunities_seen: self.opportunities_seen.load(Ordering::Relaxed),
            opportunities_approved: risk_stats.approved,
            opportunities_rejected: risk_stats.rejected,
            executions_succeeded: scheduler_stats.succeeded,
            executions_failed: scheduler_stats.failed,
            executions_expired: scheduler_stats.expired,
            retries_attempted: scheduler_stats.retries,
            total_realized_profit: scheduler_stats.total_realized_profit,
            profit_per_hour,
            decision_accuracy: self.coordinator.decision_accuracy().await,
            uptime_seconds,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn touch(&self, name: &'static str) {
        let mut components = self.components.write().await;
        if let Some(status) = components.get_mut(name) {
            status.last_heartbeat = Utc::now();
        }
    }

    async fn set_component_state(&self, name: &'static str, state: ComponentState) {
        {
            let mut components = self.components.write().await;
            if let Some(status) = components.get_mut(name) {
                status.state = state;
                status.last_heartbeat = Utc::now();
            }
        }
        self.publish_component_state(name, state);
    }

    fn publish_component_state(&self, name: &'static str, state: ComponentState) {
        self.events.publish(SystemEvent::ComponentStateChanged {
            component: name,
            state,
        });
    }
}
