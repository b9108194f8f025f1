//! Arbitrage Orchestrator - Main Entry Point
//!
//! Wires the simulated feed, the risk evaluator, the execution scheduler and
//! the adaptive coordinator under one supervisor and runs until interrupted.

use arb_orchestrator::*;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    let _logging_guard = utils::setup_logging()?;
    utils::setup_output_directories()?;

    // Load configuration
    let config = CONFIG.clone();

    info!("🤖 Arbitrage Orchestrator v0.5.0 - Multi-Agent Trade Coordination");
    info!("📋 Configuration:");
    info!("   Scan interval: {} ms", config.scan_interval_ms);
    info!("   Min profit threshold: {}", config.min_profit_threshold);
    info!("   Max position size: {}", config.max_position_size);
    info!("   Max concurrent executions: {}", config.max_concurrent_executions);
    info!("   Max retries: {}", config.max_retries);
    info!("   Aggregate exposure cap: {}", config.max_aggregate_exposure);
    info!("   Breaker loss limit: {} over {}s", config.breaker_loss_limit, config.breaker_window_secs);
    info!("   ⚠️  SIMULATION MODE - No real funds at risk");

    // Shared event bus and circuit breaker
    let events = events::EventBus::new();
    let breaker = Arc::new(errors::CircuitBreaker::new(
        config.breaker_window_secs,
        config.breaker_loss_limit,
    ));

    // Components, dependency-injected into the supervisor
    let evaluator = risk::RiskEvaluator::new(
        risk::RiskLimits::from_config(&config),
        breaker,
        events.clone(),
    );

    let coordinator = coordinator::AdaptiveCoordinator::new(
        coordinator::CoordinatorConfig::from_config(&config),
        StrategyParameters::from_config(&config),
        Arc::new(coordinator::SimulatedMarketSampler::default()),
        events.clone(),
    );

    let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
    let scheduler = execution::ExecutionScheduler::new(
        execution::SchedulerConfig::from_config(&config),
        Arc::new(execution::SimulatedExecutionBackend::default()),
        Arc::new(execution::SimulatedCostEstimator::default()),
        evaluator.clone(),
        coordinator.parameters_handle(),
        events.clone(),
        outcome_tx,
    );

    let source = Arc::new(feed::SimulatedOpportunityFeed::new(config.scan_interval_ms));

    let supervisor = supervisor::Supervisor::new(
        supervisor::SupervisorConfig::from_config(&config),
        evaluator,
        scheduler,
        coordinator,
        source,
        outcome_rx,
        events.clone(),
    );

    supervisor.clone().start().await.map_err(|e| {
        error!("Supervisor startup failed: {}", e);
        anyhow::anyhow!("startup failed: {}", e)
    })?;

    // Setup shutdown handler
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
    let shutdown_tx = Arc::new(tokio::sync::Mutex::new(Some(shutdown_tx)));

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("\n📛 Received shutdown signal (Ctrl+C)...");
        if let Some(tx) = shutdown_tx.lock().await.take() {
            let _ = tx.send(());
        }
    });

    info!("\n🚀 Orchestrator running...\n");

    let mut stats_interval = time::interval(Duration::from_secs(60));
    stats_interval.tick().await;

    loop {
        tokio::select! {
            _ = stats_interval.tick() => {
                let stats = supervisor.stats().await;
                utils::print_session_stats(&stats);
                let status = supervisor.system_status().await;
                utils::print_system_status(&status);
            }
            _ = &mut shutdown_rx => {
                info!("Shutdown signal received, stopping supervisor...");
                break;
            }
        }
    }

    supervisor.stop().await;

    let stats = supervisor.stats().await;
    info!("\n🛑 Final statistics:");
    utils::print_session_stats(&stats);

    Ok(())
}
