//! Adaptive coordinator tests: scoring defaults, adaptation rules, decision
//! accuracy, manual overrides, condition-change events.

mod common;

use common::*;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use arb_orchestrator::coordinator::{AdaptiveCoordinator, CoordinatorConfig};
use arb_orchestrator::events::{EventBus, SystemEvent};
use arb_orchestrator::types::{
    ConditionLevel, Execution, ExecutionStatus, MarketConditions, Opportunity,
};

fn coordinator_config() -> CoordinatorConfig {
    CoordinatorConfig {
        sample_interval_secs: 1,
        adaptation_window_secs: 3_600,
        success_rate_floor: 0.4,
        success_rate_upper: 0.75,
        min_adaptation_samples: 10,
        persist_records: false,
    }
}

fn build_coordinator(events: EventBus) -> Arc<AdaptiveCoordinator> {
    AdaptiveCoordinator::new(
        coordinator_config(),
        parameters(),
        Arc::new(FixedSampler(MarketConditions::default())),
        events,
    )
}

fn terminal_execution(opportunity: Opportunity, success: bool) -> Execution {
    let eval = approved_evaluation(dec!(1), dec!(0.05));
    let mut execution = Execution::new(opportunity, eval, 3);
    execution.status = if success {
        ExecutionStatus::Succeeded
    } else {
        ExecutionStatus::Failed
    };
    execution.realized_profit = Some(if success { dec!(0.02) } else { dec!(-0.01) });
    execution
}

#[tokio::test]
async fn unseen_patterns_score_neutral() {
    let coordinator = build_coordinator(EventBus::new());
    let opp = opportunity("NEW/PAIR", dec!(0.03), dec!(1), 80);
    let decision = coordinator.score(&opp).await;
    assert!((decision.factors.historical - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn sustained_failures_tighten_parameters() {
    let coordinator = build_coordinator(EventBus::new());

    for i in 0..12 {
        let opp = opportunity(&format!("P{}", i), dec!(0.02), dec!(1), 85);
        coordinator
            .on_execution_outcome(&terminal_execution(opp, false))
            .await;
    }

    let params = coordinator.current_parameters().await;
    assert_eq!(params.risk_tolerance, dec!(0.45));
    assert_eq!(params.min_profit_threshold, dec!(0.011));
}

#[tokio::test]
async fn sustained_success_loosens_parameters() {
    let coordinator = build_coordinator(EventBus::new());

    for i in 0..12 {
        let opp = opportunity(&format!("P{}", i), dec!(0.02), dec!(1), 85);
        coordinator
            .on_execution_outcome(&terminal_execution(opp, true))
            .await;
    }

    let params = coordinator.current_parameters().await;
    assert_eq!(params.risk_tolerance, dec!(0.525));
    assert_eq!(params.min_profit_threshold, dec!(0.0095));
}

#[tokio::test]
async fn decision_accuracy_tracks_outcomes() {
    let coordinator = build_coordinator(EventBus::new());

    let opp = opportunity("WETH/USDC", dec!(0.05), dec!(1), 90);
    let decision = coordinator.score(&opp).await;
    assert!(decision.proceed);

    coordinator
        .on_execution_outcome(&terminal_execution(opp, true))
        .await;
    assert!((coordinator.decision_accuracy().await - 1.0).abs() < 1e-9);

    let opp = opportunity("WETH/USDC", dec!(0.05), dec!(1), 90);
    let decision = coordinator.score(&opp).await;
    assert!(decision.proceed);
    coordinator
        .on_execution_outcome(&terminal_execution(opp, false))
        .await;
    assert!((coordinator.decision_accuracy().await - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn manual_override_swaps_single_parameter() {
    let coordinator = build_coordinator(EventBus::new());

    coordinator
        .set_manual_override("risk_tolerance", dec!(0.8))
        .await
        .unwrap();
    assert_eq!(coordinator.current_parameters().await.risk_tolerance, dec!(0.8));

    assert!(
        coordinator
            .set_manual_override("no_such_knob", dec!(1))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn condition_change_emits_event() {
    let events = EventBus::new();
    let mut receiver = events.subscribe();

    let stressed = MarketConditions {
        volatility: ConditionLevel::High,
        liquidity: ConditionLevel::Low,
        execution_cost: ConditionLevel::High,
        competition: ConditionLevel::High,
    };
    let coordinator = AdaptiveCoordinator::new(
        coordinator_config(),
        parameters(),
        Arc::new(FixedSampler(stressed)),
        events,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sampling = tokio::spawn(coordinator.clone().run_sampling(shutdown_rx));

    let event = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match receiver.recv().await {
                Ok(SystemEvent::MarketConditionsChanged { current, .. }) => break current,
                Ok(_) => continue,
                Err(e) => panic!("event bus closed: {}", e),
            }
        }
    })
    .await
    .expect("no condition change event");

    assert_eq!(event, stressed);
    assert_eq!(coordinator.current_conditions().await, stressed);

    let _ = shutdown_tx.send(true);
    let _ = sampling.await;
}
