//! Display and printing utilities

use tracing::info;
use crate::coordinator::Decision;
use crate::types::{Execution, Opportunity, SystemStats, SystemStatus};

pub fn print_session_stats(stats: &SystemStats) {
    let runtime_mins = stats.uptime_seconds / 60;

    info!("\n📊 Session Statistics ({} minutes)", runtime_mins);
    info!("   📈 PIPELINE:");
    info!("     Opportunities seen: {}", stats.opportunities_seen);
    info!("     Approved: {}", stats.opportunities_approved);
    info!("     Rejected: {}", stats.opportunities_rejected);

    info!("   🚀 EXECUTIONS:");
    info!("     Succeeded: {}", stats.executions_succeeded);
    info!("     Failed: {}", stats.executions_failed);
    info!("     Expired: {}", stats.executions_expired);
    info!("     Retries: {}", stats.retries_attempted);
    let completed = stats.executions_succeeded + stats.executions_failed;
    info!("     Success rate: {:.1}%",
        if completed > 0 {
            (stats.executions_succeeded as f64 / completed as f64) * 100.0
        } else {
            0.0
        }
    );

    info!("   💰 PROFIT:");
    info!("     Total realized: {:.6}", stats.total_realized_profit);
    info!("     Per hour: {:.6}", stats.profit_per_hour);
    info!("     Decision accuracy: {:.1}%", stats.decision_accuracy * 100.0);
}

pub fn print_system_status(status: &SystemStatus) {
    info!("🏥 Health: {:?} | Breaker: {}",
        status.health,
        if status.circuit_breaker_open { "OPEN" } else { "CLOSED" }
    );
    for component in &status.components {
        info!("   {} | {:?} | restarts: {} | errors: {}",
            component.name, component.state, component.restart_count, component.error_count
        );
    }
}

pub fn print_opportunity(opportunity: &Opportunity, decision: &Decision) {
    info!(
        "💹 {} | {} → {} | net: {:.6} | conf: {} | score: {:.2}/{:.2} | {}",
        opportunity.pair,
        opportunity.source_venue,
        opportunity.destination_venue,
        opportunity.net_profit,
        opportunity.confidence,
        decision.score,
        decision.threshold,
        if decision.proceed { "PROCEED" } else { "SKIP" }
    );
}

pub fn print_execution_result(execution: &Execution) {
    info!(
        "🏁 {} | {:?} | retries: {} | realized: {} | {}",
        execution.id,
        execution.status,
        execution.retry_count,
        execution
            .realized_profit
            .map(|p| format!("{:.6}", p))
            .unwrap_or_else(|| "-".to_string()),
        execution.tx_ref.as_deref().unwrap_or("-")
    );
}
