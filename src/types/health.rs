//! Health and lifecycle types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Lifecycle state of one supervised component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComponentState {
    Stopped,
    Starting,
    Running,
    Error,
    Restarting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SystemHealth {
    Healthy,
    Degraded,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentStatus {
    pub name: &'static str,
    pub state: ComponentState,
    pub last_heartbeat: DateTime<Utc>,
    pub restart_count: u32,
    pub error_count: u32,
}

/// Aggregated counters exposed through the supervisor's status surface.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStats {
    pub opportunities_seen: u64,
    pub opportunities_approved: u64,
    pub opportunities_rejected: u64,
    pub executions_succeeded: u64,
    pub executions_failed: u64,
    pub executions_expired: u64,
    pub retries_attempted: u64,
    pub total_realized_profit: Decimal,
    pub profit_per_hour: Decimal,
    pub decision_accuracy: f64,
    pub uptime_seconds: u64,
}

impl Default for SystemStats {
    fn default() -> Self {
        Self {
            opportunities_seen: 0,
            opportunities_approved: 0,
            opportunities_rejected: 0,
            executions_succeeded: 0,
            executions_failed: 0,
            executions_expired: 0,
            retries_attempted: 0,
            total_realized_profit: Decimal::ZERO,
            profit_per_hour: Decimal::ZERO,
            decision_accuracy: 0.0,
            uptime_seconds: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub health: SystemHealth,
    pub components: Vec<ComponentStatus>,
    pub circuit_breaker_open: bool,
    pub stats: SystemStats,
}
