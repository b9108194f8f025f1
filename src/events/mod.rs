//! Typed inter-agent events
//!
//! Components publish discrete, typed events on a broadcast bus instead of
//! registering ad-hoc listeners on each other. Subscribers that fall behind
//! lose oldest events first; every event is also traced.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tracing::debug;
use crate::types::{ComponentState, MarketConditions, RiskVerdict, StrategyParameters};

pub const EVENT_BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub enum SystemEvent {
    OpportunityDetected {
        id: String,
        pair: String,
        net_profit: Decimal,
    },
    OpportunityRejected {
        id: String,
        verdict: RiskVerdict,
    },
    ExecutionQueued {
        execution_id: String,
        priority: i64,
    },
    ExecutionStarted {
        execution_id: String,
        attempt: u32,
    },
    ExecutionSucceeded {
        execution_id: String,
        realized_profit: Decimal,
    },
    ExecutionFailed {
        execution_id: String,
        reason: String,
    },
    ExecutionExpired {
        execution_id: String,
    },
    MarketConditionsChanged {
        previous: MarketConditions,
        current: MarketConditions,
    },
    ParametersAdapted {
        parameters: StrategyParameters,
        trigger: AdaptationTrigger,
    },
    CircuitBreakerTripped {
        reason: String,
    },
    EmergencyStop {
        reason: String,
        at: DateTime<Utc>,
    },
    ComponentStateChanged {
        component: &'static str,
        state: ComponentState,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptationTrigger {
    LowSuccessRate,
    HighSuccessRate,
    LowAverageProfit,
    ManualOverride,
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SystemEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self { sender }
    }

    /// Publishing never fails: with no live subscribers the event is only
    /// traced.
    pub fn publish(&self, event: SystemEvent) {
        debug!(?event, "system event");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SystemEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
