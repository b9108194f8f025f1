//! Trade execution types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::Serialize;
use super::{Opportunity, RiskEvaluation};

/// The unit of work tracked by the scheduler. Created when an opportunity is
/// approved; owned exclusively by the scheduler until it reaches a terminal
/// status, then moved into the bounded history ring.
#[derive(Debug, Clone, Serialize)]
pub struct Execution {
    pub id: String,
    pub opportunity: Opportunity,
    pub evaluation: RiskEvaluation,
    /// Monotonic in expected profit percentage; larger is served first.
    pub priority: i64,
    pub retry_count: u32,
    pub max_retries: u32,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: ExecutionStatus,
    pub tx_ref: Option<String>,
    pub realized_profit: Option<Decimal>,
    pub cost_used: Option<Decimal>,
    pub error_detail: Option<String>,
}

impl Execution {
    pub fn new(opportunity: Opportunity, evaluation: RiskEvaluation, max_retries: u32) -> Self {
        let priority = derive_priority(opportunity.profit_pct());
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            opportunity,
            evaluation,
            priority,
            retry_count: 0,
            max_retries,
            queued_at: Utc::now(),
            started_at: None,
            completed_at: None,
            status: ExecutionStatus::Queued,
            tx_ref: None,
            realized_profit: None,
            cost_used: None,
            error_detail: None,
        }
    }
}

/// Fixed-point rendering of the profit percentage so a strictly higher profit
/// percentage always maps to a strictly higher priority. Ties are broken FIFO
/// by the queue itself.
pub fn derive_priority(profit_pct: Decimal) -> i64 {
    (profit_pct * dec!(1_000_000)).to_i64().unwrap_or(i64::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExecutionStatus {
    Queued,
    Executing,
    Succeeded,
    Failed,
    Expired,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Succeeded | ExecutionStatus::Failed | ExecutionStatus::Expired
        )
    }

    /// Transitions are monotonic: a status never moves back to an earlier
    /// stage, and terminal statuses never change.
    pub fn can_transition_to(&self, next: ExecutionStatus) -> bool {
        match (self, next) {
            (ExecutionStatus::Queued, ExecutionStatus::Executing) => true,
            (ExecutionStatus::Queued, ExecutionStatus::Expired) => true,
            (ExecutionStatus::Queued, ExecutionStatus::Failed) => true,
            (ExecutionStatus::Executing, s) if s.is_terminal() => true,
            _ => false,
        }
    }
}

/// Parameters handed to the execution backend for one submission attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionParams {
    pub execution_id: String,
    pub pair: String,
    pub buy_venue: String,
    pub sell_venue: String,
    /// Cost-aware sized volume, never above the evaluator-approved size.
    pub volume: Decimal,
    /// Floor on acceptable profit after the slippage buffer.
    pub min_acceptable_profit: Decimal,
    pub cost_ceiling: Decimal,
}

/// Terminal outcome reported by the execution backend for one submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResult {
    pub status: SubmissionStatus,
    pub tx_ref: Option<String>,
    pub cost_used: Decimal,
    pub realized_profit: Decimal,
}

/// On-chain-terminal submission statuses. Transport-level failures surface as
/// errors instead and go through retry classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubmissionStatus {
    Success,
    Reverted,
}
