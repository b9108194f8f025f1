//! Custom error types for the orchestration engine

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Network error during submission: {message}")]
    Network { message: String },

    #[error("Submission timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Nonce conflict: {message}")]
    NonceConflict { message: String },

    #[error("Replacement underpriced: {message}")]
    Underpriced { message: String },

    #[error("Cost estimate {estimate} exceeds approved ceiling {ceiling}")]
    CostCeilingExceeded { estimate: Decimal, ceiling: Decimal },

    #[error("Circuit breaker active: {reason}")]
    CircuitBreakerOpen { reason: String },

    #[error("Execution queue full ({capacity} entries)")]
    QueueFull { capacity: usize },

    #[error("Scheduler is not accepting new work")]
    SchedulerStopped,

    #[error("Component {name} failed to start: {message}")]
    ComponentStart { name: &'static str, message: String },

    #[error("Missing required configuration: {key}")]
    MissingConfig { key: String },

    #[error("Unknown strategy parameter: {name}")]
    UnknownParameter { name: String },
}

impl EngineError {
    /// Network-class failures are worth retrying with backoff; everything
    /// else is terminal for the attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Network { .. }
                | EngineError::Timeout { .. }
                | EngineError::NonceConflict { .. }
                | EngineError::Underpriced { .. }
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
