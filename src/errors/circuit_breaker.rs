//! Circuit breaker implementation
//!
//! Trips when realized losses over a rolling window exceed the configured
//! limit, or when tripped explicitly by an emergency stop. Once open, every
//! risk evaluation is rejected until the breaker is cleared.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{error, info};

#[derive(Debug, Clone, Default)]
struct BreakerState {
    is_open: bool,
    reason: Option<String>,
    tripped_at: Option<DateTime<Utc>>,
}

pub struct CircuitBreaker {
    state: Arc<RwLock<BreakerState>>,
    losses: Arc<RwLock<VecDeque<(Instant, Decimal)>>>,
    window: Duration,
    loss_limit: Decimal,
}

impl CircuitBreaker {
    pub fn new(window_secs: u64, loss_limit: Decimal) -> Self {
        Self {
            state: Arc::new(RwLock::new(BreakerState::default())),
            losses: Arc::new(RwLock::new(VecDeque::new())),
            window: Duration::from_secs(window_secs),
            loss_limit,
        }
    }

    /// Records one realized trade outcome. Losses accumulate in the rolling
    /// window; returns true if this outcome tripped the breaker.
    pub async fn record_outcome(&self, realized_profit: Decimal) -> bool {
        if realized_profit >= Decimal::ZERO {
            return false;
        }

        let now = Instant::now();
        let windowed_loss = {
            let mut losses = self.losses.write().await;
            losses.push_back((now, -realized_profit));
            while let Some((at, _)) = losses.front() {
                if now.duration_since(*at) > self.window {
                    losses.pop_front();
                } else {
                    break;
                }
            }
            losses.iter().map(|(_, loss)| *loss).sum::<Decimal>()
        };

        if windowed_loss > self.loss_limit {
            self.trip(&format!(
                "rolling losses {} exceed limit {}",
                windowed_loss, self.loss_limit
            ))
            .await;
            return true;
        }
        false
    }

    pub async fn trip(&self, reason: &str) {
        let mut state = self.state.write().await;
        if !state.is_open {
            error!("Circuit breaker OPEN: {}", reason);
        }
        state.is_open = true;
        state.reason = Some(reason.to_string());
        state.tripped_at = Some(Utc::now());
    }

    /// Clears the breaker and forgets the loss window.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        if state.is_open {
            info!("Circuit breaker reset");
        }
        *state = BreakerState::default();
        self.losses.write().await.clear();
    }

    pub async fn is_open(&self) -> bool {
        self.state.read().await.is_open
    }

    pub async fn trip_reason(&self) -> Option<String> {
        self.state.read().await.reason.clone()
    }

    pub async fn tripped_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.tripped_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn trips_when_windowed_losses_exceed_limit() {
        let breaker = CircuitBreaker::new(60, dec!(1.0));

        assert!(!breaker.record_outcome(dec!(-0.6)).await);
        assert!(!breaker.is_open().await);

        assert!(breaker.record_outcome(dec!(-0.5)).await);
        assert!(breaker.is_open().await);
        assert!(breaker.trip_reason().await.is_some());
        assert!(breaker.tripped_at().await.is_some());
    }

    #[tokio::test]
    async fn profits_do_not_accumulate_as_losses() {
        let breaker = CircuitBreaker::new(60, dec!(0.1));
        for _ in 0..100 {
            assert!(!breaker.record_outcome(dec!(5.0)).await);
        }
        assert!(!breaker.is_open().await);
    }

    #[tokio::test]
    async fn reset_clears_state_and_window() {
        let breaker = CircuitBreaker::new(60, dec!(0.5));
        breaker.trip("manual").await;
        assert!(breaker.is_open().await);

        breaker.reset().await;
        assert!(!breaker.is_open().await);
        assert!(breaker.trip_reason().await.is_none());

        // A small loss after reset must not trip on pre-reset history.
        assert!(!breaker.record_outcome(dec!(-0.4)).await);
    }
}
