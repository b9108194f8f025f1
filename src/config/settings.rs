//! Orchestrator configuration settings and environment variable handling

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::env;
use std::str::FromStr;

// Configuration constants
pub const MIN_PROFIT_FLOOR: Decimal = dec!(0.0001);
pub const MAX_POSITION_SIZE_CAP: Decimal = dec!(1000.0);
pub const MAX_CONCURRENT_EXECUTIONS_CAP: usize = 32;
pub const EXECUTION_HISTORY_CAPACITY: usize = 1_000;
pub const PERFORMANCE_LOG_CAPACITY: usize = 1_000;
pub const DECISION_LOG_CAPACITY: usize = 1_000;
pub const EXECUTION_TIMEOUT_SECS: u64 = 30;

// Cost model constants. The exact numbers are operating configuration, not
// invariants; they mirror typical flash-loan fee and slippage settings.
pub const FLASH_LOAN_FEE_RATE: Decimal = dec!(0.0009);
pub const SLIPPAGE_BUFFER: Decimal = dec!(0.005);
pub const COST_CEILING_RATIO: Decimal = dec!(0.5);

// Sizing multipliers keyed by profit-margin bucket: thinner margins get
// smaller size commitments.
pub const SIZING_FULL_MARGIN: Decimal = dec!(0.02);
pub const SIZING_THREE_QUARTER_MARGIN: Decimal = dec!(0.01);
pub const SIZING_HALF_MARGIN: Decimal = dec!(0.005);

// Adaptation bounds
pub const SUCCESS_RATE_FLOOR: f64 = 0.4;
pub const SUCCESS_RATE_UPPER: f64 = 0.75;
pub const ADAPTATION_WINDOW_SECS: u64 = 3_600;
pub const ADAPT_MIN_INTERVAL_SECS: u64 = 60;
pub const MIN_ADAPTATION_SAMPLES: usize = 10;

// Scoring thresholds
pub const SCORE_THRESHOLD_BASE: f64 = 0.45;
pub const SCORE_THRESHOLD_SPREAD: f64 = 0.25;

#[derive(Debug, Clone)]
pub struct Config {
    // Strategy defaults (seed values for the adaptive coordinator)
    pub scan_interval_ms: u64,
    pub min_profit_threshold: Decimal,
    pub max_position_size: Decimal,
    pub risk_tolerance: Decimal,
    pub aggressiveness: Decimal,
    pub adaptation_rate: Decimal,
    // Risk limits
    pub confidence_floor: u8,
    pub max_aggregate_exposure: Decimal,
    pub daily_loss_limit: Decimal,
    pub breaker_window_secs: u64,
    pub breaker_loss_limit: Decimal,
    // Scheduling
    pub max_concurrent_executions: usize,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub queue_capacity: usize,
    pub drain_grace_secs: u64,
    // Supervision
    pub health_poll_interval_secs: u64,
    pub sample_interval_secs: u64,
    pub stale_component_secs: u64,
    pub restart_cooldown_secs: u64,
    pub max_restart_attempts: u32,
    // Persistence
    pub persist_records: bool,
}

impl Config {
    pub fn load() -> Self {
        Self {
            scan_interval_ms: env::var("SCAN_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2_000),
            min_profit_threshold: env::var("MIN_PROFIT_THRESHOLD")
                .ok()
                .and_then(|s| Decimal::from_str(&s).ok())
                .unwrap_or(dec!(0.01))
                .max(MIN_PROFIT_FLOOR),
            max_position_size: env::var("MAX_POSITION_SIZE")
                .ok()
                .and_then(|s| Decimal::from_str(&s).ok())
                .unwrap_or(dec!(10.0))
                .min(MAX_POSITION_SIZE_CAP),
            risk_tolerance: env::var("RISK_TOLERANCE")
                .ok()
                .and_then(|s| Decimal::from_str(&s).ok())
                .unwrap_or(dec!(0.5))
                .clamp(dec!(0.05), dec!(1)),
            aggressiveness: env::var("AGGRESSIVENESS")
                .ok()
                .and_then(|s| Decimal::from_str(&s).ok())
                .unwrap_or(dec!(0.5))
                .clamp(dec!(0), dec!(1)),
            adaptation_rate: env::var("ADAPTATION_RATE")
                .ok()
                .and_then(|s| Decimal::from_str(&s).ok())
                .unwrap_or(dec!(1.0))
                .clamp(dec!(0), dec!(1)),
            confidence_floor: env::var("CONFIDENCE_FLOOR")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60)
                .min(100),
            max_aggregate_exposure: env::var("MAX_AGGREGATE_EXPOSURE")
                .ok()
                .and_then(|s| Decimal::from_str(&s).ok())
                .unwrap_or(dec!(50.0)),
            daily_loss_limit: env::var("DAILY_LOSS_LIMIT")
                .ok()
                .and_then(|s| Decimal::from_str(&s).ok())
                .unwrap_or(dec!(1.0)),
            breaker_window_secs: env::var("BREAKER_WINDOW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3_600),
            breaker_loss_limit: env::var("BREAKER_LOSS_LIMIT")
                .ok()
                .and_then(|s| Decimal::from_str(&s).ok())
                .unwrap_or(dec!(0.5)),
            max_concurrent_executions: env::var("MAX_CONCURRENT_EXECUTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3)
                .clamp(1, MAX_CONCURRENT_EXECUTIONS_CAP),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_base_delay_ms: env::var("RETRY_BASE_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(500),
            queue_capacity: env::var("QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(64),
            drain_grace_secs: env::var("DRAIN_GRACE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            health_poll_interval_secs: env::var("HEALTH_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            sample_interval_secs: env::var("SAMPLE_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(15),
            stale_component_secs: env::var("STALE_COMPONENT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            restart_cooldown_secs: env::var("RESTART_COOLDOWN_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            max_restart_attempts: env::var("MAX_RESTART_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            persist_records: env::var("PERSIST_RECORDS")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
        }
    }
}
