//! Randomized opportunity feed for simulation runs
//!
//! Stands in for real price integration. Emission cadence and price spread
//! are deliberately noisy so the downstream pipeline sees a realistic mix of
//! approvals and rejections.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;
use crate::types::Opportunity;
use super::OpportunitySource;

const PAIRS: &[&str] = &["WETH/USDC", "WBTC/USDC", "WETH/DAI", "ARB/USDC"];
const VENUES: &[&str] = &["uniswap_v3", "sushiswap", "aerodrome", "curve"];

pub struct SimulatedOpportunityFeed {
    emit_interval: Duration,
    paused: AtomicBool,
}

impl SimulatedOpportunityFeed {
    pub fn new(emit_interval_ms: u64) -> Self {
        Self {
            emit_interval: Duration::from_millis(emit_interval_ms),
            paused: AtomicBool::new(false),
        }
    }

    fn random_pick<'a>(items: &[&'a str]) -> &'a str {
        let idx = (rand::random::<f64>() * items.len() as f64) as usize;
        items[idx.min(items.len() - 1)]
    }

    fn generate(&self) -> Opportunity {
        let pair = Self::random_pick(PAIRS);
        let source_venue = Self::random_pick(VENUES);
        let mut destination_venue = Self::random_pick(VENUES);
        while destination_venue == source_venue {
            destination_venue = Self::random_pick(VENUES);
        }

        let base_price = dec!(2000)
            + Decimal::from_f64(rand::random::<f64>() * 500.0).unwrap_or(Decimal::ZERO);
        // Spread up to ~1.5% between venues
        let spread_pct =
            Decimal::from_f64(rand::random::<f64>() * 0.015).unwrap_or(Decimal::ZERO);
        let destination_price = base_price * (dec!(1) + spread_pct);

        let volume = dec!(0.1)
            + Decimal::from_f64(rand::random::<f64>() * 2.0).unwrap_or(Decimal::ZERO);
        let expected_profit = (destination_price - base_price) * volume;
        let cost_estimate = dec!(0.02)
            + Decimal::from_f64(rand::random::<f64>() * 0.05).unwrap_or(Decimal::ZERO);
        let net_profit = expected_profit - cost_estimate;

        let confidence = 40 + (rand::random::<f64>() * 60.0) as u8;
        let ttl_secs = 5 + (rand::random::<f64>() * 25.0) as i64;
        let now = Utc::now();

        Opportunity {
            id: uuid::Uuid::new_v4().to_string(),
            pair: pair.to_string(),
            source_venue: source_venue.to_string(),
            destination_venue: destination_venue.to_string(),
            source_price: base_price,
            destination_price,
            volume,
            expected_profit,
            net_profit,
            confidence: confidence.min(100),
            created_at: now,
            expires_at: now + ChronoDuration::seconds(ttl_secs),
        }
    }
}

#[async_trait]
impl OpportunitySource for SimulatedOpportunityFeed {
    async fn next(&self) -> Option<Opportunity> {
        tokio::time::sleep(self.emit_interval).await;

        if self.paused.load(Ordering::SeqCst) {
            return None;
        }

        // Quiet periods: roughly a third of the ticks yield nothing.
        if rand::random::<f64>() < 0.35 {
            return None;
        }

        let opportunity = self.generate();
        debug!(
            id = %opportunity.id,
            pair = %opportunity.pair,
            net_profit = %opportunity.net_profit,
            "simulated opportunity"
        );
        Some(opportunity)
    }

    async fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    async fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    async fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}
