//! Historical pattern learning log
//!
//! Bounded append-only log of per-execution outcomes with an incrementally
//! maintained index by pattern signature, used for historical-success scoring
//! and for the rolling adaptation window.

use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::Duration;
use crate::types::{PatternKey, PerformanceRecord};

#[derive(Debug, Clone, Copy, Default)]
struct PatternCounts {
    successes: u64,
    total: u64,
}

pub struct PatternTracker {
    records: VecDeque<PerformanceRecord>,
    index: HashMap<PatternKey, PatternCounts>,
    capacity: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct WindowedStats {
    pub success_rate: f64,
    pub average_profit: Decimal,
    pub samples: usize,
}

impl PatternTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            index: HashMap::new(),
            capacity,
        }
    }

    pub fn record(&mut self, record: PerformanceRecord) {
        if self.records.len() >= self.capacity {
            if let Some(evicted) = self.records.pop_front() {
                if let Some(counts) = self.index.get_mut(&evicted.pattern) {
                    counts.total = counts.total.saturating_sub(1);
                    if evicted.success {
                        counts.successes = counts.successes.saturating_sub(1);
                    }
                    if counts.total == 0 {
                        self.index.remove(&evicted.pattern);
                    }
                }
            }
        }

        let counts = self.index.entry(record.pattern.clone()).or_default();
        counts.total += 1;
        if record.success {
            counts.successes += 1;
        }
        self.records.push_back(record);
    }

    /// Historical success rate for a pattern; None when the pattern has never
    /// been seen (callers default unmatched patterns to a neutral 0.5 so
    /// novel opportunities are not starved).
    pub fn success_rate(&self, key: &PatternKey) -> Option<f64> {
        self.index.get(key).and_then(|counts| {
            if counts.total == 0 {
                None
            } else {
                Some(counts.successes as f64 / counts.total as f64)
            }
        })
    }

    /// Success rate and average realized profit over the trailing window.
    pub fn windowed_stats(&self, window: Duration) -> WindowedStats {
        let cutoff = Utc::now()
            - ChronoDuration::from_std(window).unwrap_or_else(|_| ChronoDuration::seconds(3600));

        let mut successes = 0usize;
        let mut samples = 0usize;
        let mut profit_sum = Decimal::ZERO;
        for record in self.records.iter().rev() {
            if record.recorded_at < cutoff {
                break;
            }
            samples += 1;
            if record.success {
                successes += 1;
            }
            profit_sum += record.realized_profit;
        }

        let success_rate = if samples == 0 {
            0.0
        } else {
            successes as f64 / samples as f64
        };
        let average_profit = if samples == 0 {
            Decimal::ZERO
        } else {
            profit_sum / Decimal::from(samples as u64)
        };

        WindowedStats {
            success_rate,
            average_profit,
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(pair: &str, bucket: i64, success: bool, profit: Decimal) -> PerformanceRecord {
        PerformanceRecord {
            execution_id: uuid::Uuid::new_v4().to_string(),
            pattern: PatternKey {
                pair: pair.to_string(),
                profit_bucket: bucket,
            },
            success,
            realized_profit: profit,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn success_rate_tracks_matches() {
        let mut tracker = PatternTracker::new(100);
        let key = PatternKey {
            pair: "WETH/USDC".to_string(),
            profit_bucket: 4,
        };
        tracker.record(record("WETH/USDC", 4, true, dec!(0.02)));
        tracker.record(record("WETH/USDC", 4, true, dec!(0.01)));
        tracker.record(record("WETH/USDC", 4, false, dec!(-0.01)));

        let rate = tracker.success_rate(&key).unwrap();
        assert!((rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn unseen_pattern_has_no_rate() {
        let tracker = PatternTracker::new(100);
        let key = PatternKey {
            pair: "ARB/USDC".to_string(),
            profit_bucket: 1,
        };
        assert!(tracker.success_rate(&key).is_none());
    }

    #[test]
    fn eviction_keeps_index_consistent() {
        let mut tracker = PatternTracker::new(2);
        let key = PatternKey {
            pair: "WETH/USDC".to_string(),
            profit_bucket: 4,
        };
        tracker.record(record("WETH/USDC", 4, true, dec!(0.02)));
        tracker.record(record("WETH/USDC", 4, false, dec!(-0.01)));
        // Evicts the first (successful) record.
        tracker.record(record("WETH/USDC", 4, false, dec!(-0.02)));

        assert_eq!(tracker.len(), 2);
        let rate = tracker.success_rate(&key).unwrap();
        assert!(rate.abs() < 1e-9);
    }

    #[test]
    fn windowed_stats_cover_recent_records() {
        let mut tracker = PatternTracker::new(100);
        tracker.record(record("WETH/USDC", 4, true, dec!(0.03)));
        tracker.record(record("WETH/USDC", 4, false, dec!(-0.01)));

        let stats = tracker.windowed_stats(Duration::from_secs(3600));
        assert_eq!(stats.samples, 2);
        assert!((stats.success_rate - 0.5).abs() < 1e-9);
        assert_eq!(stats.average_profit, dec!(0.01));
    }
}
