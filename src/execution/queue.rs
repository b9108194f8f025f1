//! Priority execution queue
//!
//! Max-heap on derived priority with FIFO tie-breaking via a monotonic
//! sequence number, so equal-profit work is served in insertion order and
//! nothing starves.

use std::collections::BinaryHeap;
use crate::errors::{EngineError, EngineResult};
use crate::types::Execution;

struct QueuedExecution {
    priority: i64,
    seq: u64,
    execution: Execution,
}

impl PartialEq for QueuedExecution {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedExecution {}

impl PartialOrd for QueuedExecution {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedExecution {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Higher priority wins; on ties the earlier sequence number wins.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

pub struct PriorityQueue {
    heap: BinaryHeap<QueuedExecution>,
    next_seq: u64,
    capacity: usize,
}

impl PriorityQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
            capacity,
        }
    }

    /// Non-blocking insert by priority. Overflow is rejected loudly rather
    /// than silently dropping queued work.
    pub fn push(&mut self, execution: Execution) -> EngineResult<()> {
        if self.heap.len() >= self.capacity {
            return Err(EngineError::QueueFull {
                capacity: self.capacity,
            });
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueuedExecution {
            priority: execution.priority,
            seq,
            execution,
        });
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Execution> {
        self.heap.pop().map(|q| q.execution)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use crate::types::{
        Execution, MarketConditions, Opportunity, RiskEvaluation, RiskVerdict, derive_priority,
    };

    fn test_execution(profit_pct: Decimal) -> Execution {
        let now = Utc::now();
        let opportunity = Opportunity {
            id: uuid::Uuid::new_v4().to_string(),
            pair: "WETH/USDC".to_string(),
            source_venue: "uniswap_v3".to_string(),
            destination_venue: "sushiswap".to_string(),
            source_price: dec!(1),
            destination_price: dec!(1) + profit_pct,
            volume: dec!(1),
            expected_profit: profit_pct,
            net_profit: profit_pct,
            confidence: 85,
            created_at: now,
            expires_at: now + ChronoDuration::seconds(60),
        };
        let evaluation = RiskEvaluation {
            approved: true,
            verdict: RiskVerdict::Approved,
            approved_position_size: dec!(1),
            max_cost_ceiling: dec!(0.05),
            conditions: MarketConditions::default(),
        };
        Execution::new(opportunity, evaluation, 3)
    }

    #[test]
    fn dequeues_highest_profit_first() {
        let mut queue = PriorityQueue::new(16);
        queue.push(test_execution(dec!(0.05))).unwrap();
        queue.push(test_execution(dec!(0.03))).unwrap();
        queue.push(test_execution(dec!(0.04))).unwrap();

        let order: Vec<Decimal> = std::iter::from_fn(|| queue.pop())
            .map(|e| e.opportunity.expected_profit)
            .collect();
        assert_eq!(order, vec![dec!(0.05), dec!(0.04), dec!(0.03)]);
    }

    #[test]
    fn equal_priority_is_fifo() {
        let mut queue = PriorityQueue::new(16);
        let first = test_execution(dec!(0.02));
        let second = test_execution(dec!(0.02));
        let first_id = first.id.clone();
        let second_id = second.id.clone();

        queue.push(first).unwrap();
        queue.push(second).unwrap();

        assert_eq!(queue.pop().unwrap().id, first_id);
        assert_eq!(queue.pop().unwrap().id, second_id);
    }

    #[test]
    fn overflow_is_rejected() {
        let mut queue = PriorityQueue::new(2);
        queue.push(test_execution(dec!(0.01))).unwrap();
        queue.push(test_execution(dec!(0.02))).unwrap();
        assert!(queue.push(test_execution(dec!(0.03))).is_err());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn priority_is_monotonic_in_profit_pct() {
        assert!(derive_priority(dec!(0.05)) > derive_priority(dec!(0.04)));
        assert!(derive_priority(dec!(0.0401)) > derive_priority(dec!(0.04)));
        assert_eq!(derive_priority(dec!(0.04)), derive_priority(dec!(0.04)));
    }

    proptest! {
        #[test]
        fn pop_order_is_sorted_by_priority(profits in proptest::collection::vec(1u32..10_000, 1..40)) {
            let mut queue = PriorityQueue::new(64);
            for p in &profits {
                let pct = Decimal::from(*p) / dec!(100_000);
                queue.push(test_execution(pct)).unwrap();
            }

            let mut last: Option<i64> = None;
            while let Some(execution) = queue.pop() {
                if let Some(prev) = last {
                    prop_assert!(execution.priority <= prev);
                }
                last = Some(execution.priority);
            }
        }
    }
}
