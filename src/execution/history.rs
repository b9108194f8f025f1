//! Bounded execution history ring

use std::collections::VecDeque;
use crate::types::{Execution, ExecutionStatus};

/// Completed executions, oldest evicted once capacity is exceeded.
pub struct ExecutionHistory {
    entries: VecDeque<Execution>,
    capacity: usize,
}

impl ExecutionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, execution: Execution) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(execution);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Execution> {
        self.entries.iter()
    }

    pub fn count_with_status(&self, status: ExecutionStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    pub fn recent(&self, n: usize) -> Vec<Execution> {
        self.entries.iter().rev().take(n).cloned().collect()
    }
}
