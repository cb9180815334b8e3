// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-batch execution metrics

use serde::{Deserialize, Serialize};

/// Accounting for one `execute_chains_in_batch` call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    /// Host window kind, e.g. "processing" or "refresh"
    pub task_type: String,
    pub start_time_ms: u64,
    pub end_time_ms: u64,
    pub duration_ms: u64,
    pub chains_attempted: usize,
    pub chains_succeeded: usize,
    pub chains_failed: usize,
    /// Batch ended because the host expired the window
    pub was_killed_by_system: bool,
    /// Share of the effective budget consumed, 0.0 to 100.0 (may exceed on overrun)
    pub time_usage_percentage: f64,
    pub queue_size_remaining: usize,
}

impl ExecutionMetrics {
    pub fn started(task_type: impl Into<String>, start_time_ms: u64) -> Self {
        Self {
            task_type: task_type.into(),
            start_time_ms,
            ..Self::default()
        }
    }

    /// Close out the batch at `end_time_ms` against a budget of `budget_ms`
    pub fn finish(&mut self, end_time_ms: u64, budget_ms: u64, queue_size_remaining: usize) {
        self.end_time_ms = end_time_ms.max(self.start_time_ms);
        self.duration_ms = self.end_time_ms - self.start_time_ms;
        self.time_usage_percentage = if budget_ms == 0 {
            if self.duration_ms == 0 {
                0.0
            } else {
                100.0
            }
        } else {
            self.duration_ms as f64 * 100.0 / budget_ms as f64
        };
        self.queue_size_remaining = queue_size_remaining;
    }

    /// Whether the host should schedule another window
    pub fn needs_continuation(&self) -> bool {
        self.queue_size_remaining > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_computes_duration_and_usage() {
        let mut m = ExecutionMetrics::started("processing", 1_000);
        m.finish(4_000, 30_000, 2);
        assert_eq!(m.duration_ms, 3_000);
        assert!((m.time_usage_percentage - 10.0).abs() < f64::EPSILON);
        assert!(m.needs_continuation());
    }

    #[test]
    fn zero_budget_does_not_divide_by_zero() {
        let mut m = ExecutionMetrics::started("refresh", 500);
        m.finish(500, 0, 0);
        assert_eq!(m.time_usage_percentage, 0.0);
        assert!(!m.needs_continuation());
    }

    #[test]
    fn end_before_start_is_clamped() {
        let mut m = ExecutionMetrics::started("refresh", 500);
        m.finish(100, 1_000, 0);
        assert_eq!(m.duration_ms, 0);
    }
}
