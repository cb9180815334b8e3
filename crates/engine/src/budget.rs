// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adaptive time budget
//!
//! Keeps rolling windows of measured step durations and of the save/cleanup
//! overhead that follows each step. The minimum viable attempt is the step
//! estimate plus the overhead estimate; nothing new starts with less than
//! that remaining. Samples persist at `meta/time_budget.json` so each
//! execution window starts from what the last one measured.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tide_core::ExecutorConfig;
use tide_storage::{DocumentStore, StorageError};

const META_KIND: &str = "meta";
const BUDGET_ID: &str = "time_budget";

/// Persisted measurements, newest last
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSamples {
    pub step_ms: VecDeque<u64>,
    pub overhead_ms: VecDeque<u64>,
}

#[derive(Debug, Clone)]
pub struct TimeBudget {
    samples: BudgetSamples,
    window: usize,
    min_overhead: Duration,
    safety_factor: f64,
    initial_step: Duration,
}

fn push_bounded(window: &mut VecDeque<u64>, value: u64, cap: usize) {
    window.push_back(value);
    while window.len() > cap {
        window.pop_front();
    }
}

fn mean_ms(window: &VecDeque<u64>) -> Option<f64> {
    if window.is_empty() {
        None
    } else {
        Some(window.iter().sum::<u64>() as f64 / window.len() as f64)
    }
}

impl TimeBudget {
    pub fn new(config: &ExecutorConfig) -> Self {
        Self::with_samples(config, BudgetSamples::default())
    }

    pub fn with_samples(config: &ExecutorConfig, mut samples: BudgetSamples) -> Self {
        let window = config.budget_window.max(1);
        while samples.step_ms.len() > window {
            samples.step_ms.pop_front();
        }
        while samples.overhead_ms.len() > window {
            samples.overhead_ms.pop_front();
        }
        Self {
            samples,
            window,
            min_overhead: config.min_overhead,
            safety_factor: config.overhead_safety_factor.max(1.0),
            initial_step: config.initial_step_estimate,
        }
    }

    /// Restore persisted samples; unreadable samples start a fresh window
    pub fn load(docs: &DocumentStore, config: &ExecutorConfig) -> Self {
        match docs.load::<BudgetSamples>(META_KIND, BUDGET_ID) {
            Ok(Some(samples)) => Self::with_samples(config, samples),
            Ok(None) => Self::new(config),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable time budget");
                Self::new(config)
            }
        }
    }

    pub fn save(&self, docs: &DocumentStore) -> Result<(), StorageError> {
        docs.save(META_KIND, BUDGET_ID, &self.samples)
    }

    pub fn record_step(&mut self, elapsed: Duration) {
        push_bounded(
            &mut self.samples.step_ms,
            elapsed.as_millis() as u64,
            self.window,
        );
    }

    pub fn record_overhead(&mut self, elapsed: Duration) {
        push_bounded(
            &mut self.samples.overhead_ms,
            elapsed.as_millis() as u64,
            self.window,
        );
    }

    /// Mean measured step duration, or the configured initial estimate
    pub fn step_estimate(&self) -> Duration {
        match mean_ms(&self.samples.step_ms) {
            Some(mean) => Duration::from_millis(mean.round() as u64),
            None => self.initial_step,
        }
    }

    /// `max(floor, mean * safety_factor)`
    pub fn overhead_estimate(&self) -> Duration {
        let scaled = mean_ms(&self.samples.overhead_ms)
            .map(|mean| Duration::from_millis((mean * self.safety_factor).ceil() as u64))
            .unwrap_or_default();
        scaled.max(self.min_overhead)
    }

    pub fn min_viable_attempt(&self) -> Duration {
        self.step_estimate() + self.overhead_estimate()
    }

    /// Whether something new may start with `remaining` left
    pub fn can_attempt(&self, remaining: Duration) -> bool {
        !remaining.is_zero()
            && remaining > self.overhead_estimate()
            && remaining >= self.min_viable_attempt()
    }

    /// Per-task timeout, always below the remaining outer budget
    pub fn task_timeout(&self, configured: Duration, remaining: Duration) -> Duration {
        configured.min(remaining.saturating_sub(self.overhead_estimate()))
    }

    pub fn samples(&self) -> &BudgetSamples {
        &self.samples
    }
}

/// Wall-clock budget for one batch
///
/// A host deadline takes precedence: the budget ends `grace` before it and
/// `total_timeout` is ignored.
pub fn effective_budget(
    total_timeout: Duration,
    deadline_epoch_ms: Option<u64>,
    now_epoch_ms: u64,
    grace: Duration,
) -> Duration {
    match deadline_epoch_ms {
        Some(deadline) => Duration::from_millis(deadline.saturating_sub(now_epoch_ms))
            .saturating_sub(grace),
        None => total_timeout,
    }
}

#[cfg(test)]
#[path = "budget_tests.rs"]
mod tests;
