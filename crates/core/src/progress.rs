// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chain checkpoint state
//!
//! `ChainProgress` records which steps, and which tasks of a partially
//! finished step, have completed. Every transition returns a new snapshot;
//! the executor persists a snapshot before acting on it, so a crash between
//! a task succeeding and the write is indistinguishable from the task never
//! having run.

use crate::id::ChainId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Persisted checkpoint for one chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainProgress {
    pub chain_id: ChainId,
    pub total_steps: usize,
    pub completed_steps: BTreeSet<usize>,
    /// Tasks finished within steps that are not yet complete
    pub completed_tasks_in_step: BTreeMap<usize, BTreeSet<usize>>,
    pub last_failed_step: Option<usize>,
    pub retry_count: u32,
    pub max_retries: u32,
}

impl ChainProgress {
    /// Fresh progress for a first attempt
    pub fn new(chain_id: ChainId, total_steps: usize, max_retries: u32) -> Self {
        Self {
            chain_id,
            total_steps,
            completed_steps: BTreeSet::new(),
            completed_tasks_in_step: BTreeMap::new(),
            last_failed_step: None,
            retry_count: 0,
            max_retries,
        }
    }

    /// Mark a whole step complete, clearing its per-task bookkeeping
    ///
    /// Out-of-range indices are ignored.
    pub fn with_completed_step(&self, step: usize) -> Self {
        if step >= self.total_steps {
            return self.clone();
        }
        let mut next = self.clone();
        next.completed_steps.insert(step);
        next.completed_tasks_in_step.remove(&step);
        next
    }

    /// Record one finished task inside a step that is still in progress
    pub fn with_completed_task_in_step(&self, step: usize, task: usize) -> Self {
        if step >= self.total_steps || self.completed_steps.contains(&step) {
            return self.clone();
        }
        let mut next = self.clone();
        next.completed_tasks_in_step
            .entry(step)
            .or_default()
            .insert(task);
        next
    }

    /// Record a failed attempt at `step`
    pub fn with_failure(&self, step: usize) -> Self {
        Self {
            last_failed_step: Some(step),
            retry_count: self.retry_count.saturating_add(1),
            ..self.clone()
        }
    }

    /// Lowest step index not yet completed
    pub fn next_step_index(&self) -> Option<usize> {
        (0..self.total_steps).find(|i| !self.completed_steps.contains(i))
    }

    pub fn is_complete(&self) -> bool {
        self.next_step_index().is_none()
    }

    pub fn has_exceeded_retries(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    /// Tasks already finished within `step`
    pub fn completed_tasks(&self, step: usize) -> BTreeSet<usize> {
        self.completed_tasks_in_step
            .get(&step)
            .cloned()
            .unwrap_or_default()
    }

    /// Whole-step completion, 0 to 100
    pub fn completion_percentage(&self) -> u8 {
        if self.total_steps == 0 {
            return 100;
        }
        let pct = 100 * self.completed_steps.len() / self.total_steps;
        pct.min(100) as u8
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
