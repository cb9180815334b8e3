// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chain definitions
//!
//! A chain is an ordered list of steps; each step is a group of tasks that
//! run concurrently. Chains are immutable once enqueued.

use crate::clock::Clock;
use crate::constraints::Constraints;
use crate::id::{ChainId, IdGen};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors from building or validating a chain
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("chain {0} has no steps")]
    NoSteps(ChainId),
    #[error("chain {chain_id} step {step} has no tasks")]
    EmptyStep { chain_id: ChainId, step: usize },
    #[error("chain {chain_id} step {step} task {task} has an empty worker id")]
    MissingWorker {
        chain_id: ChainId,
        step: usize,
        task: usize,
    },
}

/// A single unit of work bound to a worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub worker_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
}

impl TaskSpec {
    pub fn new(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            task_id: None,
            input: None,
            constraints: None,
        }
    }

    pub fn with_id(self, task_id: impl Into<String>) -> Self {
        Self {
            task_id: Some(task_id.into()),
            ..self
        }
    }

    pub fn with_input(self, input: Value) -> Self {
        Self {
            input: Some(input),
            ..self
        }
    }

    pub fn with_constraints(self, constraints: Constraints) -> Self {
        Self {
            constraints: Some(constraints),
            ..self
        }
    }

    /// Name used in logs and progress events
    pub fn display_name(&self) -> &str {
        self.task_id.as_deref().unwrap_or(&self.worker_id)
    }
}

/// A group of tasks that run concurrently
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub tasks: Vec<TaskSpec>,
}

impl Step {
    pub fn new(tasks: Vec<TaskSpec>) -> Self {
        Self { tasks }
    }

    pub fn single(task: TaskSpec) -> Self {
        Self { tasks: vec![task] }
    }
}

/// An ordered sequence of steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    pub id: ChainId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub steps: Vec<Step>,
    pub created_at: DateTime<Utc>,
}

impl Chain {
    /// Build a chain with an explicit id, validating its shape
    pub fn new(id: impl Into<ChainId>, steps: Vec<Step>) -> Result<Self, ChainError> {
        let chain = Self {
            id: id.into(),
            name: None,
            steps,
            created_at: Utc::now(),
        };
        chain.validate()?;
        Ok(chain)
    }

    /// Build a chain with a generated id
    pub fn generate(id_gen: &impl IdGen, steps: Vec<Step>) -> Result<Self, ChainError> {
        Self::new(ChainId::new(id_gen.next()), steps)
    }

    /// Start a chain from a first step, mirroring `begin_with(...).then(...)`
    pub fn begin_with(id: impl Into<ChainId>, tasks: Vec<TaskSpec>) -> ChainBuilder {
        ChainBuilder {
            id: id.into(),
            name: None,
            steps: vec![Step::new(tasks)],
        }
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    /// Copy of this chain with `created_at` read from `clock`
    pub fn stamped(&self, clock: &impl Clock) -> Self {
        let created_at = i64::try_from(clock.epoch_ms())
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or(self.created_at);
        Self {
            created_at,
            ..self.clone()
        }
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Name recorded on completion events
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        if self.steps.is_empty() {
            return Err(ChainError::NoSteps(self.id.clone()));
        }
        for (step_idx, step) in self.steps.iter().enumerate() {
            if step.tasks.is_empty() {
                return Err(ChainError::EmptyStep {
                    chain_id: self.id.clone(),
                    step: step_idx,
                });
            }
            for (task_idx, task) in step.tasks.iter().enumerate() {
                if task.worker_id.trim().is_empty() {
                    return Err(ChainError::MissingWorker {
                        chain_id: self.id.clone(),
                        step: step_idx,
                        task: task_idx,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Fluent builder for multi-step chains
#[derive(Debug, Clone)]
pub struct ChainBuilder {
    id: ChainId,
    name: Option<String>,
    steps: Vec<Step>,
}

impl ChainBuilder {
    pub fn then(mut self, tasks: Vec<TaskSpec>) -> Self {
        self.steps.push(Step::new(tasks));
        self
    }

    pub fn named(self, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    pub fn build(self) -> Result<Chain, ChainError> {
        let mut chain = Chain::new(self.id, self.steps)?;
        chain.name = self.name;
        Ok(chain)
    }
}

#[cfg(test)]
#[path = "chain_tests.rs"]
mod tests;
