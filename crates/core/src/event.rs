// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types published by the chain engine

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Terminal outcome of a chain (or a single-task chain's worker)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCompletionEvent {
    pub task_name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_data: Option<Value>,
}

impl TaskCompletionEvent {
    pub fn success(task_name: impl Into<String>, output_data: Option<Value>) -> Self {
        Self {
            task_name: task_name.into(),
            success: true,
            message: None,
            output_data,
        }
    }

    pub fn failure(task_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            success: false,
            message: Some(message.into()),
            output_data: None,
        }
    }

    pub fn with_message(self, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..self
        }
    }
}

/// Live progress update; never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProgressEvent {
    pub task_id: String,
    /// Percentage, always within 0..=100
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<usize>,
}

impl TaskProgressEvent {
    /// Build an update, clamping `progress` into 0..=100
    pub fn new(task_id: impl Into<String>, progress: i64) -> Self {
        Self {
            task_id: task_id.into(),
            progress: progress.clamp(0, 100) as u8,
            message: None,
            current_step: None,
            total_steps: None,
        }
    }

    /// Step-based update: progress is `current / total` as a percentage
    pub fn for_step(task_id: impl Into<String>, current_step: usize, total_steps: usize) -> Self {
        let progress = if total_steps > 0 {
            (current_step as i64 * 100) / total_steps as i64
        } else {
            0
        };
        Self {
            current_step: Some(current_step),
            total_steps: Some(total_steps),
            ..Self::new(task_id, progress)
        }
    }

    pub fn with_message(self, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..self
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
