// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker capability consumed by the engine
//!
//! Concrete work (HTTP, uploads, compression) lives behind [`Worker`]; the
//! engine only sees a [`WorkerResult`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Outcome of a single `do_work` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerResult {
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        /// Type tag for `data`, for hosts that rehydrate typed outputs
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data_class: Option<String>,
    },
    Failure {
        message: String,
        should_retry: bool,
    },
}

impl WorkerResult {
    pub fn success() -> Self {
        WorkerResult::Success {
            message: None,
            data: None,
            data_class: None,
        }
    }

    pub fn success_with_data(data: Value) -> Self {
        WorkerResult::Success {
            message: None,
            data: Some(data),
            data_class: None,
        }
    }

    /// Retryable failure
    pub fn failure(message: impl Into<String>) -> Self {
        WorkerResult::Failure {
            message: message.into(),
            should_retry: true,
        }
    }

    /// Failure that retrying cannot fix
    pub fn permanent_failure(message: impl Into<String>) -> Self {
        WorkerResult::Failure {
            message: message.into(),
            should_retry: false,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WorkerResult::Success { .. })
    }
}

/// Error raised by a worker instead of returning a result
///
/// The engine converts these into retryable failures.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

/// Executable unit of work
#[async_trait]
pub trait Worker: Send + Sync {
    async fn do_work(&self, input: Option<&Value>) -> Result<WorkerResult, WorkerError>;
}

/// Resolves worker identifiers to executable units
pub trait WorkerFactory: Send + Sync {
    fn create_worker(&self, worker_id: &str) -> Option<Arc<dyn Worker>>;
}

impl<F: WorkerFactory + ?Sized> WorkerFactory for Arc<F> {
    fn create_worker(&self, worker_id: &str) -> Option<Arc<dyn Worker>> {
        (**self).create_worker(worker_id)
    }
}
