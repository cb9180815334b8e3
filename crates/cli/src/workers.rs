// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in workers available to chains run from the command line
//!
//! - `echo`: succeeds with its input as output data
//! - `sleep`: waits `{"ms": n}` milliseconds, then succeeds
//! - `fail`: fails with `{"message": "...", "retry": bool}`

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tide_adapters::WorkerRegistry;
use tide_core::{Worker, WorkerError, WorkerResult};

pub fn registry() -> WorkerRegistry {
    let registry = WorkerRegistry::new();
    registry.register("echo", Arc::new(EchoWorker));
    registry.register("sleep", Arc::new(SleepWorker));
    registry.register("fail", Arc::new(FailWorker));
    registry
}

pub struct EchoWorker;

#[async_trait]
impl Worker for EchoWorker {
    async fn do_work(&self, input: Option<&Value>) -> Result<WorkerResult, WorkerError> {
        Ok(match input {
            Some(input) => WorkerResult::success_with_data(input.clone()),
            None => WorkerResult::success(),
        })
    }
}

pub struct SleepWorker;

#[async_trait]
impl Worker for SleepWorker {
    async fn do_work(&self, input: Option<&Value>) -> Result<WorkerResult, WorkerError> {
        let ms = input
            .and_then(|v| v.get("ms"))
            .and_then(Value::as_u64)
            .ok_or_else(|| WorkerError::InvalidInput("expected {\"ms\": <u64>}".to_string()))?;
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(WorkerResult::success())
    }
}

pub struct FailWorker;

#[async_trait]
impl Worker for FailWorker {
    async fn do_work(&self, input: Option<&Value>) -> Result<WorkerResult, WorkerError> {
        let message = input
            .and_then(|v| v.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("requested failure");
        let retry = input
            .and_then(|v| v.get("retry"))
            .and_then(Value::as_bool)
            .unwrap_or(true);
        Ok(if retry {
            WorkerResult::failure(message)
        } else {
            WorkerResult::permanent_failure(message)
        })
    }
}

#[cfg(test)]
#[path = "workers_tests.rs"]
mod tests;
