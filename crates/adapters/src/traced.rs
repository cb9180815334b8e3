// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced worker wrappers for consistent observability

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tide_core::{Worker, WorkerError, WorkerFactory, WorkerResult};
use tracing::Instrument;

/// Wrapper that adds tracing to any WorkerFactory and the workers it returns
#[derive(Clone)]
pub struct TracedWorkerFactory<F> {
    inner: F,
}

impl<F> TracedWorkerFactory<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<F: WorkerFactory> WorkerFactory for TracedWorkerFactory<F> {
    fn create_worker(&self, worker_id: &str) -> Option<Arc<dyn Worker>> {
        match self.inner.create_worker(worker_id) {
            Some(worker) => Some(Arc::new(TracedWorker::new(worker_id, worker))),
            None => {
                tracing::warn!(worker_id, "no worker registered");
                None
            }
        }
    }
}

/// Wrapper that logs each `do_work` call with timing and outcome
pub struct TracedWorker {
    worker_id: String,
    inner: Arc<dyn Worker>,
}

impl TracedWorker {
    pub fn new(worker_id: impl Into<String>, inner: Arc<dyn Worker>) -> Self {
        Self {
            worker_id: worker_id.into(),
            inner,
        }
    }
}

#[async_trait]
impl Worker for TracedWorker {
    async fn do_work(&self, input: Option<&Value>) -> Result<WorkerResult, WorkerError> {
        let span = tracing::info_span!("worker.do_work", worker_id = %self.worker_id);

        async move {
            tracing::debug!(has_input = input.is_some(), "starting");

            let start = std::time::Instant::now();
            let result = self.inner.do_work(input).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(WorkerResult::Success { .. }) => tracing::info!(elapsed_ms, "work succeeded"),
                Ok(WorkerResult::Failure {
                    message,
                    should_retry,
                }) => tracing::warn!(elapsed_ms, reason = %message, should_retry, "work failed"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "worker error"),
            }

            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
