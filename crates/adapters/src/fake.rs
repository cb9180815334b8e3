// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake workers for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tide_core::{Worker, WorkerError, WorkerFactory, WorkerResult};

/// One scripted response
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    Return(WorkerResult),
    /// Sleep, then return
    Delay(Duration, WorkerResult),
    Error(String),
    /// Never complete; only cancellation or a timeout ends the call
    Hang,
    Panic(String),
}

#[derive(Debug)]
struct FakeState {
    script: VecDeque<FakeOutcome>,
    fallback: FakeOutcome,
    inputs: Vec<Option<Value>>,
}

/// Worker that replays a script, then repeats a fallback outcome
#[derive(Clone)]
pub struct FakeWorker {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeWorker {
    fn default() -> Self {
        Self::returning(WorkerResult::success())
    }
}

impl FakeWorker {
    pub fn returning(result: WorkerResult) -> Self {
        Self::with_fallback(FakeOutcome::Return(result))
    }

    pub fn with_fallback(fallback: FakeOutcome) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                script: VecDeque::new(),
                fallback,
                inputs: Vec::new(),
            })),
        }
    }

    /// Queue an outcome for the next call
    pub fn then(self, outcome: FakeOutcome) -> Self {
        self.lock().script.push_back(outcome);
        self
    }

    /// Number of `do_work` calls so far
    pub fn calls(&self) -> usize {
        self.lock().inputs.len()
    }

    /// Inputs received, in call order
    pub fn inputs(&self) -> Vec<Option<Value>> {
        self.lock().inputs.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Worker for FakeWorker {
    async fn do_work(&self, input: Option<&Value>) -> Result<WorkerResult, WorkerError> {
        let outcome = {
            let mut state = self.lock();
            state.inputs.push(input.cloned());
            match state.script.pop_front() {
                Some(outcome) => outcome,
                None => state.fallback.clone(),
            }
        };
        match outcome {
            FakeOutcome::Return(result) => Ok(result),
            FakeOutcome::Delay(delay, result) => {
                tokio::time::sleep(delay).await;
                Ok(result)
            }
            FakeOutcome::Error(message) => Err(WorkerError::Other(message)),
            FakeOutcome::Hang => {
                std::future::pending::<()>().await;
                Ok(WorkerResult::success())
            }
            #[allow(clippy::panic)]
            FakeOutcome::Panic(message) => panic!("{message}"),
        }
    }
}

/// Factory over a fixed set of fake workers; records every lookup
#[derive(Clone, Default)]
pub struct FakeWorkerFactory {
    workers: Arc<Mutex<HashMap<String, FakeWorker>>>,
    lookups: Arc<Mutex<Vec<String>>>,
}

impl FakeWorkerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, worker_id: impl Into<String>, worker: FakeWorker) -> Self {
        self.workers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(worker_id.into(), worker);
        self
    }

    /// Ids requested so far, including unknown ones
    pub fn lookups(&self) -> Vec<String> {
        self.lookups
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl WorkerFactory for FakeWorkerFactory {
    fn create_worker(&self, worker_id: &str) -> Option<Arc<dyn Worker>> {
        self.lookups
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(worker_id.to_string());
        self.workers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(worker_id)
            .cloned()
            .map(|w| Arc::new(w) as Arc<dyn Worker>)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
