// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker registry
//!
//! Resolves worker ids against explicit registrations first, then against
//! fallback factories in the order they were added.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tide_core::{Worker, WorkerFactory};

type Constructor = Arc<dyn Fn() -> Arc<dyn Worker> + Send + Sync>;

/// Name to worker lookup with custom registrations taking precedence
#[derive(Clone, Default)]
pub struct WorkerRegistry {
    registered: Arc<RwLock<HashMap<String, Constructor>>>,
    fallbacks: Arc<RwLock<Vec<Arc<dyn WorkerFactory>>>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shared worker instance under `worker_id`
    pub fn register(&self, worker_id: impl Into<String>, worker: Arc<dyn Worker>) {
        self.register_with(worker_id, move || worker.clone());
    }

    /// Register a constructor invoked once per resolved task
    pub fn register_with<F>(&self, worker_id: impl Into<String>, constructor: F)
    where
        F: Fn() -> Arc<dyn Worker> + Send + Sync + 'static,
    {
        let worker_id = worker_id.into();
        let replaced = self
            .registered
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(worker_id.clone(), Arc::new(constructor))
            .is_some();
        tracing::debug!(worker_id, replaced, "worker registered");
    }

    /// Returns whether a registration was removed
    pub fn unregister(&self, worker_id: &str) -> bool {
        self.registered
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(worker_id)
            .is_some()
    }

    /// Consult `factory` for ids with no explicit registration
    pub fn add_fallback(&self, factory: Arc<dyn WorkerFactory>) {
        self.fallbacks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(factory);
    }

    /// Registered ids, sorted
    pub fn registered_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .registered
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

impl WorkerFactory for WorkerRegistry {
    fn create_worker(&self, worker_id: &str) -> Option<Arc<dyn Worker>> {
        let constructor = self
            .registered
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(worker_id)
            .cloned();
        if let Some(constructor) = constructor {
            return Some(constructor());
        }
        let fallbacks = self
            .fallbacks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        fallbacks.iter().find_map(|f| f.create_worker(worker_id))
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
