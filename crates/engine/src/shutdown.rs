// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shutdown signalling for the executor
//!
//! A shutdown request sets a sticky flag and cancels the current execution
//! scope. The scope token is a child of the host's token when one is given,
//! so host cancellation reaches running tasks too.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub struct ShutdownController {
    requested: AtomicBool,
    parent: Option<CancellationToken>,
    scope: Mutex<CancellationToken>,
}

impl ShutdownController {
    pub fn new(parent: Option<CancellationToken>) -> Self {
        let scope = Self::fresh_scope(parent.as_ref());
        Self {
            requested: AtomicBool::new(false),
            parent,
            scope: Mutex::new(scope),
        }
    }

    fn fresh_scope(parent: Option<&CancellationToken>) -> CancellationToken {
        match parent {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        }
    }

    /// Token for work started now
    pub fn scope(&self) -> CancellationToken {
        self.scope
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Returns true only for the first request since the last reset
    pub fn request(&self) -> bool {
        let first = !self.requested.swap(true, Ordering::SeqCst);
        self.scope().cancel();
        first
    }

    /// Shutdown was requested, or the host cancelled the parent scope
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
            || self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }

    /// Clear the flag and install a fresh scope
    ///
    /// Callers must ensure no batch is running.
    pub fn reset(&self) {
        let mut scope = self.scope.lock().unwrap_or_else(|e| e.into_inner());
        *scope = Self::fresh_scope(self.parent.as_ref());
        self.requested.store(false, Ordering::SeqCst);
    }
}
