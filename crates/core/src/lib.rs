// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tide-core: domain model for the chain execution engine
//!
//! Chains, checkpoints, events, the worker capability and configuration.
//! Nothing in this crate performs I/O beyond config file loading.

pub mod chain;
pub mod clock;
pub mod config;
pub mod constraints;
pub mod event;
pub mod id;
pub mod metrics;
pub mod progress;
pub mod worker;

pub use chain::{Chain, ChainBuilder, ChainError, Step, TaskSpec};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    ConfigError, CorruptionPolicy, EngineConfig, EventStoreConfig, ExecutorConfig, QueueConfig,
    RequeuePolicy,
};
pub use constraints::{BackoffPolicy, Constraints, LegacyTrigger, Qos, SystemConstraint};
pub use event::{TaskCompletionEvent, TaskProgressEvent};
pub use id::{ChainId, EventId, IdGen, SequentialIdGen, UuidIdGen};
pub use metrics::ExecutionMetrics;
pub use progress::ChainProgress;
pub use worker::{Worker, WorkerError, WorkerFactory, WorkerResult};
