// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable storage for chains, checkpoints, the work queue and events

mod document;
mod error;
mod event_store;
mod queue;
pub mod record;
mod substrate;

pub use document::{ChainStore, DocumentStore, ProgressStore};
pub use error::{Corruption, StorageError};
pub use event_store::{CleanupReport, EventStore, StoredEvent};
pub use queue::{DurableQueue, QueueOp};
pub use substrate::{FsSubstrate, Substrate};

#[cfg(any(test, feature = "test-support"))]
pub use substrate::MemSubstrate;
