// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Tide chain execution engine

mod budget;
mod bus;
mod error;
mod events;
mod executor;
mod shutdown;

pub use budget::{effective_budget, BudgetSamples, TimeBudget};
pub use bus::{BusEvent, BusFilter, BusReceiver, ProgressBus, ProgressReporter, SubscriberId};
pub use error::ExecutorError;
pub use events::{EventManager, EventSyncManager};
pub use executor::{ChainExecutor, EnqueueOutcome, ExecutorDeps, ExistingPolicy};
pub use shutdown::ShutdownController;
