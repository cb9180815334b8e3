// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod chain;
pub mod enqueue;
pub mod events;
pub mod run;
