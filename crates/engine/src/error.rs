// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the chain executor

use thiserror::Error;
use tide_core::ChainError;
use tide_storage::StorageError;

/// Errors surfaced by executor operations
///
/// Task failures never appear here; they are recorded against the chain's
/// progress and reported through completion events.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("executor is closed")]
    Closed,
    #[error("a batch is already running")]
    BatchInProgress,
    #[error("invalid chain: {0}")]
    Chain(#[from] ChainError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
