// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable FIFO of chain ids
//!
//! Every mutation is appended to `queue.log` and synced before the in-memory
//! view changes. Opening replays the log. Once the log holds more records
//! than the compaction threshold it is rewritten as one `Push` per queued id.

use crate::error::{Corruption, StorageError};
use crate::record::{encode_log, scan_log, Record};
use crate::substrate::Substrate;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tide_core::{ChainId, QueueConfig};

const QUEUE_KEY: &str = "queue.log";

/// Logged queue mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "id", rename_all = "snake_case")]
pub enum QueueOp {
    Push(ChainId),
    PushFront(ChainId),
    Pop(ChainId),
    Remove(ChainId),
}

fn apply(items: &mut VecDeque<ChainId>, op: &QueueOp) {
    match op {
        QueueOp::Push(id) => items.push_back(id.clone()),
        QueueOp::PushFront(id) => items.push_front(id.clone()),
        QueueOp::Pop(id) | QueueOp::Remove(id) => {
            if let Some(pos) = items.iter().position(|i| i == id) {
                items.remove(pos);
            }
        }
    }
}

struct QueueState {
    items: VecDeque<ChainId>,
    next_seq: u64,
    /// Records in the current log generation
    records: usize,
}

/// Crash-safe FIFO of chain ids
pub struct DurableQueue {
    substrate: Arc<dyn Substrate>,
    compaction_threshold: usize,
    state: Mutex<QueueState>,
}

impl DurableQueue {
    /// Open the queue, failing with `StorageError::Corrupt` on any bad record
    pub fn open(substrate: Arc<dyn Substrate>, config: &QueueConfig) -> Result<Self, StorageError> {
        let (queue, corruption) = Self::load(substrate, config)?;
        match corruption {
            Some(c) => Err(StorageError::Corrupt(c)),
            None => Ok(queue),
        }
    }

    /// Open the queue, truncating the log to its last valid record
    ///
    /// Returns the corruption that was repaired, if any, so the caller can
    /// decide how loudly to report it.
    pub fn open_recovering(
        substrate: Arc<dyn Substrate>,
        config: &QueueConfig,
    ) -> Result<(Self, Option<Corruption>), StorageError> {
        let (queue, corruption) = Self::load(substrate, config)?;
        if let Some(c) = &corruption {
            tracing::warn!(corruption = %c, "truncating queue log");
            queue.compact()?;
        }
        Ok((queue, corruption))
    }

    fn load(
        substrate: Arc<dyn Substrate>,
        config: &QueueConfig,
    ) -> Result<(Self, Option<Corruption>), StorageError> {
        let bytes = substrate.read(QUEUE_KEY)?.unwrap_or_default();
        let scan = scan_log::<QueueOp>(QUEUE_KEY, &bytes);

        let mut items = VecDeque::new();
        for op in &scan.bodies {
            apply(&mut items, op);
        }
        tracing::debug!(len = items.len(), records = scan.bodies.len(), "queue replayed");

        let queue = Self {
            substrate,
            compaction_threshold: config.compaction_threshold.max(1),
            state: Mutex::new(QueueState {
                items,
                next_seq: scan.next_seq,
                records: scan.bodies.len(),
            }),
        };
        Ok((queue, scan.corruption))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append `op` durably, then apply it in memory
    fn commit(&self, state: &mut QueueState, op: QueueOp) -> Result<(), StorageError> {
        let line = Record::new(state.next_seq, op.clone())?.to_line()?;
        self.substrate.ensure_space(line.len() as u64)?;
        self.substrate.append(QUEUE_KEY, line.as_bytes())?;
        state.next_seq += 1;
        state.records += 1;
        apply(&mut state.items, &op);

        // The op is already durable; a failed rewrite is retried next commit
        if state.records > self.compaction_threshold {
            if let Err(e) = self.rewrite(state) {
                tracing::warn!(error = %e, "queue compaction failed");
            }
        }
        Ok(())
    }

    fn rewrite(&self, state: &mut QueueState) -> Result<(), StorageError> {
        let ops: Vec<QueueOp> = state.items.iter().cloned().map(QueueOp::Push).collect();
        let bytes = encode_log(&ops)?;
        self.substrate.ensure_space(bytes.len() as u64)?;
        self.substrate.replace_atomic(QUEUE_KEY, &bytes)?;
        tracing::debug!(
            before = state.records,
            after = ops.len(),
            "queue log compacted"
        );
        state.next_seq = ops.len() as u64;
        state.records = ops.len();
        Ok(())
    }

    /// Rewrite the log from the in-memory view
    pub fn compact(&self) -> Result<(), StorageError> {
        let mut state = self.lock();
        self.rewrite(&mut state)
    }

    /// Add to the tail; returns false if the id is already queued
    pub fn enqueue(&self, id: ChainId) -> Result<bool, StorageError> {
        let mut state = self.lock();
        if state.items.contains(&id) {
            return Ok(false);
        }
        self.commit(&mut state, QueueOp::Push(id))?;
        Ok(true)
    }

    /// Add to the head, moving the id there if it is already queued
    pub fn push_front(&self, id: ChainId) -> Result<(), StorageError> {
        let mut state = self.lock();
        if state.items.front() == Some(&id) {
            return Ok(());
        }
        if state.items.contains(&id) {
            self.commit(&mut state, QueueOp::Remove(id.clone()))?;
        }
        self.commit(&mut state, QueueOp::PushFront(id))
    }

    /// Remove and return the head
    pub fn dequeue(&self) -> Result<Option<ChainId>, StorageError> {
        let mut state = self.lock();
        let Some(id) = state.items.front().cloned() else {
            return Ok(None);
        };
        self.commit(&mut state, QueueOp::Pop(id.clone()))?;
        Ok(Some(id))
    }

    /// Returns whether the id was queued
    pub fn remove(&self, id: &ChainId) -> Result<bool, StorageError> {
        let mut state = self.lock();
        if !state.items.contains(id) {
            return Ok(false);
        }
        self.commit(&mut state, QueueOp::Remove(id.clone()))?;
        Ok(true)
    }

    pub fn peek(&self) -> Option<ChainId> {
        self.lock().items.front().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn contains(&self, id: &ChainId) -> bool {
        self.lock().items.contains(id)
    }

    /// Queued ids, head first
    pub fn list(&self) -> Vec<ChainId> {
        self.lock().items.iter().cloned().collect()
    }

    /// Records in the current log generation
    pub fn log_records(&self) -> usize {
        self.lock().records
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
