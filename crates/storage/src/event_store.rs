// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable completion-event log with retention
//!
//! Events are appended to `events.log` as `Saved` records; consumption is a
//! separate `Consumed` record. The in-memory index is rebuilt on open.
//! Retention runs on write, at most once per cleanup interval unless the
//! log has outgrown its size threshold, and rewrites the log atomically.

use crate::error::{Corruption, StorageError};
use crate::record::{encode_log, scan_log, Record};
use crate::substrate::Substrate;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tide_core::{Clock, EventId, EventStoreConfig, IdGen, TaskCompletionEvent, UuidIdGen};

const EVENTS_KEY: &str = "events.log";

/// A persisted completion event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: EventId,
    pub event: TaskCompletionEvent,
    pub timestamp_ms: u64,
    #[serde(default)]
    pub consumed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum EventOp {
    Saved(StoredEvent),
    Consumed { id: EventId },
}

/// What one retention pass removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub consumed_expired: usize,
    pub unconsumed_expired: usize,
    pub evicted: usize,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.consumed_expired + self.unconsumed_expired + self.evicted
    }
}

struct Index {
    /// Ordered by timestamp, oldest first
    events: Vec<StoredEvent>,
    next_seq: u64,
    log_bytes: u64,
    last_cleanup_ms: Option<u64>,
}

impl Index {
    fn apply(&mut self, op: EventOp) {
        match op {
            EventOp::Saved(event) => {
                if !self.events.iter().any(|e| e.id == event.id) {
                    self.events.push(event);
                }
            }
            EventOp::Consumed { id } => {
                if let Some(e) = self.events.iter_mut().find(|e| e.id == id) {
                    e.consumed = true;
                }
            }
        }
    }
}

/// Durable store of terminal chain outcomes
pub struct EventStore<C: Clock> {
    substrate: Arc<dyn Substrate>,
    clock: C,
    config: EventStoreConfig,
    index: Mutex<Index>,
}

impl<C: Clock> EventStore<C> {
    /// Open the store, failing with `StorageError::Corrupt` on any bad record
    pub fn open(
        substrate: Arc<dyn Substrate>,
        clock: C,
        config: EventStoreConfig,
    ) -> Result<Self, StorageError> {
        let (store, corruption) = Self::load(substrate, clock, config)?;
        match corruption {
            Some(c) => Err(StorageError::Corrupt(c)),
            None => Ok(store),
        }
    }

    /// Open the store, truncating the log to its last valid record
    pub fn open_recovering(
        substrate: Arc<dyn Substrate>,
        clock: C,
        config: EventStoreConfig,
    ) -> Result<(Self, Option<Corruption>), StorageError> {
        let (store, corruption) = Self::load(substrate, clock, config)?;
        if let Some(c) = &corruption {
            tracing::warn!(corruption = %c, "truncating event log");
            let mut index = store.lock();
            store.rewrite(&mut index)?;
        }
        Ok((store, corruption))
    }

    fn load(
        substrate: Arc<dyn Substrate>,
        clock: C,
        config: EventStoreConfig,
    ) -> Result<(Self, Option<Corruption>), StorageError> {
        let bytes = substrate.read(EVENTS_KEY)?.unwrap_or_default();
        let scan = scan_log::<EventOp>(EVENTS_KEY, &bytes);
        let mut index = Index {
            events: Vec::new(),
            next_seq: scan.next_seq,
            log_bytes: scan.valid_len,
            last_cleanup_ms: None,
        };
        for op in scan.bodies {
            index.apply(op);
        }
        index.events.sort_by_key(|e| e.timestamp_ms);
        tracing::debug!(events = index.events.len(), "event log replayed");

        let store = Self {
            substrate,
            clock,
            config,
            index: Mutex::new(index),
        };
        Ok((store, scan.corruption))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Index> {
        self.index.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn append(&self, index: &mut Index, op: &EventOp) -> Result<(), StorageError> {
        let line = Record::new(index.next_seq, op.clone())?.to_line()?;
        self.substrate.ensure_space(line.len() as u64)?;
        self.substrate.append(EVENTS_KEY, line.as_bytes())?;
        index.next_seq += 1;
        index.log_bytes += line.len() as u64;
        Ok(())
    }

    fn rewrite(&self, index: &mut Index) -> Result<(), StorageError> {
        let ops: Vec<EventOp> = index
            .events
            .iter()
            .cloned()
            .map(EventOp::Saved)
            .collect();
        let bytes = encode_log(&ops)?;
        self.substrate.ensure_space(bytes.len() as u64)?;
        self.substrate.replace_atomic(EVENTS_KEY, &bytes)?;
        index.next_seq = ops.len() as u64;
        index.log_bytes = bytes.len() as u64;
        Ok(())
    }

    /// Durably record an event under a fresh id
    pub fn save_event(&self, event: TaskCompletionEvent) -> Result<EventId, StorageError> {
        let id = EventId(UuidIdGen.next());
        self.insert(id.clone(), event)?;
        Ok(id)
    }

    /// Durably record an event under `id` unless that id is already stored
    ///
    /// Returns false when the event was already present.
    pub fn save_event_with_id(
        &self,
        id: EventId,
        event: TaskCompletionEvent,
    ) -> Result<bool, StorageError> {
        self.insert(id, event)
    }

    fn insert(&self, id: EventId, event: TaskCompletionEvent) -> Result<bool, StorageError> {
        let mut index = self.lock();
        if index.events.iter().any(|e| e.id == id) {
            return Ok(false);
        }
        let now = self.clock.epoch_ms();
        // Timestamps never go backwards within the log
        let floor = index.events.last().map(|e| e.timestamp_ms).unwrap_or(0);
        let op = EventOp::Saved(StoredEvent {
            id: id.clone(),
            event,
            timestamp_ms: now.max(floor),
            consumed: false,
        });
        self.append(&mut index, &op)?;
        index.apply(op);
        tracing::debug!(event_id = %id, "event saved");

        if self.cleanup_due(&index, now) {
            if let Err(e) = self.cleanup_locked(&mut index, now) {
                tracing::warn!(error = %e, "event cleanup failed");
            }
        }
        Ok(true)
    }

    /// Unconsumed events, oldest first
    pub fn unconsumed_events(&self) -> Vec<StoredEvent> {
        self.lock()
            .events
            .iter()
            .filter(|e| !e.consumed)
            .cloned()
            .collect()
    }

    /// Returns false if the id is unknown or already consumed
    pub fn mark_event_consumed(&self, id: &EventId) -> Result<bool, StorageError> {
        let mut index = self.lock();
        let pending = index.events.iter().any(|e| &e.id == id && !e.consumed);
        if !pending {
            return Ok(false);
        }
        let op = EventOp::Consumed { id: id.clone() };
        self.append(&mut index, &op)?;
        index.apply(op);
        Ok(true)
    }

    /// Delete every event with `now - timestamp > older_than`
    pub fn clear_old_events(&self, older_than: Duration) -> Result<usize, StorageError> {
        let mut index = self.lock();
        let now = self.clock.epoch_ms();
        let limit = older_than.as_millis() as u64;
        let before = index.events.len();
        index
            .events
            .retain(|e| now.saturating_sub(e.timestamp_ms) <= limit);
        let removed = before - index.events.len();
        if removed > 0 {
            self.rewrite(&mut index)?;
        }
        tracing::info!(removed, "cleared old events");
        Ok(removed)
    }

    pub fn clear_all(&self) -> Result<usize, StorageError> {
        let mut index = self.lock();
        let removed = index.events.len();
        index.events.clear();
        self.rewrite(&mut index)?;
        Ok(removed)
    }

    pub fn event_count(&self) -> usize {
        self.lock().events.len()
    }

    /// All events including consumed ones, oldest first
    pub fn all_events(&self) -> Vec<StoredEvent> {
        self.lock().events.clone()
    }

    pub fn get(&self, id: &EventId) -> Option<StoredEvent> {
        self.lock().events.iter().find(|e| &e.id == id).cloned()
    }

    /// Bytes in the current log generation
    pub fn log_bytes(&self) -> u64 {
        self.lock().log_bytes
    }

    /// Run a retention pass now, regardless of interval
    pub fn run_cleanup(&self) -> Result<CleanupReport, StorageError> {
        let mut index = self.lock();
        let now = self.clock.epoch_ms();
        self.cleanup_locked(&mut index, now)
    }

    fn cleanup_due(&self, index: &Index, now: u64) -> bool {
        if index.log_bytes > self.config.cleanup_size_threshold_bytes {
            return true;
        }
        match index.last_cleanup_ms {
            None => true,
            Some(last) => {
                now.saturating_sub(last) >= self.config.cleanup_interval.as_millis() as u64
            }
        }
    }

    fn cleanup_locked(&self, index: &mut Index, now: u64) -> Result<CleanupReport, StorageError> {
        let consumed_limit = self.config.consumed_retention.as_millis() as u64;
        let unconsumed_limit = self.config.unconsumed_retention.as_millis() as u64;
        let mut report = CleanupReport::default();

        let before = index.events.len();
        index
            .events
            .retain(|e| !(e.consumed && now.saturating_sub(e.timestamp_ms) > consumed_limit));
        report.consumed_expired = before - index.events.len();

        let before = index.events.len();
        index
            .events
            .retain(|e| now.saturating_sub(e.timestamp_ms) <= unconsumed_limit);
        report.unconsumed_expired = before - index.events.len();

        if index.events.len() > self.config.max_events {
            report.evicted = index.events.len() - self.config.max_events;
            index.events.drain(..report.evicted);
        }

        index.last_cleanup_ms = Some(now);
        if report.total() > 0 || index.log_bytes > self.config.cleanup_size_threshold_bytes {
            self.rewrite(index)?;
        }
        if report.total() > 0 {
            tracing::info!(
                consumed_expired = report.consumed_expired,
                unconsumed_expired = report.unconsumed_expired,
                evicted = report.evicted,
                "event retention pass"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
#[path = "event_store_tests.rs"]
mod tests;
