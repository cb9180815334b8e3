// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completion event recording and replay
//!
//! [`EventManager::record`] persists before publishing, so an event exists
//! on disk even if nobody is subscribed. [`EventSyncManager`] replays what
//! observers missed while the process was not running.

use crate::bus::{BusEvent, ProgressBus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tide_core::{Clock, EventId, TaskCompletionEvent};
use tide_storage::{EventStore, StorageError, StoredEvent};

/// Store-then-publish front for completion events
pub struct EventManager<C: Clock> {
    store: Arc<EventStore<C>>,
    bus: ProgressBus,
}

impl<C: Clock> Clone for EventManager<C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            bus: self.bus.clone(),
        }
    }
}

impl<C: Clock> EventManager<C> {
    pub fn new(store: Arc<EventStore<C>>, bus: ProgressBus) -> Self {
        Self { store, bus }
    }

    /// Persist, then publish
    pub fn record(&self, event: TaskCompletionEvent) -> Result<EventId, StorageError> {
        let id = self.store.save_event(event.clone())?;
        let delivered = self.bus.publish(BusEvent::Completion {
            id: id.clone(),
            event,
        });
        tracing::debug!(event_id = %id, delivered, "completion recorded");
        Ok(id)
    }

    /// Persist under a caller-chosen id and publish only if newly stored
    ///
    /// Re-recording an id that already exists is a no-op returning false.
    pub fn record_once(
        &self,
        id: EventId,
        event: TaskCompletionEvent,
    ) -> Result<bool, StorageError> {
        if !self.store.save_event_with_id(id.clone(), event.clone())? {
            tracing::debug!(event_id = %id, "completion already recorded");
            return Ok(false);
        }
        let delivered = self.bus.publish(BusEvent::Completion {
            id: id.clone(),
            event,
        });
        tracing::debug!(event_id = %id, delivered, "completion recorded");
        Ok(true)
    }

    /// Mark an event as seen by its consumer
    pub fn acknowledge(&self, id: &EventId) -> Result<bool, StorageError> {
        self.store.mark_event_consumed(id)
    }

    pub fn store(&self) -> &Arc<EventStore<C>> {
        &self.store
    }

    pub fn bus(&self) -> &ProgressBus {
        &self.bus
    }
}

/// Replays stored events to live observers once per process
#[derive(Default)]
pub struct EventSyncManager {
    synced: AtomicBool,
}

impl EventSyncManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish every unconsumed event, oldest first
    ///
    /// Only the first call in a process replays; later calls return an empty
    /// list. Events stay unconsumed until acknowledged.
    pub fn sync_events<C: Clock>(&self, events: &EventManager<C>) -> Vec<StoredEvent> {
        if self.synced.swap(true, Ordering::SeqCst) {
            tracing::debug!("events already synced");
            return Vec::new();
        }
        let pending = events.store().unconsumed_events();
        for stored in &pending {
            events.bus().publish(BusEvent::Completion {
                id: stored.id.clone(),
                event: stored.event.clone(),
            });
        }
        tracing::info!(replayed = pending.len(), "missed events replayed");
        pending
    }

    pub fn has_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    /// Explicit maintenance: drop events older than `older_than`
    pub fn clear_old_events<C: Clock>(
        &self,
        store: &EventStore<C>,
        older_than: Duration,
    ) -> Result<usize, StorageError> {
        store.clear_old_events(older_than)
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
