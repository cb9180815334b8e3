// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process fan-out of completion and progress events
//!
//! Delivery is best effort: subscribers that dropped their receiver are
//! pruned on the next publish. Durability is the event store's job.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tide_core::{EventId, TaskCompletionEvent, TaskProgressEvent};
use tokio::sync::mpsc;

/// Event carried on the bus
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    Completion {
        id: EventId,
        event: TaskCompletionEvent,
    },
    Progress(TaskProgressEvent),
}

/// Which events a subscriber receives
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BusFilter {
    #[default]
    All,
    Completions,
    Progress,
    /// Progress and completions for one task or chain name
    Task(String),
}

impl BusFilter {
    pub fn matches(&self, event: &BusEvent) -> bool {
        match (self, event) {
            (BusFilter::All, _) => true,
            (BusFilter::Completions, BusEvent::Completion { .. }) => true,
            (BusFilter::Progress, BusEvent::Progress(_)) => true,
            (BusFilter::Task(name), BusEvent::Completion { event, .. }) => &event.task_name == name,
            (BusFilter::Task(name), BusEvent::Progress(p)) => &p.task_id == name,
            _ => false,
        }
    }
}

pub type BusReceiver = mpsc::UnboundedReceiver<BusEvent>;

/// Subscriber handle for unsubscribing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    entries: HashMap<SubscriberId, (BusFilter, mpsc::UnboundedSender<BusEvent>)>,
}

/// The bus routes events to matching subscribers
#[derive(Clone, Default)]
pub struct ProgressBus {
    subscribers: Arc<RwLock<Subscribers>>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, filter: BusFilter) -> (SubscriberId, BusReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        let id = SubscriberId(subs.next_id);
        subs.next_id += 1;
        subs.entries.insert(id, (filter, tx));
        (id, rx)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .remove(&id);
    }

    /// Publish to all matching subscribers; returns how many received it
    pub fn publish(&self, event: BusEvent) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();
        {
            let subs = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
            for (id, (filter, tx)) in &subs.entries {
                if !filter.matches(&event) {
                    continue;
                }
                if tx.send(event.clone()).is_ok() {
                    delivered += 1;
                } else {
                    closed.push(*id);
                }
            }
        }
        if !closed.is_empty() {
            let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
            for id in closed {
                subs.entries.remove(&id);
            }
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }

    /// Handle for publishing progress under a fixed task id
    pub fn reporter(&self, task_id: impl Into<String>) -> ProgressReporter {
        ProgressReporter {
            bus: self.clone(),
            task_id: task_id.into(),
        }
    }
}

/// Publishes clamped progress updates for one task
#[derive(Clone)]
pub struct ProgressReporter {
    bus: ProgressBus,
    task_id: String,
}

impl ProgressReporter {
    /// Report a percentage; values outside 0..=100 are clamped
    pub fn report(&self, progress: i64, message: Option<&str>) {
        let mut event = TaskProgressEvent::new(self.task_id.clone(), progress);
        if let Some(message) = message {
            event = event.with_message(message);
        }
        self.bus.publish(BusEvent::Progress(event));
    }

    /// Report `current_step` of `total_steps` as a percentage
    pub fn report_step(&self, current_step: usize, total_steps: usize, message: Option<&str>) {
        let mut event = TaskProgressEvent::for_step(self.task_id.clone(), current_step, total_steps);
        if let Some(message) = message {
            event = event.with_message(message);
        }
        self.bus.publish(BusEvent::Progress(event));
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
