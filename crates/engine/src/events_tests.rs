// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::bus::BusFilter;
use tide_core::{EventStoreConfig, FakeClock};
use tide_storage::MemSubstrate;

fn manager(mem: &MemSubstrate, clock: &FakeClock) -> EventManager<FakeClock> {
    let store = EventStore::open(
        Arc::new(mem.clone()),
        clock.clone(),
        EventStoreConfig::default(),
    )
    .unwrap();
    EventManager::new(Arc::new(store), ProgressBus::new())
}

#[tokio::test]
async fn record_persists_then_publishes() {
    let mem = MemSubstrate::new();
    let clock = FakeClock::new();
    let events = manager(&mem, &clock);
    let (_, mut rx) = events.bus().subscribe(BusFilter::Completions);

    let id = events
        .record(TaskCompletionEvent::success("chain-1", None))
        .unwrap();

    assert_eq!(events.store().event_count(), 1);
    match rx.recv().await {
        Some(BusEvent::Completion { id: got, event }) => {
            assert_eq!(got, id);
            assert_eq!(event.task_name, "chain-1");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn record_without_subscribers_still_persists() {
    let mem = MemSubstrate::new();
    let clock = FakeClock::new();
    manager(&mem, &clock)
        .record(TaskCompletionEvent::failure("chain-1", "boom"))
        .unwrap();
    assert_eq!(manager(&mem, &clock).store().unconsumed_events().len(), 1);
}

#[test]
fn record_fails_when_store_write_fails() {
    let mem = MemSubstrate::new();
    let clock = FakeClock::new();
    let events = manager(&mem, &clock);
    let (_, mut rx) = events.bus().subscribe(BusFilter::All);
    mem.set_fail_writes(true);

    assert!(events.record(TaskCompletionEvent::success("c", None)).is_err());
    assert!(rx.try_recv().is_err());
}

#[test]
fn sync_replays_unconsumed_once_in_order() {
    let mem = MemSubstrate::new();
    let clock = FakeClock::new();
    {
        let events = manager(&mem, &clock);
        let first = events.record(TaskCompletionEvent::success("a", None)).unwrap();
        clock.advance(Duration::from_secs(1));
        events.record(TaskCompletionEvent::success("b", None)).unwrap();
        clock.advance(Duration::from_secs(1));
        events.record(TaskCompletionEvent::success("c", None)).unwrap();
        events.acknowledge(&first).unwrap();
    }

    // New process
    let events = manager(&mem, &clock);
    let (_, mut rx) = events.bus().subscribe(BusFilter::All);
    let sync = EventSyncManager::new();

    let replayed: Vec<String> = sync
        .sync_events(&events)
        .into_iter()
        .map(|e| e.event.task_name)
        .collect();
    assert_eq!(replayed, vec!["b", "c"]);
    assert!(sync.has_synced());

    let mut names = Vec::new();
    while let Ok(BusEvent::Completion { event, .. }) = rx.try_recv() {
        names.push(event.task_name);
    }
    assert_eq!(names, vec!["b", "c"]);

    assert!(sync.sync_events(&events).is_empty());
}

#[test]
fn clear_old_events_delegates_to_store() {
    let mem = MemSubstrate::new();
    let clock = FakeClock::new();
    let events = manager(&mem, &clock);
    events.record(TaskCompletionEvent::success("a", None)).unwrap();
    clock.advance(Duration::from_secs(10));

    let sync = EventSyncManager::new();
    let removed = sync
        .clear_old_events(events.store(), Duration::from_secs(5))
        .unwrap();
    assert_eq!(removed, 1);
}

#[test]
fn record_once_publishes_a_single_time() {
    let mem = MemSubstrate::new();
    let clock = FakeClock::new();
    let events = manager(&mem, &clock);
    let (_, mut rx) = events.bus().subscribe(BusFilter::All);
    let id = EventId::from("chain-1@1");

    assert!(events
        .record_once(id.clone(), TaskCompletionEvent::success("chain-1", None))
        .unwrap());
    assert!(!events
        .record_once(id, TaskCompletionEvent::success("chain-1", None))
        .unwrap());

    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
    assert_eq!(events.store().event_count(), 1);
}
