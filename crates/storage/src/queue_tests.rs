// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::substrate::{FsSubstrate, MemSubstrate};

fn config(compaction_threshold: usize) -> QueueConfig {
    QueueConfig {
        compaction_threshold,
        ..QueueConfig::default()
    }
}

fn open(mem: &MemSubstrate) -> DurableQueue {
    DurableQueue::open(Arc::new(mem.clone()), &config(100)).unwrap()
}

fn id(s: &str) -> ChainId {
    ChainId::new(s)
}

#[test]
fn fifo_order() {
    let mem = MemSubstrate::new();
    let q = open(&mem);
    assert!(q.enqueue(id("a")).unwrap());
    assert!(q.enqueue(id("b")).unwrap());
    assert_eq!(q.peek(), Some(id("a")));
    assert_eq!(q.dequeue().unwrap(), Some(id("a")));
    assert_eq!(q.dequeue().unwrap(), Some(id("b")));
    assert_eq!(q.dequeue().unwrap(), None);
    assert!(q.is_empty());
}

#[test]
fn duplicate_enqueue_is_ignored() {
    let mem = MemSubstrate::new();
    let q = open(&mem);
    assert!(q.enqueue(id("a")).unwrap());
    assert!(!q.enqueue(id("a")).unwrap());
    assert_eq!(q.len(), 1);
}

#[test]
fn push_front_moves_existing_id() {
    let mem = MemSubstrate::new();
    let q = open(&mem);
    for s in ["a", "b", "c"] {
        q.enqueue(id(s)).unwrap();
    }
    q.push_front(id("c")).unwrap();
    assert_eq!(q.list(), vec![id("c"), id("a"), id("b")]);
    q.push_front(id("d")).unwrap();
    assert_eq!(q.peek(), Some(id("d")));
}

#[test]
fn remove_and_contains() {
    let mem = MemSubstrate::new();
    let q = open(&mem);
    q.enqueue(id("a")).unwrap();
    q.enqueue(id("b")).unwrap();
    assert!(q.contains(&id("b")));
    assert!(q.remove(&id("b")).unwrap());
    assert!(!q.remove(&id("b")).unwrap());
    assert_eq!(q.list(), vec![id("a")]);
}

#[test]
fn reopen_replays_log() {
    let mem = MemSubstrate::new();
    {
        let q = open(&mem);
        q.enqueue(id("a")).unwrap();
        q.enqueue(id("b")).unwrap();
        q.enqueue(id("c")).unwrap();
        q.dequeue().unwrap();
        q.push_front(id("z")).unwrap();
        q.remove(&id("c")).unwrap();
    }
    let q = open(&mem);
    assert_eq!(q.list(), vec![id("z"), id("b")]);
}

#[test]
fn compaction_rewrites_log_past_threshold() {
    let mem = MemSubstrate::new();
    let q = DurableQueue::open(Arc::new(mem.clone()), &config(4)).unwrap();
    for s in ["a", "b", "c"] {
        q.enqueue(id(s)).unwrap();
    }
    q.dequeue().unwrap();
    assert_eq!(q.log_records(), 4);
    q.dequeue().unwrap();
    // 5 records > 4 triggers a rewrite holding only "c"
    assert_eq!(q.log_records(), 1);

    q.enqueue(id("d")).unwrap();
    let reopened = DurableQueue::open(Arc::new(mem), &config(4)).unwrap();
    assert_eq!(reopened.list(), vec![id("c"), id("d")]);
}

#[test]
fn strict_open_rejects_corrupt_log() {
    let mem = MemSubstrate::new();
    {
        let q = open(&mem);
        q.enqueue(id("a")).unwrap();
    }
    mem.append("queue.log", b"garbage\n").unwrap();
    let err = DurableQueue::open(Arc::new(mem), &config(100)).err().unwrap();
    match err {
        StorageError::Corrupt(c) => {
            assert_eq!(c.key, "queue.log");
            assert_eq!(c.line, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn recovering_open_truncates_to_valid_prefix() {
    let mem = MemSubstrate::new();
    {
        let q = open(&mem);
        q.enqueue(id("a")).unwrap();
        q.enqueue(id("b")).unwrap();
    }
    mem.append("queue.log", b"{\"seq\":2,\"body\":").unwrap();

    let (q, corruption) =
        DurableQueue::open_recovering(Arc::new(mem.clone()), &config(100)).unwrap();
    assert!(corruption.is_some());
    assert_eq!(q.list(), vec![id("a"), id("b")]);

    // The repaired log opens strictly
    let q = DurableQueue::open(Arc::new(mem), &config(100)).unwrap();
    assert_eq!(q.len(), 2);
}

#[test]
fn failed_append_leaves_memory_unchanged() {
    let mem = MemSubstrate::new();
    let q = open(&mem);
    q.enqueue(id("a")).unwrap();
    mem.set_fail_writes(true);
    assert!(q.enqueue(id("b")).is_err());
    assert!(q.dequeue().is_err());
    assert_eq!(q.list(), vec![id("a")]);
}

#[test]
fn insufficient_storage_is_raised_before_write() {
    let mem = MemSubstrate::new();
    let q = open(&mem);
    mem.set_available_bytes(0);
    let err = q.enqueue(id("a")).unwrap_err();
    assert!(matches!(err, StorageError::InsufficientStorage { .. }));
    assert!(mem.contents("queue.log").is_none());
}

#[test]
fn survives_reopen_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let substrate = || -> Arc<dyn Substrate> {
        Arc::new(FsSubstrate::open(dir.path()).unwrap().with_reserve_bytes(0))
    };
    {
        let q = DurableQueue::open(substrate(), &config(100)).unwrap();
        q.enqueue(id("a")).unwrap();
        q.enqueue(id("b")).unwrap();
        q.dequeue().unwrap();
    }
    let q = DurableQueue::open(substrate(), &config(100)).unwrap();
    assert_eq!(q.list(), vec![id("b")]);
}
