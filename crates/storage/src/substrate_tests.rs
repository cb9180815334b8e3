// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn fs_substrate() -> (tempfile::TempDir, FsSubstrate) {
    let dir = tempfile::tempdir().unwrap();
    let substrate = FsSubstrate::open(dir.path().join("data"))
        .unwrap()
        .with_reserve_bytes(0);
    (dir, substrate)
}

#[test]
fn fs_read_missing_is_none() {
    let (_dir, s) = fs_substrate();
    assert_eq!(s.read("queue.log").unwrap(), None);
    assert_eq!(s.size("queue.log").unwrap(), 0);
    assert!(!s.remove("queue.log").unwrap());
}

#[test]
fn fs_append_accumulates() {
    let (_dir, s) = fs_substrate();
    s.append("queue.log", b"one\n").unwrap();
    s.append("queue.log", b"two\n").unwrap();
    assert_eq!(s.read("queue.log").unwrap().unwrap(), b"one\ntwo\n");
    assert_eq!(s.size("queue.log").unwrap(), 8);
}

#[test]
fn fs_replace_atomic_leaves_no_temp_file() {
    let (_dir, s) = fs_substrate();
    s.write("progress/a.json", b"old").unwrap();
    s.replace_atomic("progress/a.json", b"new").unwrap();
    assert_eq!(s.read("progress/a.json").unwrap().unwrap(), b"new");
    assert_eq!(s.list("progress").unwrap(), vec!["a.json".to_string()]);
}

#[test]
fn fs_list_is_sorted_and_skips_dirs() {
    let (_dir, s) = fs_substrate();
    s.write("chains/b.json", b"{}").unwrap();
    s.write("chains/a.json", b"{}").unwrap();
    s.write("chains/nested/c.json", b"{}").unwrap();
    assert_eq!(
        s.list("chains").unwrap(),
        vec!["a.json".to_string(), "b.json".to_string()]
    );
    assert!(s.list("absent").unwrap().is_empty());
}

#[test]
fn fs_reports_available_space() {
    let (_dir, s) = fs_substrate();
    assert!(s.available_bytes().unwrap() > 0);
    s.ensure_space(1).unwrap();
}

#[parameterized(
    parent = { "../escape" },
    absolute = { "/etc/passwd" },
    empty = { "" },
    dot = { "./queue.log" },
)]
fn rejects_keys_outside_root(key: &str) {
    let (_dir, s) = fs_substrate();
    assert!(matches!(
        s.write(key, b"x"),
        Err(StorageError::InvalidKey(_))
    ));
    assert!(matches!(
        MemSubstrate::new().write(key, b"x"),
        Err(StorageError::InvalidKey(_))
    ));
}

#[test]
fn ensure_space_applies_margin_and_reserve() {
    let mem = MemSubstrate::new();
    mem.set_available_bytes(1_000);
    mem.ensure_space(800).unwrap();

    let err = mem.ensure_space(900).unwrap_err();
    match err {
        StorageError::InsufficientStorage {
            required,
            available,
        } => {
            assert_eq!(required, 1_080);
            assert_eq!(available, 1_000);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn mem_list_only_direct_children() {
    let mem = MemSubstrate::new();
    mem.write("progress/a.json", b"1").unwrap();
    mem.write("progress/deep/b.json", b"2").unwrap();
    mem.write("progressive.log", b"3").unwrap();
    assert_eq!(mem.list("progress").unwrap(), vec!["a.json".to_string()]);
}

#[test]
fn mem_clones_share_contents() {
    let mem = MemSubstrate::new();
    let other = mem.clone();
    mem.append("events.log", b"x").unwrap();
    assert_eq!(other.contents("events.log").unwrap(), b"x");
}

#[test]
fn mem_injected_failure_blocks_writes() {
    let mem = MemSubstrate::new();
    mem.set_fail_writes(true);
    assert!(matches!(mem.append("queue.log", b"x"), Err(StorageError::Io(_))));
    mem.set_fail_writes(false);
    mem.append("queue.log", b"x").unwrap();
}
