// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::id::SequentialIdGen;
use serde_json::json;

#[test]
fn builder_produces_ordered_steps() {
    let chain = Chain::begin_with(
        "sync",
        vec![TaskSpec::new("download").with_id("A"), TaskSpec::new("download").with_id("B")],
    )
    .then(vec![TaskSpec::new("compress").with_id("C")])
    .named("nightly-sync")
    .build()
    .unwrap();

    assert_eq!(chain.total_steps(), 2);
    assert_eq!(chain.step(0).unwrap().tasks.len(), 2);
    assert_eq!(chain.step(1).unwrap().tasks[0].display_name(), "C");
    assert_eq!(chain.display_name(), "nightly-sync");
}

#[test]
fn chain_without_steps_is_rejected() {
    let err = Chain::new("empty", vec![]).unwrap_err();
    assert_eq!(err, ChainError::NoSteps(ChainId::new("empty")));
}

#[test]
fn step_without_tasks_is_rejected() {
    let err = Chain::new(
        "bad",
        vec![Step::single(TaskSpec::new("echo")), Step::new(vec![])],
    )
    .unwrap_err();
    assert!(matches!(err, ChainError::EmptyStep { step: 1, .. }));
}

#[test]
fn blank_worker_id_is_rejected() {
    let err = Chain::new("bad", vec![Step::single(TaskSpec::new("  "))]).unwrap_err();
    assert!(matches!(err, ChainError::MissingWorker { step: 0, task: 0, .. }));
}

#[test]
fn generated_ids_come_from_id_gen() {
    let id_gen = SequentialIdGen::new("chain");
    let chain = Chain::generate(&id_gen, vec![Step::single(TaskSpec::new("echo"))]).unwrap();
    assert_eq!(chain.id.as_str(), "chain-1");
    assert_eq!(chain.display_name(), "chain-1");
}

#[test]
fn task_display_name_falls_back_to_worker() {
    assert_eq!(TaskSpec::new("upload").display_name(), "upload");
}

#[test]
fn chain_definition_survives_json() {
    let chain = Chain::new(
        "json",
        vec![Step::single(
            TaskSpec::new("http").with_input(json!({"url": "https://example.com"})),
        )],
    )
    .unwrap();
    let text = serde_json::to_string(&chain).unwrap();
    let parsed: Chain = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, chain);
}

#[test]
fn stamped_takes_creation_time_from_clock() {
    let clock = crate::clock::FakeClock::at_epoch_ms(1_700_000_123_456);
    let chain = Chain::new("c1", vec![Step::single(TaskSpec::new("echo"))]).unwrap();

    let stamped = chain.stamped(&clock);

    assert_eq!(stamped.created_at.timestamp_millis(), 1_700_000_123_456);
    assert_eq!(stamped.steps, chain.steps);
    assert_eq!(stamped.id, chain.id);
}
