// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn empty_toml_yields_defaults() {
    let config = EngineConfig::from_toml("").unwrap();
    assert_eq!(config, EngineConfig::default());
    assert_eq!(config.executor.requeue_policy, RequeuePolicy::Head);
    assert_eq!(config.queue.on_corruption, CorruptionPolicy::Halt);
}

#[test]
fn parses_humantime_durations() {
    let config = EngineConfig::from_toml(
        r#"
        [executor]
        task_type = "refresh"
        shutdown_grace_period = "2s"
        task_timeout = "500ms"
        max_retries = 5
        requeue_policy = "tail"

        [event_store]
        consumed_retention = "1h"
        max_events = 10
        "#,
    )
    .unwrap();

    assert_eq!(config.executor.task_type, "refresh");
    assert_eq!(config.executor.shutdown_grace_period, Duration::from_secs(2));
    assert_eq!(config.executor.task_timeout, Duration::from_millis(500));
    assert_eq!(config.executor.max_retries, 5);
    assert_eq!(config.executor.requeue_policy, RequeuePolicy::Tail);
    assert_eq!(config.event_store.consumed_retention, Duration::from_secs(3600));
    assert_eq!(config.event_store.max_events, 10);
    // untouched section keeps defaults
    assert_eq!(config.queue, QueueConfig::default());
}

#[test]
fn zero_retries_is_invalid() {
    let err = EngineConfig::from_toml("[executor]\nmax_retries = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn safety_factor_below_one_is_invalid() {
    let err = EngineConfig::from_toml("[executor]\noverhead_safety_factor = 0.5\n").unwrap_err();
    assert!(err.to_string().contains("overhead_safety_factor"));
}

#[test]
fn unknown_duration_format_is_parse_error() {
    let err = EngineConfig::from_toml("[executor]\ntask_timeout = \"soon\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn missing_file_loads_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, EngineConfig::default());
}

#[test]
fn load_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tide.toml");
    std::fs::write(&path, "[queue]\ncompaction_threshold = 8\n").unwrap();
    let config = EngineConfig::load(&path).unwrap();
    assert_eq!(config.queue.compaction_threshold, 8);
}
