// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! [executor]
//! task_type = "processing"
//! shutdown_grace_period = "5s"
//! task_timeout = "20s"
//! max_retries = 3
//! requeue_policy = "head"
//!
//! [event_store]
//! consumed_retention = "1day"
//! unconsumed_retention = "7days"
//! max_events = 1000
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors from loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where a failed-but-retryable chain goes back into the queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequeuePolicy {
    /// Retry before chains that have never run
    #[default]
    Head,
    /// Retry after everything already queued
    Tail,
}

/// What to do when the queue log is found corrupt at open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptionPolicy {
    /// Refuse to run
    #[default]
    Halt,
    /// Drop the corrupt tail and continue with what was recovered
    Truncate,
}

/// Chain executor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Label for metrics, e.g. the host window kind
    pub task_type: String,
    /// Time reserved after the deadline for in-flight saves
    #[serde(with = "humantime_serde")]
    pub shutdown_grace_period: Duration,
    /// Upper bound for a single task
    #[serde(with = "humantime_serde")]
    pub task_timeout: Duration,
    pub max_retries: u32,
    pub requeue_policy: RequeuePolicy,
    /// Lower bound for the save/cleanup overhead estimate
    #[serde(with = "humantime_serde")]
    pub min_overhead: Duration,
    /// Step duration assumed before any has been measured
    #[serde(with = "humantime_serde")]
    pub initial_step_estimate: Duration,
    /// Multiplier applied to the measured mean overhead
    pub overhead_safety_factor: f64,
    /// Number of samples kept for rolling estimates
    pub budget_window: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            task_type: "processing".to_string(),
            shutdown_grace_period: Duration::from_secs(5),
            task_timeout: Duration::from_secs(20),
            max_retries: 3,
            requeue_policy: RequeuePolicy::Head,
            min_overhead: Duration::from_millis(250),
            initial_step_estimate: Duration::from_millis(0),
            overhead_safety_factor: 1.5,
            budget_window: 16,
        }
    }
}

/// Durable queue settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Log records beyond which the queue log is rewritten
    pub compaction_threshold: usize,
    pub on_corruption: CorruptionPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            compaction_threshold: 256,
            on_corruption: CorruptionPolicy::Halt,
        }
    }
}

/// Event store retention settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventStoreConfig {
    #[serde(with = "humantime_serde")]
    pub consumed_retention: Duration,
    #[serde(with = "humantime_serde")]
    pub unconsumed_retention: Duration,
    pub max_events: usize,
    /// Minimum time between cleanup passes
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,
    /// Log size that forces a cleanup pass regardless of interval
    pub cleanup_size_threshold_bytes: u64,
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self {
            consumed_retention: Duration::from_secs(24 * 60 * 60),
            unconsumed_retention: Duration::from_secs(7 * 24 * 60 * 60),
            max_events: 1000,
            cleanup_interval: Duration::from_secs(60 * 60),
            cleanup_size_threshold_bytes: 1024 * 1024,
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub executor: ExecutorConfig,
    pub queue: QueueConfig,
    pub event_store: EventStoreConfig,
}

impl EngineConfig {
    /// Parse from TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.executor.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "executor.max_retries must be at least 1".to_string(),
            ));
        }
        if self.executor.task_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "executor.task_timeout must be positive".to_string(),
            ));
        }
        if self.executor.budget_window == 0 {
            return Err(ConfigError::Invalid(
                "executor.budget_window must be at least 1".to_string(),
            ));
        }
        if !(self.executor.overhead_safety_factor >= 1.0) {
            return Err(ConfigError::Invalid(
                "executor.overhead_safety_factor must be >= 1.0".to_string(),
            ));
        }
        if self.event_store.max_events == 0 {
            return Err(ConfigError::Invalid(
                "event_store.max_events must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
