// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution constraints carried on tasks for the host scheduler
//!
//! The engine never evaluates these itself; they travel with the chain so
//! the platform trigger layer can decide when to grant execution time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Scheduling priority hint for the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Qos {
    Utility,
    #[default]
    Background,
    UserInitiated,
    UserInteractive,
}

/// How retry delays grow between attempts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffPolicy {
    Linear,
    #[default]
    Exponential,
}

/// Device-state constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemConstraint {
    AllowLowStorage,
    AllowLowBattery,
    RequireBatteryNotLow,
    DeviceIdle,
}

/// Constraint set for a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    pub requires_network: bool,
    pub requires_unmetered_network: bool,
    pub requires_charging: bool,
    pub allow_while_idle: bool,
    /// Heavy tasks ask the host for a long-running processing window
    pub is_heavy_task: bool,
    pub qos: Qos,
    pub backoff_policy: BackoffPolicy,
    #[serde(with = "humantime_serde")]
    pub backoff_delay: Duration,
    pub system_constraints: BTreeSet<SystemConstraint>,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            requires_network: false,
            requires_unmetered_network: false,
            requires_charging: false,
            allow_while_idle: false,
            is_heavy_task: false,
            qos: Qos::Background,
            backoff_policy: BackoffPolicy::Exponential,
            backoff_delay: Duration::from_secs(30),
            system_constraints: BTreeSet::new(),
        }
    }
}

impl Constraints {
    /// Delay before the given retry attempt (1-based)
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self.backoff_policy {
            BackoffPolicy::Linear => self.backoff_delay.saturating_mul(attempt),
            BackoffPolicy::Exponential => {
                let factor = 2u32.saturating_pow(attempt - 1);
                self.backoff_delay.saturating_mul(factor)
            }
        }
    }

    /// Fold a legacy trigger shape into a constraint set
    pub fn from_legacy(trigger: LegacyTrigger) -> Self {
        let mut constraints = Self::default();
        constraints.apply_legacy(trigger);
        constraints
    }

    /// Apply a legacy trigger on top of existing constraints
    pub fn apply_legacy(&mut self, trigger: LegacyTrigger) {
        match trigger {
            LegacyTrigger::BatteryOkay => {
                self.system_constraints
                    .insert(SystemConstraint::RequireBatteryNotLow);
            }
            LegacyTrigger::BatteryLow => {
                self.system_constraints
                    .insert(SystemConstraint::AllowLowBattery);
            }
            LegacyTrigger::StorageLow => {
                self.system_constraints
                    .insert(SystemConstraint::AllowLowStorage);
            }
            LegacyTrigger::DeviceIdle => {
                self.system_constraints.insert(SystemConstraint::DeviceIdle);
                self.allow_while_idle = true;
            }
            LegacyTrigger::Charging => self.requires_charging = true,
        }
    }
}

/// Deprecated trigger variants superseded by [`Constraints`]
///
/// Kept so older enqueue payloads still deserialize; they are converted once
/// at the edge and never reach the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyTrigger {
    BatteryOkay,
    BatteryLow,
    StorageLow,
    DeviceIdle,
    Charging,
}

#[cfg(test)]
#[path = "constraints_tests.rs"]
mod tests;
