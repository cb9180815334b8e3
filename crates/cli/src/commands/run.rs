// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tide run` - execute one batch of queued chains
//!
//! Ctrl-C cancels the batch's scope: running tasks are interrupted, their
//! chains stay queued, and no retry is counted.

use crate::host::Host;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tide_core::{Clock, ExecutionMetrics, SystemClock};
use tokio_util::sync::CancellationToken;

#[derive(Args)]
pub struct RunArgs {
    /// Maximum chains to attempt
    #[arg(long, default_value_t = 16)]
    pub max_chains: usize,

    /// Total time budget for the batch
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,

    /// Host deadline, relative to now; the budget ends a grace period before it
    #[arg(long, value_parser = humantime::parse_duration)]
    pub deadline_in: Option<Duration>,
}

#[derive(Serialize)]
#[serde(transparent)]
struct Report(ExecutionMetrics);

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.0;
        writeln!(
            f,
            "Attempted {} chains: {} succeeded, {} failed",
            m.chains_attempted, m.chains_succeeded, m.chains_failed
        )?;
        writeln!(
            f,
            "Elapsed {}ms ({:.1}% of budget)",
            m.duration_ms, m.time_usage_percentage
        )?;
        if m.was_killed_by_system {
            writeln!(f, "Interrupted before the queue drained")?;
        }
        if m.needs_continuation() {
            write!(f, "{} chains still queued", m.queue_size_remaining)
        } else {
            write!(f, "Queue empty")
        }
    }
}

pub async fn handle(host: &Host, args: RunArgs, format: OutputFormat) -> Result<()> {
    let interrupt = CancellationToken::new();
    let executor = host.executor()?.with_parent_token(interrupt.clone());
    let deadline = args
        .deadline_in
        .map(|d| SystemClock.epoch_ms().saturating_add(d.as_millis() as u64));

    let watcher = tokio::spawn({
        let interrupt = interrupt.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, suspending batch");
                interrupt.cancel();
            }
        }
    });

    let result = executor
        .execute_chains_in_batch(args.max_chains, args.timeout, deadline)
        .await;
    watcher.abort();
    result?;

    executor.close();
    output::print(&Report(executor.last_metrics().unwrap_or_default()), format);
    Ok(())
}
