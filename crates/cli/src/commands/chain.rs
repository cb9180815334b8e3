// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tide queue`, `tide status`, `tide cancel`

use crate::error::TideError;
use crate::host::Host;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use serde::Serialize;
use std::fmt;
use tide_core::{ChainId, ChainProgress};

#[derive(Serialize)]
struct ChainRow {
    position: usize,
    chain_id: String,
    /// None until the chain's first attempt
    progress: Option<ChainProgress>,
}

impl fmt::Display for ChainRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<4} {:<36}", self.position, self.chain_id)?;
        match &self.progress {
            Some(p) => write!(
                f,
                " {:>3}%  retries {}/{}",
                p.completion_percentage(),
                p.retry_count,
                p.max_retries
            ),
            None => write!(f, " pending"),
        }
    }
}

pub fn list(host: &Host, format: OutputFormat) -> Result<()> {
    let executor = host.executor()?;
    let mut rows = Vec::new();
    for (position, chain_id) in executor.queued_chains().into_iter().enumerate() {
        let progress = executor.chain_progress(&chain_id)?;
        rows.push(ChainRow {
            position,
            chain_id: chain_id.to_string(),
            progress,
        });
    }
    output::print_list(&rows, format, "No queued chains");
    Ok(())
}

#[derive(Serialize)]
struct Status {
    chain_id: String,
    queued: bool,
    progress: Option<ChainProgress>,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Chain: {}", self.chain_id)?;
        writeln!(f, "  Queued: {}", if self.queued { "yes" } else { "no" })?;
        let Some(p) = &self.progress else {
            return write!(f, "  Not started");
        };
        let completed: Vec<String> = p.completed_steps.iter().map(|s| s.to_string()).collect();
        writeln!(
            f,
            "  Progress: {}% ({}/{} steps)",
            p.completion_percentage(),
            p.completed_steps.len(),
            p.total_steps
        )?;
        writeln!(f, "  Completed steps: [{}]", completed.join(", "))?;
        for (step, tasks) in &p.completed_tasks_in_step {
            writeln!(f, "  Step {} finished tasks: {:?}", step, tasks)?;
        }
        if let Some(step) = p.last_failed_step {
            writeln!(f, "  Last failed step: {}", step)?;
        }
        write!(f, "  Retries: {}/{}", p.retry_count, p.max_retries)
    }
}

pub fn status(host: &Host, chain_id: &str, format: OutputFormat) -> Result<()> {
    let executor = host.executor()?;
    let id = ChainId::from(chain_id);
    let queued = executor.queued_chains().contains(&id);
    let progress = executor.chain_progress(&id)?;
    if !queued && progress.is_none() {
        return Err(TideError::chain_not_found(chain_id).into());
    }
    output::print(
        &Status {
            chain_id: chain_id.to_string(),
            queued,
            progress,
        },
        format,
    );
    Ok(())
}

pub fn cancel(host: &Host, chain_id: &str) -> Result<()> {
    if !host.executor()?.cancel_chain(&ChainId::from(chain_id))? {
        return Err(TideError::chain_not_found(chain_id).into());
    }
    println!("Cancelled {}", chain_id);
    Ok(())
}
