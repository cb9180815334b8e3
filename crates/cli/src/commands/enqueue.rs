// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tide enqueue <file>` - queue a chain definition

use crate::error::TideError;
use crate::host::Host;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use clap::Args;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tide_core::{Chain, ChainError, Step, TaskSpec, UuidIdGen};
use tide_engine::{EnqueueOutcome, ExistingPolicy};

#[derive(Args)]
pub struct EnqueueArgs {
    /// Chain definition (JSON)
    pub file: PathBuf,

    /// Overwrite a queued chain with the same id, discarding its progress
    #[arg(long)]
    pub replace: bool,
}

/// On-disk chain definition: steps are lists of tasks run concurrently
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainFile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub steps: Vec<Vec<TaskSpec>>,
}

impl ChainFile {
    pub fn into_chain(self) -> Result<Chain, ChainError> {
        let steps = self.steps.into_iter().map(Step::new).collect();
        let chain = match self.id {
            Some(id) => Chain::new(id, steps)?,
            None => Chain::generate(&UuidIdGen, steps)?,
        };
        Ok(match self.name {
            Some(name) => chain.with_name(name),
            None => chain,
        })
    }
}

pub fn load_chain(path: &Path) -> Result<Chain> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| TideError::invalid_chain_file(path, e))?;
    let file: ChainFile =
        serde_json::from_str(&text).map_err(|e| TideError::invalid_chain_file(path, e))?;
    let chain = file
        .into_chain()
        .map_err(|e| TideError::invalid_chain_file(path, e))?;
    Ok(chain)
}

#[derive(Serialize)]
struct Enqueued {
    chain_id: String,
    steps: usize,
    kept: bool,
}

impl fmt::Display for Enqueued {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kept {
            write!(f, "Already queued: {}", self.chain_id)
        } else {
            write!(f, "Enqueued {} ({} steps)", self.chain_id, self.steps)
        }
    }
}

pub fn handle(host: &Host, args: EnqueueArgs, format: OutputFormat) -> Result<()> {
    let chain = load_chain(&args.file)?;
    let policy = if args.replace {
        ExistingPolicy::Replace
    } else {
        ExistingPolicy::Keep
    };
    let outcome = host.executor()?.enqueue_chain(&chain, policy)?;
    output::print(
        &Enqueued {
            chain_id: chain.id.to_string(),
            steps: chain.total_steps(),
            kept: outcome == EnqueueOutcome::Kept,
        },
        format,
    );
    Ok(())
}
