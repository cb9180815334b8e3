// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tide - host for the chain execution engine
//!
//! Each invocation opens the data directory under an exclusive lock, so two
//! hosts never run batches over the same store.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod error;
mod host;
mod output;
mod workers;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{chain, enqueue, events, run};
use output::OutputFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tide",
    version,
    about = "Tide - resumable background chains under hard deadlines"
)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory [default: <local data dir>/tide]
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue a chain definition from a JSON file
    Enqueue(enqueue::EnqueueArgs),
    /// Execute queued chains within a time budget
    Run(run::RunArgs),
    /// List queued chains
    Queue,
    /// Show a chain's checkpoint
    Status {
        /// Chain id
        chain_id: String,
    },
    /// Remove a chain with its progress
    Cancel {
        /// Chain id
        chain_id: String,
    },
    /// Completion events
    Events(events::EventsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let host = host::Host::open(cli.data_dir, cli.config.as_deref())?;
    let format = cli.format;

    match cli.command {
        Commands::Enqueue(args) => enqueue::handle(&host, args, format)?,
        Commands::Run(args) => run::handle(&host, args, format).await?,
        Commands::Queue => chain::list(&host, format)?,
        Commands::Status { chain_id } => chain::status(&host, &chain_id, format)?,
        Commands::Cancel { chain_id } => chain::cancel(&host, &chain_id)?,
        Commands::Events(args) => events::handle(&host, args.command, format)?,
    }

    Ok(())
}
