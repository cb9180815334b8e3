// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tide events` - inspect and maintain recorded chain outcomes

use crate::host::Host;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tide_core::EventId;
use tide_engine::EventSyncManager;
use tide_storage::StoredEvent;

#[derive(Args)]
pub struct EventsArgs {
    #[command(subcommand)]
    pub command: EventsCommand,
}

#[derive(Subcommand)]
pub enum EventsCommand {
    /// List unconsumed events, oldest first
    List {
        /// Include consumed events
        #[arg(long)]
        all: bool,
    },
    /// Replay events nobody has acknowledged yet
    Sync {
        /// Acknowledge each replayed event
        #[arg(long)]
        ack: bool,
    },
    /// Mark an event as consumed
    Ack {
        /// Event id
        id: String,
    },
    /// Delete events older than the given age
    Clear {
        #[arg(long, value_parser = humantime::parse_duration)]
        older_than: Duration,
    },
    /// Run a retention pass now
    Cleanup,
}

#[derive(Serialize)]
#[serde(transparent)]
struct EventRow(StoredEvent);

impl fmt::Display for EventRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = &self.0;
        let outcome = if e.event.success { "ok" } else { "failed" };
        write!(
            f,
            "{:<40} {:<24} {:<6}",
            e.id.to_string(),
            e.event.task_name,
            outcome
        )?;
        if e.consumed {
            write!(f, " (consumed)")?;
        }
        if let Some(message) = &e.event.message {
            write!(f, " {}", message)?;
        }
        Ok(())
    }
}

fn rows(events: Vec<StoredEvent>) -> Vec<EventRow> {
    events.into_iter().map(EventRow).collect()
}

pub fn handle(host: &Host, command: EventsCommand, format: OutputFormat) -> Result<()> {
    let executor = host.executor()?;
    let events = executor.events();

    match command {
        EventsCommand::List { all } => {
            let listed = if all {
                events.store().all_events()
            } else {
                events.store().unconsumed_events()
            };
            output::print_list(&rows(listed), format, "No events");
        }
        EventsCommand::Sync { ack } => {
            let replayed = EventSyncManager::new().sync_events(events);
            if ack {
                for stored in &replayed {
                    events.acknowledge(&stored.id)?;
                }
            }
            output::print_list(&rows(replayed), format, "No missed events");
        }
        EventsCommand::Ack { id } => {
            if events.acknowledge(&EventId::from(id.as_str()))? {
                println!("Acknowledged {}", id);
            } else {
                println!("No pending event {}", id);
            }
        }
        EventsCommand::Clear { older_than } => {
            let removed = EventSyncManager::new().clear_old_events(events.store(), older_than)?;
            println!("Removed {} events", removed);
        }
        EventsCommand::Cleanup => {
            let report = events.store().run_cleanup()?;
            println!(
                "Removed {} events ({} consumed expired, {} unconsumed expired, {} evicted)",
                report.total(),
                report.consumed_expired,
                report.unconsumed_expired,
                report.evicted
            );
        }
    }
    Ok(())
}
