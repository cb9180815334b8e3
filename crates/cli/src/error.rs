// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-facing errors with context and suggestions

use std::fmt;
use std::path::Path;

/// Error with context and recovery suggestions for user-friendly display.
#[derive(Debug)]
pub struct TideError {
    /// What went wrong
    pub message: String,
    /// Why it might have happened
    pub context: Vec<String>,
    /// How to fix it
    pub suggestions: Vec<String>,
}

impl TideError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn lock_held(data_dir: &Path) -> Self {
        TideError::new(format!(
            "data directory {} is in use",
            data_dir.display()
        ))
        .with_context("Another tide process holds the lock")
        .with_suggestion("Wait for the running batch to finish")
        .with_suggestion("Use a different directory with --data-dir")
    }

    pub fn no_data_dir() -> Self {
        TideError::new("no local data directory on this platform")
            .with_suggestion("Pass one explicitly with --data-dir")
    }

    pub fn config_not_found(path: &Path) -> Self {
        TideError::new(format!("config file {} not found", path.display()))
            .with_suggestion("Omit --config to use built-in defaults")
    }

    pub fn chain_not_found(chain_id: &str) -> Self {
        TideError::new(format!("chain '{chain_id}' not found"))
            .with_context("The chain may have completed, failed terminally, or been cancelled")
            .with_suggestion("List queued chains: tide queue")
            .with_suggestion("Check recorded outcomes: tide events list --all")
    }

    pub fn invalid_chain_file(path: &Path, reason: impl fmt::Display) -> Self {
        TideError::new(format!("invalid chain file {}", path.display()))
            .with_context(reason.to_string())
            .with_suggestion(
                r#"Expected {"id": "...", "steps": [[{"worker_id": "echo"}], ...]}"#,
            )
    }
}

impl fmt::Display for TideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.message)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            for ctx in &self.context {
                writeln!(f, "  -> {}", ctx)?;
            }
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "suggestions:")?;
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for TideError {}
