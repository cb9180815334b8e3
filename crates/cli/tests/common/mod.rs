// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch data directory plus a place for chain files
pub struct TestEnv {
    pub temp: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.temp.path().join("data")
    }

    /// `tide --data-dir <data> <args>`
    pub fn tide(&self, args: &[&str]) -> Command {
        let mut cmd = Command::cargo_bin("tide").expect("tide binary");
        cmd.arg("--data-dir").arg(self.data_dir()).args(args);
        cmd
    }

    /// Write a chain definition and return its path
    pub fn chain_file(&self, name: &str, chain: &Value) -> PathBuf {
        let path = self.temp.path().join(format!("{name}.json"));
        std::fs::write(&path, chain.to_string()).expect("Failed to write chain file");
        path
    }

    pub fn enqueue(&self, chain: &Value) {
        let id = chain["id"].as_str().unwrap_or("chain");
        let path = self.chain_file(id, chain);
        self.tide(&["enqueue", path_str(&path)]).assert().success();
    }

    /// Run a command with `--format json` and parse its stdout
    pub fn json(&self, args: &[&str]) -> Value {
        let mut full = vec!["--format", "json"];
        full.extend_from_slice(args);
        let output = self
            .tide(&full)
            .output()
            .expect("Failed to run tide");
        assert!(
            output.status.success(),
            "tide {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
    }
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}
