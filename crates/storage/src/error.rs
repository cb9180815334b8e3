// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage errors

use thiserror::Error;

/// Where and why a persisted log or document failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corruption {
    pub key: String,
    /// 1-based line number of the first bad record (0 for documents)
    pub line: u64,
    /// Byte length of the valid prefix
    pub valid_len: u64,
    pub reason: String,
}

impl std::fmt::Display for Corruption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line == 0 {
            write!(f, "{}: {}", self.key, self.reason)
        } else {
            write!(f, "{} line {}: {}", self.key, self.line, self.reason)
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt store: {0}")]
    Corrupt(Corruption),
    #[error("insufficient storage: {required} bytes required, {available} available")]
    InsufficientStorage { required: u64, available: u64 },
    #[error("invalid key: {0:?}")]
    InvalidKey(String),
}
