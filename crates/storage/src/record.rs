// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checksummed records
//!
//! Logs are newline-delimited JSON, one [`Record`] per line. Documents are a
//! single pretty-printed [`Document`]. Both carry a CRC32 of the serialized
//! body and are rejected on mismatch.

use crate::error::{Corruption, StorageError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

fn checksum_of<T: Serialize>(body: &T) -> Result<u32, StorageError> {
    let json = serde_json::to_string(body)?;
    Ok(crc32fast::hash(json.as_bytes()))
}

/// A single log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    /// Position within the current log generation
    pub seq: u64,
    pub body: T,
    pub checksum: u32,
}

impl<T: Serialize + DeserializeOwned> Record<T> {
    pub fn new(seq: u64, body: T) -> Result<Self, StorageError> {
        let checksum = checksum_of(&body)?;
        Ok(Self {
            seq,
            body,
            checksum,
        })
    }

    pub fn verify(&self) -> bool {
        checksum_of(&self.body)
            .map(|c| c == self.checksum)
            .unwrap_or(false)
    }

    /// Serialize to one line including the trailing newline
    pub fn to_line(&self) -> Result<String, StorageError> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    pub fn from_line(line: &str) -> Result<Self, StorageError> {
        serde_json::from_str(line).map_err(StorageError::from)
    }
}

/// Result of scanning a log
#[derive(Debug)]
pub struct LogScan<T> {
    pub bodies: Vec<T>,
    /// Sequence number for the next append
    pub next_seq: u64,
    /// First invalid record, if any; everything after it is ignored
    pub corruption: Option<Corruption>,
    /// Byte length of the valid prefix
    pub valid_len: u64,
}

/// Decode a log, stopping at the first unparsable or mismatched record
pub fn scan_log<T: Serialize + DeserializeOwned>(key: &str, bytes: &[u8]) -> LogScan<T> {
    let mut bodies = Vec::new();
    let mut next_seq = 0;
    let mut offset: u64 = 0;
    let mut corruption = None;

    for (idx, raw) in bytes.split_inclusive(|b| *b == b'\n').enumerate() {
        let line_no = idx as u64 + 1;
        let fail = |reason: String| Corruption {
            key: key.to_string(),
            line: line_no,
            valid_len: offset,
            reason,
        };

        // A final line without newline is a torn write
        if !raw.ends_with(b"\n") {
            corruption = Some(fail("truncated record".to_string()));
            break;
        }
        let text = match std::str::from_utf8(raw) {
            Ok(text) => text.trim_end(),
            Err(_) => {
                corruption = Some(fail("invalid utf-8".to_string()));
                break;
            }
        };
        if text.is_empty() {
            offset += raw.len() as u64;
            continue;
        }
        match Record::<T>::from_line(text) {
            Ok(record) if record.verify() => {
                next_seq = record.seq + 1;
                bodies.push(record.body);
            }
            Ok(record) => {
                corruption = Some(fail(format!("checksum mismatch at seq {}", record.seq)));
                break;
            }
            Err(e) => {
                corruption = Some(fail(e.to_string()));
                break;
            }
        }
        offset += raw.len() as u64;
    }

    LogScan {
        bodies,
        next_seq,
        corruption,
        valid_len: offset,
    }
}

/// Encode bodies as a fresh log generation starting at seq 0
pub fn encode_log<T: Serialize + DeserializeOwned + Clone>(
    bodies: &[T],
) -> Result<Vec<u8>, StorageError> {
    let mut out = String::new();
    for (seq, body) in bodies.iter().enumerate() {
        out.push_str(&Record::new(seq as u64, body.clone())?.to_line()?);
    }
    Ok(out.into_bytes())
}

/// A checksummed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document<T> {
    pub version: u32,
    pub checksum: u32,
    pub body: T,
}

impl<T: Serialize + DeserializeOwned> Document<T> {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn encode(body: &T) -> Result<Vec<u8>, StorageError> {
        #[derive(Serialize)]
        struct Borrowed<'a, T> {
            version: u32,
            checksum: u32,
            body: &'a T,
        }
        let doc = Borrowed {
            version: Self::CURRENT_VERSION,
            checksum: checksum_of(body)?,
            body,
        };
        Ok(serde_json::to_vec_pretty(&doc)?)
    }

    pub fn decode(key: &str, bytes: &[u8]) -> Result<T, StorageError> {
        let corrupt = |reason: String| {
            StorageError::Corrupt(Corruption {
                key: key.to_string(),
                line: 0,
                valid_len: 0,
                reason,
            })
        };
        let doc: Document<T> = serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?;
        if checksum_of(&doc.body)? != doc.checksum {
            return Err(corrupt("checksum mismatch".to_string()));
        }
        Ok(doc.body)
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
