// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence substrate
//!
//! Every store writes through a [`Substrate`] addressed by relative keys such
//! as `queue.log` or `progress/<chain>.json`. [`FsSubstrate`] is the real
//! filesystem; `MemSubstrate` backs tests.

use crate::error::StorageError;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

/// Key-addressed durable byte storage
pub trait Substrate: Send + Sync {
    /// Full contents, or `None` if the key does not exist
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Create or overwrite
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Append and sync before returning
    fn append(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Replace contents so readers observe either the old or the new bytes
    fn replace_atomic(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Returns whether the key existed
    fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// Names of entries directly under `dir`, sorted
    fn list(&self, dir: &str) -> Result<Vec<String>, StorageError>;

    /// Byte length, 0 if absent
    fn size(&self, key: &str) -> Result<u64, StorageError>;

    fn available_bytes(&self) -> Result<u64, StorageError>;

    /// Free space that must remain after any write
    fn reserve_bytes(&self) -> u64 {
        0
    }

    /// Fail with `InsufficientStorage` unless `required` bytes (plus a 20%
    /// margin and the reserve) fit. Fails open if free space is unknown.
    fn ensure_space(&self, required: u64) -> Result<(), StorageError> {
        let available = match self.available_bytes() {
            Ok(available) => available,
            Err(e) => {
                tracing::warn!(error = %e, "cannot determine free space");
                return Ok(());
            }
        };
        let needed = required
            .saturating_add(required / 5)
            .saturating_add(self.reserve_bytes());
        if available < needed {
            return Err(StorageError::InsufficientStorage {
                required: needed,
                available,
            });
        }
        Ok(())
    }
}

/// Reject keys that would escape the store root
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let path = Path::new(key);
    let valid = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// Filesystem substrate rooted at a data directory
#[derive(Debug, Clone)]
pub struct FsSubstrate {
    root: PathBuf,
    reserve_bytes: u64,
}

impl FsSubstrate {
    /// Default free space kept after writes
    pub const DEFAULT_RESERVE_BYTES: u64 = 50 * 1024 * 1024;

    /// Open the root, creating it if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            reserve_bytes: Self::DEFAULT_RESERVE_BYTES,
        })
    }

    pub fn with_reserve_bytes(self, reserve_bytes: u64) -> Self {
        Self {
            reserve_bytes,
            ..self
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    fn ensure_parent(path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl Substrate for FsSubstrate {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        Self::ensure_parent(&path)?;
        let mut file = File::create(&path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        Ok(())
    }

    fn append(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        Self::ensure_parent(&path)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(bytes)?;
        // Durable before returning
        file.sync_all()?;
        Ok(())
    }

    fn replace_atomic(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        Self::ensure_parent(&path)?;
        let tmp = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, dir: &str) -> Result<Vec<String>, StorageError> {
        let path = self.path_for(dir)?;
        let entries = match fs::read_dir(&path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn size(&self, key: &str) -> Result<u64, StorageError> {
        let path = self.path_for(key)?;
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn available_bytes(&self) -> Result<u64, StorageError> {
        Ok(fs2::available_space(&self.root)?)
    }

    fn reserve_bytes(&self) -> u64 {
        self.reserve_bytes
    }
}

#[cfg(any(test, feature = "test-support"))]
mod mem {
    use super::{validate_key, Substrate};
    use crate::error::StorageError;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct MemState {
        files: BTreeMap<String, Vec<u8>>,
        available: u64,
        fail_writes: bool,
    }

    /// In-memory substrate; clones share contents
    #[derive(Debug, Clone)]
    pub struct MemSubstrate {
        state: Arc<Mutex<MemState>>,
    }

    impl Default for MemSubstrate {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MemSubstrate {
        pub fn new() -> Self {
            Self {
                state: Arc::new(Mutex::new(MemState {
                    files: BTreeMap::new(),
                    available: u64::MAX,
                    fail_writes: false,
                })),
            }
        }

        pub fn set_available_bytes(&self, available: u64) {
            self.lock().available = available;
        }

        /// Make every mutating call fail with an io error
        pub fn set_fail_writes(&self, fail: bool) {
            self.lock().fail_writes = fail;
        }

        /// Raw contents of a key, for inspection in tests
        pub fn contents(&self, key: &str) -> Option<Vec<u8>> {
            self.lock().files.get(key).cloned()
        }

        pub fn keys(&self) -> Vec<String> {
            self.lock().files.keys().cloned().collect()
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, MemState> {
            self.state.lock().unwrap_or_else(|e| e.into_inner())
        }

        fn check_writable(state: &MemState) -> Result<(), StorageError> {
            if state.fail_writes {
                return Err(StorageError::Io(std::io::Error::other("injected write failure")));
            }
            Ok(())
        }
    }

    impl Substrate for MemSubstrate {
        fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            validate_key(key)?;
            Ok(self.lock().files.get(key).cloned())
        }

        fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
            validate_key(key)?;
            let mut state = self.lock();
            Self::check_writable(&state)?;
            state.files.insert(key.to_string(), bytes.to_vec());
            Ok(())
        }

        fn append(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
            validate_key(key)?;
            let mut state = self.lock();
            Self::check_writable(&state)?;
            state
                .files
                .entry(key.to_string())
                .or_default()
                .extend_from_slice(bytes);
            Ok(())
        }

        fn replace_atomic(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
            self.write(key, bytes)
        }

        fn remove(&self, key: &str) -> Result<bool, StorageError> {
            validate_key(key)?;
            let mut state = self.lock();
            Self::check_writable(&state)?;
            Ok(state.files.remove(key).is_some())
        }

        fn list(&self, dir: &str) -> Result<Vec<String>, StorageError> {
            validate_key(dir)?;
            let prefix = format!("{}/", dir.trim_end_matches('/'));
            Ok(self
                .lock()
                .files
                .keys()
                .filter_map(|k| k.strip_prefix(&prefix))
                .filter(|rest| !rest.contains('/'))
                .map(str::to_string)
                .collect())
        }

        fn size(&self, key: &str) -> Result<u64, StorageError> {
            validate_key(key)?;
            Ok(self
                .lock()
                .files
                .get(key)
                .map(|b| b.len() as u64)
                .unwrap_or(0))
        }

        fn available_bytes(&self) -> Result<u64, StorageError> {
            Ok(self.lock().available)
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use mem::MemSubstrate;

#[cfg(test)]
#[path = "substrate_tests.rs"]
mod tests;
