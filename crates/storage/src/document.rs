// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Document storage for chain definitions and checkpoints
//!
//! One checksummed JSON document per `(kind, id)` at `<kind>/<id>.json`,
//! always replaced atomically.

use crate::error::StorageError;
use crate::record::Document;
use crate::substrate::Substrate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tide_core::{Chain, ChainId, ChainProgress};

/// Checksummed JSON documents grouped by kind
#[derive(Clone)]
pub struct DocumentStore {
    substrate: Arc<dyn Substrate>,
}

impl DocumentStore {
    pub fn new(substrate: Arc<dyn Substrate>) -> Self {
        Self { substrate }
    }

    pub fn save<T: Serialize + DeserializeOwned>(
        &self,
        kind: &str,
        id: &str,
        data: &T,
    ) -> Result<(), StorageError> {
        let key = Self::key_for(kind, id)?;
        let bytes = Document::encode(data)?;
        self.substrate.ensure_space(bytes.len() as u64)?;
        self.substrate.replace_atomic(&key, &bytes)
    }

    /// Load a document; `None` if it was never saved or has been deleted
    pub fn load<T: Serialize + DeserializeOwned>(
        &self,
        kind: &str,
        id: &str,
    ) -> Result<Option<T>, StorageError> {
        let key = Self::key_for(kind, id)?;
        match self.substrate.read(&key)? {
            Some(bytes) => Document::decode(&key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Returns whether a document was removed
    pub fn delete(&self, kind: &str, id: &str) -> Result<bool, StorageError> {
        let key = Self::key_for(kind, id)?;
        self.substrate.remove(&key)
    }

    /// List all ids of a given kind
    pub fn list(&self, kind: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .substrate
            .list(kind)?
            .into_iter()
            .filter_map(|name| name.strip_suffix(".json").map(str::to_string))
            .collect())
    }

    pub fn exists(&self, kind: &str, id: &str) -> Result<bool, StorageError> {
        let key = Self::key_for(kind, id)?;
        Ok(self.substrate.size(&key)? > 0)
    }

    fn key_for(kind: &str, id: &str) -> Result<String, StorageError> {
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(StorageError::InvalidKey(id.to_string()));
        }
        Ok(format!("{}/{}.json", kind, id))
    }
}

/// Immutable chain definitions, `chains/<id>.json`
#[derive(Clone)]
pub struct ChainStore {
    docs: DocumentStore,
}

impl ChainStore {
    const KIND: &'static str = "chains";

    pub fn new(substrate: Arc<dyn Substrate>) -> Self {
        Self {
            docs: DocumentStore::new(substrate),
        }
    }

    pub fn save(&self, chain: &Chain) -> Result<(), StorageError> {
        self.docs.save(Self::KIND, chain.id.as_str(), chain)
    }

    pub fn load(&self, id: &ChainId) -> Result<Option<Chain>, StorageError> {
        self.docs.load(Self::KIND, id.as_str())
    }

    pub fn delete(&self, id: &ChainId) -> Result<bool, StorageError> {
        self.docs.delete(Self::KIND, id.as_str())
    }

    pub fn list(&self) -> Result<Vec<ChainId>, StorageError> {
        Ok(self.docs.list(Self::KIND)?.into_iter().map(ChainId).collect())
    }
}

/// Chain checkpoints, `progress/<id>.json`
#[derive(Clone)]
pub struct ProgressStore {
    docs: DocumentStore,
}

impl ProgressStore {
    const KIND: &'static str = "progress";

    pub fn new(substrate: Arc<dyn Substrate>) -> Self {
        Self {
            docs: DocumentStore::new(substrate),
        }
    }

    /// Durably write a snapshot; callers act only after this returns
    pub fn save(&self, progress: &ChainProgress) -> Result<(), StorageError> {
        self.docs
            .save(Self::KIND, progress.chain_id.as_str(), progress)
    }

    pub fn load(&self, id: &ChainId) -> Result<Option<ChainProgress>, StorageError> {
        self.docs.load(Self::KIND, id.as_str())
    }

    pub fn delete(&self, id: &ChainId) -> Result<bool, StorageError> {
        self.docs.delete(Self::KIND, id.as_str())
    }

    pub fn list(&self) -> Result<Vec<ChainId>, StorageError> {
        Ok(self.docs.list(Self::KIND)?.into_iter().map(ChainId).collect())
    }
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
