//! In-memory blob store.
//!
//! Suitable for tests and single-process deployments where state does not
//! need to survive a restart. With [`MemoryBlobStore::with_history`] every
//! write is also appended to a per-key journal, which makes checkpoint
//! sequences observable.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::BlobStore;
use crate::error::StoreError;

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    history: Option<RwLock<HashMap<String, Vec<Vec<u8>>>>>,
}

impl MemoryBlobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that journals every write.
    pub fn with_history() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            history: Some(RwLock::new(HashMap::new())),
        }
    }

    /// Returns every value written to `key`, oldest first.
    ///
    /// Empty when history is disabled. Deletes do not clear the journal.
    pub async fn history(&self, key: &str) -> Vec<Vec<u8>> {
        match &self.history {
            Some(history) => history.read().await.get(key).cloned().unwrap_or_default(),
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        if let Some(history) = &self.history {
            history
                .write()
                .await
                .entry(key.to_string())
                .or_default()
                .push(bytes.clone());
        }
        self.blobs.write().await.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.blobs.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.blobs.write().await.remove(key);
        Ok(())
    }
}
