//! File-per-key blob store.
//!
//! Each key is stored as `<base_dir>/<key>.json`. Writes go to a temporary
//! sibling file that is then renamed into place, so a crash mid-write
//! leaves either the previous record or the new one, never a torn file.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use log::debug;
use tokio::fs;

use super::BlobStore;
use crate::error::StoreError;

const RECORD_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "json.tmp";

#[derive(Debug, Clone)]
pub struct DiskBlobStore {
    base_dir: PathBuf,
}

impl DiskBlobStore {
    /// Creates a store rooted at `base_dir`. The directory is created on
    /// first write.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Resolves the file for `key`, rejecting keys that could escape the
    /// base directory. Dots are allowed anywhere except as the whole key.
    fn record_path(&self, key: &str, extension: &str) -> Result<PathBuf, StoreError> {
        let invalid = key.is_empty()
            || key == "."
            || key == ".."
            || key.contains('/')
            || key.contains('\\')
            || key.contains('\0');
        if invalid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.base_dir.join(format!("{}.{}", key, extension)))
    }
}

fn io_error(key: &str, source: std::io::Error) -> StoreError {
    StoreError::Io {
        key: key.to_string(),
        source,
    }
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let path = self.record_path(key, RECORD_EXTENSION)?;
        let temp_path = self.record_path(key, TEMP_EXTENSION)?;

        fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| io_error(key, e))?;
        fs::write(&temp_path, &bytes)
            .await
            .map_err(|e| io_error(key, e))?;
        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| io_error(key, e))?;

        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.record_path(key, RECORD_EXTENSION)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key, e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.record_path(key, RECORD_EXTENSION)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key, e)),
        }
    }
}
