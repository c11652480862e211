// File-based storage: one pretty-printed JSON document per key

use crate::storage_trait::{StorageBackend, StorageResult};
use crate::error::CoreError;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use log::debug;

/// File-based storage backend rooted at a directory
pub struct FileStorage {
    base_dir: PathBuf,
    next_tmp: AtomicU64,
}

impl FileStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            next_tmp: AtomicU64::new(0),
        }
    }

    /// Temp file unique to this write, next to the target
    fn tmp_path(&self, key: &str) -> PathBuf {
        let n = self.next_tmp.fetch_add(1, Ordering::Relaxed);
        self.base_dir
            .join(format!("{}.json.{}-{}.tmp", key, std::process::id(), n))
    }

    fn get_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl StorageBackend for FileStorage {
    /// Writes go to a sibling temp file first and are renamed into place, so a
    /// crash mid-write leaves the previous document intact.
    async fn save<T: Serialize + Sync>(&self, key: &str, data: &T) -> StorageResult<()> {
        let path = self.get_path(key);
        debug!("Saving {} to {:?}", key, path);

        tokio::fs::create_dir_all(&self.base_dir).await
            .map_err(|e| CoreError::Storage(format!("Failed to create directory: {}", e)))?;

        let json = serde_json::to_string_pretty(data)?;

        let tmp_path = self.tmp_path(key);
        tokio::fs::write(&tmp_path, json).await
            .map_err(|e| CoreError::Storage(format!("Failed to write file: {}", e)))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(CoreError::Storage(format!("Failed to replace file: {}", e)));
        }

        Ok(())
    }

    async fn load<T: DeserializeOwned + Send>(&self, key: &str) -> StorageResult<Option<T>> {
        let path = self.get_path(key);

        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No stored data for {}", key);
                return Ok(None);
            }
            Err(e) => return Err(CoreError::Storage(format!("Failed to read file: {}", e))),
        };

        let data = serde_json::from_str(&json)?;
        debug!("Loaded {} from {:?}", key, path);
        Ok(Some(data))
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.get_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Storage(format!("Failed to remove file: {}", e))),
        }
    }
}
