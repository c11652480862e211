// Storage abstraction for state that must survive a restart

use crate::error::CoreError;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, CoreError>;

/// Abstract storage backend trait
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Save data with a key
    async fn save<T: Serialize + Sync>(&self, key: &str, data: &T) -> StorageResult<()>;

    /// Load data by key
    async fn load<T: DeserializeOwned + Send>(&self, key: &str) -> StorageResult<Option<T>>;

    /// Remove data by key. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Standard storage keys
pub mod keys {
    pub const PENDING_TXS: &str = "pending_txs";
}
