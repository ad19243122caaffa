use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Corrupt record under '{key}': {reason}")]
    Corruption {
        key: String,
        reason: String,
    },
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Durable local storage of JSON documents keyed by string.
///
/// Writes are durable before `set`/`delete` return; implementations must not
/// buffer. Deleting a missing key is not an error.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    async fn set(&self, key: &str, value: &Value) -> Result<(), StorageError>;
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Check existence. Default implementation reads the value.
    async fn contains(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key).await?.is_some())
    }
}
