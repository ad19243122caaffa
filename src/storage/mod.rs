//! Local persistence.
//!
//! [`KeyValueStore`] is the durable document store underneath the profile
//! repository and the catalog cache. Callers go through [`load`] and
//! [`persist`] rather than the raw trait so that every read follows the same
//! rule: a backend failure or an undecodable record reads as "absent".

pub mod traits;
pub mod memory;
pub mod sql;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::RecipeSyncConfig;

pub use memory::InMemoryStore;
pub use sql::SqliteStore;
pub use traits::{KeyValueStore, StorageError};

/// Open the store named by `config.storage_url`, or an in-memory store when
/// none is configured.
pub async fn open(config: &RecipeSyncConfig) -> Result<Arc<dyn KeyValueStore>, StorageError> {
    match config.storage_url.as_deref() {
        Some(url) => {
            let store = SqliteStore::new(url).await?;
            info!("Local storage opened");
            Ok(Arc::new(store))
        }
        None => {
            warn!("No storage_url configured; nothing will survive a restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

/// Read and decode the document under `key`.
///
/// Returns `None` when the key was never written, when the backend fails,
/// and when the stored JSON does not decode as `T`. The last two are logged
/// and counted; callers cannot tell them apart from "never written".
pub async fn load<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let value = match store.get(key).await {
        Ok(Some(value)) => value,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, error = %e, "Storage read failed, treating as absent");
            crate::metrics::record_storage_error("read");
            return None;
        }
    };

    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(key, error = %e, "Stored document does not decode, treating as absent");
            crate::metrics::record_storage_error("decode");
            None
        }
    }
}

/// Encode `value` and write it under `key`, durable on return.
pub async fn persist<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let json = serde_json::to_value(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
    store.set(key, &json).await.map_err(|e| {
        crate::metrics::record_storage_error("write");
        e
    })
}
