//! Last known-good catalog snapshot.
//!
//! The cache holds at most one snapshot, in memory and in the local store.
//! [`CatalogCache::write`] replaces both in one step: readers see either the
//! previous snapshot or the new one, never a mix. The store-side swap is a
//! single-row upsert, so an interrupted write leaves the previous document
//! readable.
//!
//! Everything the cache hands out is marked [`Freshness::Stale`]: by the time
//! it is read back it is, by definition, served from cache.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::recipe::{CatalogSnapshot, Freshness, Recipe};
use crate::storage::{self, KeyValueStore, StorageError};

/// Stored document shape.
#[derive(Serialize)]
struct PersistedCatalog<'a> {
    recipes: &'a [Recipe],
    fetched_at: i64,
}

/// Accepted on read: the current document, or a bare recipe array written
/// before `fetched_at` was tracked.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCatalog {
    Current {
        recipes: Vec<Recipe>,
        #[serde(default)]
        fetched_at: i64,
    },
    Bare(Vec<Recipe>),
}

impl StoredCatalog {
    fn into_snapshot(self) -> CatalogSnapshot {
        match self {
            Self::Current { recipes, fetched_at } => CatalogSnapshot::cached(recipes, fetched_at),
            Self::Bare(recipes) => CatalogSnapshot::cached(recipes, 0),
        }
    }
}

pub struct CatalogCache {
    store: Arc<dyn KeyValueStore>,
    key: String,
    current: RwLock<Option<Arc<CatalogSnapshot>>>,
    write_lock: Mutex<()>,
}

impl CatalogCache {
    /// Open the cache, reading whatever snapshot the store holds.
    ///
    /// An unreadable document is treated as "no cache".
    pub async fn load(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let current = storage::load::<StoredCatalog>(store.as_ref(), &key)
            .await
            .map(|stored| Arc::new(stored.into_snapshot()));

        match &current {
            Some(snapshot) => info!(
                recipes = snapshot.len(),
                fetched_at = snapshot.fetched_at(),
                "Catalog cache loaded"
            ),
            None => debug!("No cached catalog"),
        }

        Self {
            store,
            key,
            current: RwLock::new(current),
            write_lock: Mutex::new(()),
        }
    }

    /// The last snapshot written, or `None` if nothing was ever cached.
    #[must_use]
    pub fn read(&self) -> Option<Arc<CatalogSnapshot>> {
        self.current.read().clone()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.read().is_none()
    }

    /// Replace the cached snapshot.
    ///
    /// The in-memory copy is swapped before the store write, so a failed
    /// write still leaves [`read`](Self::read) returning the new snapshot
    /// for the rest of this process. The error is returned for the caller
    /// to log.
    #[tracing::instrument(skip(self, snapshot), fields(recipes = snapshot.len()))]
    pub async fn write(&self, snapshot: &CatalogSnapshot) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        let cached = match snapshot.freshness() {
            Freshness::Stale => snapshot.clone(),
            Freshness::Fresh => snapshot.as_stale(),
        };
        *self.current.write() = Some(Arc::new(cached));

        let doc = PersistedCatalog {
            recipes: snapshot.recipes(),
            fetched_at: snapshot.fetched_at(),
        };
        storage::persist(self.store.as_ref(), &self.key, &doc)
            .await
            .map_err(|e| {
                warn!(error = %e, "Catalog snapshot not persisted; kept in memory only");
                e
            })
    }
}
