// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Sync coordinator.
//!
//! The [`SyncCoordinator`] is the only caller of the [`RemoteCatalogSource`]
//! and the only writer of the [`CatalogCache`]. It publishes one snapshot at
//! a time to the rest of the app through [`SyncCoordinator::current_catalog`],
//! which never waits on the network.
//!
//! # Cycle
//!
//! ```text
//! trigger ──► Syncing ──► fetch_all()
//!                          ├─ Ok  → cache.write → publish → Ready(fresh)
//!                          └─ Err → keep published snapshot → Ready(stale)
//! ```
//!
//! At most one fetch is in flight. Triggers that arrive while one is running
//! are collapsed into a single follow-up cycle.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use recipe_sync::{CatalogCache, InMemoryStore, RestCatalogSource, SyncCoordinator};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = Arc::new(InMemoryStore::new());
//! let cache = Arc::new(CatalogCache::load(store, "catalog_snapshot").await);
//! let source = RestCatalogSource::new("https://project.example.co", "anon", "recipes", Duration::from_secs(15)).unwrap();
//! let coordinator = Arc::new(SyncCoordinator::new(Arc::new(source), cache));
//!
//! coordinator.start().await;
//! match coordinator.current_catalog() {
//!     Ok(snapshot) => println!("{} recipes ({})", snapshot.len(), snapshot.freshness()),
//!     Err(e) => println!("{e}"),
//! }
//! # }
//! ```

mod types;
mod lifecycle;

pub use types::{CatalogError, SyncOutcome, SyncState};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::CatalogCache;
use crate::recipe::CatalogSnapshot;
use crate::remote::{RemoteCatalogSource, RemoteFetchError};

/// Orchestrates fetch, write-through and fallback for the recipe catalog.
pub struct SyncCoordinator {
    pub(super) source: Arc<dyn RemoteCatalogSource>,
    pub(super) cache: Arc<CatalogCache>,

    /// State machine (broadcast to watchers)
    pub(super) state: watch::Sender<SyncState>,

    /// Published snapshot; `None` until something is cached or fetched
    pub(super) catalog: watch::Sender<Option<Arc<CatalogSnapshot>>>,

    pub(super) last_error: RwLock<Option<RemoteFetchError>>,

    /// Running cycle and pending follow-up, owned by [`lifecycle::InFlightGuard`]
    pub(super) flight: Mutex<lifecycle::Flight>,

    /// Last fetch failed with nothing to serve
    pub(super) cold_failure: AtomicBool,
}

impl SyncCoordinator {
    /// Create a coordinator in `Idle`.
    ///
    /// Whatever the cache holds is published immediately (as stale) so
    /// readers have something before the first fetch completes.
    ///
    /// Nothing is fetched until [`start`](Self::start) or
    /// [`spawn_start`](Self::spawn_start) runs. Until then `current_catalog`
    /// reports [`CatalogError::Pending`] on an empty cache.
    pub fn new(source: Arc<dyn RemoteCatalogSource>, cache: Arc<CatalogCache>) -> Self {
        let hydrated = cache.read();
        if let Some(ref snapshot) = hydrated {
            info!(recipes = snapshot.len(), "Serving cached catalog until first sync");
            crate::metrics::set_catalog_size(snapshot.len());
        }

        let (state, _) = watch::channel(SyncState::Idle);
        let (catalog, _) = watch::channel(hydrated);

        Self {
            source,
            cache,
            state,
            catalog,
            last_error: RwLock::new(None),
            flight: Mutex::new(lifecycle::Flight::default()),
            cold_failure: AtomicBool::new(false),
        }
    }

    /// Run the startup sync on a background task and return its handle.
    ///
    /// The coordinator is in `Syncing` by the time this returns. Must be
    /// called from within a tokio runtime.
    pub fn spawn_start(self: &Arc<Self>) -> JoinHandle<SyncOutcome> {
        self.set_state(SyncState::Syncing);
        let coordinator = Arc::clone(self);
        tokio::spawn(async move { coordinator.start().await })
    }

    /// The most recently published snapshot. Never blocks on I/O.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NoCacheAvailable`] when nothing was ever cached and
    ///   the latest fetch failed.
    /// - [`CatalogError::Pending`] when nothing was ever cached and no fetch
    ///   has finished yet.
    pub fn current_catalog(&self) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        if let Some(snapshot) = self.catalog.borrow().clone() {
            return Ok(snapshot);
        }
        if self.cold_failure.load(Ordering::Acquire) {
            Err(CatalogError::NoCacheAvailable)
        } else {
            Err(CatalogError::Pending)
        }
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Watch published snapshots.
    #[must_use]
    pub fn subscribe_catalog(&self) -> watch::Receiver<Option<Arc<CatalogSnapshot>>> {
        self.catalog.subscribe()
    }

    /// Why the latest fetch failed, cleared by the next success.
    #[must_use]
    pub fn last_error(&self) -> Option<RemoteFetchError> {
        self.last_error.read().clone()
    }

    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.flight.lock().running
    }

    pub(super) fn set_state(&self, state: SyncState) {
        self.state.send_replace(state);
        crate::metrics::record_state_transition(&state.to_string());
    }

    pub(super) fn publish(&self, snapshot: Arc<CatalogSnapshot>) {
        crate::metrics::set_catalog_size(snapshot.len());
        self.catalog.send_replace(Some(snapshot));
    }
}
