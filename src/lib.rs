//! # Recipe Sync
//!
//! Client-side sync and offline cache for a remotely curated recipe catalog,
//! plus the device-local user profile store.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐   triggers   ┌────────────────────────────┐
//! │ ChangeNotification-  │ ───────────► │      SyncCoordinator       │
//! │ Listener             │              │  • single-flight sync      │
//! │  • change feed       │              │  • Idle/Syncing/Ready      │
//! │  • app lifecycle     │              │  • current_catalog()       │
//! └──────────────────────┘              └────────────────────────────┘
//!                                          │ fetch_all       │ write / read
//!                                          ▼                 ▼
//!                             ┌─────────────────────┐ ┌──────────────┐
//!                             │ RemoteCatalogSource │ │ CatalogCache │
//!                             │  (REST, PostgREST)  │ └──────────────┘
//!                             └─────────────────────┘        │
//!                                                            ▼
//! ┌────────────────────────┐                     ┌───────────────────────┐
//! │ UserProfileRepository  │ ──────────────────► │    KeyValueStore      │
//! │  • roster + current    │   every mutation    │  SQLite / in-memory   │
//! └────────────────────────┘                     └───────────────────────┘
//! ```
//!
//! The listener only ever triggers the coordinator. The coordinator is the
//! sole caller of the remote source and the sole writer of the catalog
//! cache. The profile repository is independent of catalog sync.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use recipe_sync::{
//!     AppLifecycle, BroadcastChangeFeed, CatalogCache, ChangeNotificationListener,
//!     RecipeSyncConfig, RestCatalogSource, SyncCoordinator, UserProfileRepository,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RecipeSyncConfig {
//!         remote_url: Some("https://project.supabase.co".into()),
//!         api_key: Some("anon-key".into()),
//!         storage_url: Some("sqlite://./recipe_sync.db?mode=rwc".into()),
//!         ..Default::default()
//!     };
//!
//!     let store = recipe_sync::storage::open(&config).await.expect("storage");
//!     let profiles = UserProfileRepository::load(store.clone(), config.storage_keys.clone()).await;
//!     let cache = Arc::new(CatalogCache::load(store, config.storage_keys.catalog.clone()).await);
//!     let source = Arc::new(RestCatalogSource::from_config(&config).expect("remote config"));
//!     let coordinator = Arc::new(SyncCoordinator::new(source, cache));
//!
//!     let feed = BroadcastChangeFeed::new(config.change_feed_capacity);
//!     let lifecycle = AppLifecycle::new();
//!     let listener = ChangeNotificationListener::spawn(
//!         &feed, &lifecycle, config.catalog_table.clone(), coordinator.clone(),
//!     );
//!
//!     coordinator.start().await;
//!     if let Ok(catalog) = coordinator.current_catalog() {
//!         println!("{} recipes", catalog.len());
//!     }
//!     println!("{} local users", profiles.list_users().len());
//!
//!     listener.release().await;
//! }
//! ```
//!
//! ## Modules
//!
//! - [`coordinator`]: the [`SyncCoordinator`] state machine
//! - [`remote`]: [`RemoteCatalogSource`] and the REST implementation
//! - [`cache`]: last known-good [`CatalogSnapshot`]
//! - [`repository`]: [`UserProfileRepository`]
//! - [`notify`]: change feed, lifecycle signal and the listener
//! - [`storage`]: [`KeyValueStore`] backends (SQLite, memory)
//! - [`resilience`]: retry with backoff
//! - [`metrics`]: backend-agnostic instrumentation

pub mod config;
pub mod recipe;
pub mod profile;
pub mod storage;
pub mod repository;
pub mod cache;
pub mod remote;
pub mod notify;
pub mod coordinator;
pub mod resilience;
pub mod metrics;

pub use config::{RecipeSyncConfig, StorageKeys};
pub use recipe::{CatalogSnapshot, Difficulty, Freshness, Ingredient, Recipe};
pub use profile::{
    AvatarUpdate, FavoriteToggle, Language, NewUser, ProfileUpdate, Settings, SettingsPatch,
    ShoppingItem, ShoppingListReplace, UnitSystem, UserProfile,
};
pub use storage::{InMemoryStore, KeyValueStore, SqliteStore, StorageError};
pub use repository::{ProfileError, UserProfileRepository};
pub use cache::CatalogCache;
pub use remote::{RemoteCatalogSource, RemoteFetchError, RestCatalogSource};
pub use notify::{
    AppLifecycle, AppState, BroadcastChangeFeed, ChangeEvent, ChangeFeed, ChangeNotificationListener,
    ChangeOp, ListenerHandle, ResyncSink, SyncTrigger,
};
pub use coordinator::{CatalogError, SyncCoordinator, SyncOutcome, SyncState};
pub use resilience::retry::RetryConfig;

/// Current wall-clock time as epoch milliseconds.
pub(crate) fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
