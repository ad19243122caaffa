//! Configuration for the recipe sync layer.
//!
//! # Example
//!
//! ```
//! use recipe_sync::RecipeSyncConfig;
//!
//! // Minimal config (uses defaults, in-memory storage)
//! let config = RecipeSyncConfig::default();
//! assert_eq!(config.catalog_table, "recipes");
//! assert!(config.storage_url.is_none());
//!
//! // Device config
//! let config = RecipeSyncConfig {
//!     remote_url: Some("https://project.supabase.co".into()),
//!     api_key: Some("anon-key".into()),
//!     storage_url: Some("sqlite://./recipe_sync.db?mode=rwc".into()),
//!     ..Default::default()
//! };
//! assert_eq!(config.request_timeout().as_secs(), 15);
//! ```

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the recipe sync layer.
///
/// All fields have sensible defaults. A device build needs at least
/// `remote_url` and `api_key`; without `storage_url` nothing survives a restart.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeSyncConfig {
    /// Base URL of the hosted data service (e.g., "https://project.supabase.co")
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Anonymous API key sent as `apikey` and bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Remote table holding the catalog (default: "recipes")
    #[serde(default = "default_catalog_table")]
    pub catalog_table: String,

    /// Full-catalog fetch timeout in milliseconds (default: 15s)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Local SQLite URL (e.g., "sqlite://./recipe_sync.db?mode=rwc").
    /// `None` keeps everything in memory.
    #[serde(default)]
    pub storage_url: Option<String>,

    /// Keys of the three persisted documents
    #[serde(default)]
    pub storage_keys: StorageKeys,

    /// Buffered change events per feed subscriber before it lags
    #[serde(default = "default_change_feed_capacity")]
    pub change_feed_capacity: usize,
}

/// Keys of the independently-serialized local documents.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StorageKeys {
    /// Roster of known local users
    #[serde(default = "default_users_key")]
    pub users: String,
    /// Current-user pointer
    #[serde(default = "default_current_user_key")]
    pub current_user: String,
    /// Last known-good catalog snapshot
    #[serde(default = "default_catalog_key")]
    pub catalog: String,
}

fn default_catalog_table() -> String { "recipes".to_string() }
fn default_request_timeout_ms() -> u64 { 15_000 }
fn default_change_feed_capacity() -> usize { 64 }
fn default_users_key() -> String { "users".to_string() }
fn default_current_user_key() -> String { "current_user".to_string() }
fn default_catalog_key() -> String { "catalog_snapshot".to_string() }

impl RecipeSyncConfig {
    /// Fetch timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            users: default_users_key(),
            current_user: default_current_user_key(),
            catalog: default_catalog_key(),
        }
    }
}

impl Default for RecipeSyncConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            api_key: None,
            catalog_table: default_catalog_table(),
            request_timeout_ms: default_request_timeout_ms(),
            storage_url: None,
            storage_keys: StorageKeys::default(),
            change_feed_capacity: default_change_feed_capacity(),
        }
    }
}
