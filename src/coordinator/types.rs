//! Public types for the sync coordinator.

use thiserror::Error;

use crate::recipe::Freshness;

/// Coordinator state.
///
/// ```text
/// Idle → Syncing → Ready(fresh | stale) → Syncing → ...
/// ```
///
/// There is no terminal state. Use [`super::SyncCoordinator::state()`] to
/// read it or [`super::SyncCoordinator::subscribe_state()`] to watch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Constructed, no fetch attempted yet
    Idle,
    /// A fetch is in flight
    Syncing,
    /// Settled; `Fresh` after a successful fetch, `Stale` after a failed one
    Ready(Freshness),
}

impl SyncState {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Syncing => write!(f, "Syncing"),
            Self::Ready(freshness) => write!(f, "Ready({})", freshness),
        }
    }
}

/// What a call to [`super::SyncCoordinator::sync`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Fetched, cached and published
    Refreshed { recipes: usize },
    /// Fetch failed; the last known snapshot is still being served
    ServedStale,
    /// Fetch failed and there is nothing to serve
    NoCache,
    /// A sync was already in flight; a follow-up cycle was scheduled
    Coalesced,
}

impl SyncOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Refreshed { .. } => "refreshed",
            Self::ServedStale => "served_stale",
            Self::NoCache => "no_cache",
            Self::Coalesced => "coalesced",
        }
    }
}

/// Why [`super::SyncCoordinator::current_catalog`] has nothing to return.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogError {
    /// Never synced on this device and the latest fetch failed.
    /// The UI should show a "connection required" state.
    #[error("No catalog available: connection required")]
    NoCacheAvailable,

    /// Never synced on this device and the first fetch has not finished
    #[error("Catalog not loaded yet")]
    Pending,
}
