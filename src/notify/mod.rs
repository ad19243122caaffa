// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Resync triggers.
//!
//! Two independent sources say "the catalog may have changed":
//! - a push [`ChangeFeed`] of table mutations ([`ChangeEvent`])
//! - the [`AppLifecycle`] signal, on a transition back to [`AppState::Active`]
//!
//! [`ChangeNotificationListener`] turns both into [`SyncTrigger`]s for a
//! [`ResyncSink`]. It never touches catalog data and does not coalesce;
//! collapsing overlapping triggers is the sink's job.

pub mod feed;
pub mod listener;

pub use feed::{AppLifecycle, BroadcastChangeFeed, ChangeFeed};
pub use listener::{ChangeNotificationListener, ListenerHandle, ResyncSink};

/// Table mutation kind as reported by the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

impl ChangeOp {
    /// Parse the feed's `INSERT` / `UPDATE` / `DELETE` tag (any case).
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "INSERT" => Some(Self::Insert),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// One mutation on a remote table. Carries no row payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: String,
    pub op: ChangeOp,
}

impl ChangeEvent {
    pub fn new(table: impl Into<String>, op: ChangeOp) -> Self {
        Self {
            table: table.into(),
            op,
        }
    }
}

/// Process lifecycle as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppState {
    #[default]
    Active,
    Inactive,
    Background,
}

/// Why a sync cycle was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Startup,
    CatalogChanged,
    ForegroundResumed,
    /// Follow-up cycle for triggers that arrived mid-sync
    Coalesced,
    Manual,
}

impl SyncTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::CatalogChanged => "catalog_changed",
            Self::ForegroundResumed => "foreground_resumed",
            Self::Coalesced => "coalesced",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_op_parse() {
        assert_eq!(ChangeOp::parse("INSERT"), Some(ChangeOp::Insert));
        assert_eq!(ChangeOp::parse("update"), Some(ChangeOp::Update));
        assert_eq!(ChangeOp::parse(" Delete "), Some(ChangeOp::Delete));
        assert_eq!(ChangeOp::parse("TRUNCATE"), None);
        assert_eq!(ChangeOp::Delete.as_str(), "DELETE");
    }

    #[test]
    fn test_trigger_labels() {
        assert_eq!(SyncTrigger::ForegroundResumed.to_string(), "foreground_resumed");
        assert_eq!(SyncTrigger::Coalesced.as_str(), "coalesced");
    }
}
