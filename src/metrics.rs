// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for recipe-sync.
//!
//! Uses the `metrics` crate for backend-agnostic collection. The host app
//! chooses the exporter (or none, in which case every call is a no-op).
//!
//! # Metric Naming Convention
//! - `recipe_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `trigger`: startup, catalog_changed, foreground_resumed, coalesced, manual
//! - `outcome`: refreshed, served_stale, no_cache, coalesced
//! - `operation`: read, write, decode

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

// ═══════════════════════════════════════════════════════════════════════════
// SYNC CYCLES
// ═══════════════════════════════════════════════════════════════════════════

/// Record a completed (or coalesced) sync request
pub fn record_sync(trigger: &str, outcome: &str) {
    counter!(
        "recipe_sync_cycles_total",
        "trigger" => trigger.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record remote fetch latency
pub fn record_fetch_latency(success: bool, duration: Duration) {
    let status = if success { "success" } else { "failure" };
    histogram!(
        "recipe_sync_fetch_seconds",
        "status" => status
    )
    .record(duration.as_secs_f64());
}

/// Record a remote fetch failure by kind (transport, status, decode)
pub fn record_fetch_error(kind: &str) {
    counter!(
        "recipe_sync_fetch_errors_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Set number of recipes currently published
pub fn set_catalog_size(count: usize) {
    gauge!("recipe_sync_catalog_recipes").set(count as f64);
}

/// Track state machine transitions
pub fn record_state_transition(state: &str) {
    counter!(
        "recipe_sync_state_transitions_total",
        "state" => state.to_string()
    )
    .increment(1);
}

// ═══════════════════════════════════════════════════════════════════════════
// LOCAL STORAGE
// ═══════════════════════════════════════════════════════════════════════════

/// Record a storage failure (soft: state stays correct in memory)
pub fn record_storage_error(operation: &str) {
    counter!(
        "recipe_sync_storage_errors_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record a profile mutation by update kind
pub fn record_profile_mutation(kind: &str, persisted: bool) {
    let status = if persisted { "persisted" } else { "memory_only" };
    counter!(
        "recipe_sync_profile_mutations_total",
        "kind" => kind.to_string(),
        "status" => status
    )
    .increment(1);
}

// ═══════════════════════════════════════════════════════════════════════════
// NOTIFICATIONS
// ═══════════════════════════════════════════════════════════════════════════

/// Record a resync trigger emitted by the notification listener
pub fn record_trigger(source: &str) {
    counter!(
        "recipe_sync_triggers_total",
        "source" => source.to_string()
    )
    .increment(1);
}

/// Live listener subscriptions; held for as long as the listener task runs.
pub struct SubscriptionGauge;

impl SubscriptionGauge {
    pub fn acquire() -> Self {
        gauge!("recipe_sync_feed_subscribers").increment(1.0);
        Self
    }
}

impl Drop for SubscriptionGauge {
    fn drop(&mut self) {
        gauge!("recipe_sync_feed_subscribers").decrement(1.0);
    }
}

/// Timer guard that records fetch latency on drop.
pub struct FetchTimer {
    start: Instant,
    success: bool,
}

impl FetchTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            success: false,
        }
    }

    /// Mark the fetch as successful before the guard drops.
    pub fn succeed(&mut self) {
        self.success = true;
    }
}

impl Drop for FetchTimer {
    fn drop(&mut self) {
        record_fetch_latency(self.success, self.start.elapsed());
    }
}
