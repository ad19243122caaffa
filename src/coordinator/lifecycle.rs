//! Sync cycle: single-flight entry point, fetch, write-through and fallback.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::metrics::FetchTimer;
use crate::notify::{ResyncSink, SyncTrigger};
use crate::recipe::{CatalogSnapshot, Freshness};

use super::{SyncCoordinator, SyncOutcome, SyncState};

/// Single-flight bookkeeping. Both fields change under one lock so a
/// trigger is either seen by the running cycle or starts its own.
#[derive(Debug, Default)]
pub(super) struct Flight {
    pub(super) running: bool,
    pub(super) pending: bool,
}

/// Ownership of the running cycle.
///
/// Released by [`rearm`](Self::rearm) when no follow-up is wanted, or on
/// drop when the owning future is abandoned mid-fetch.
pub(super) struct InFlightGuard<'a> {
    flight: &'a Mutex<Flight>,
    released: bool,
}

impl<'a> InFlightGuard<'a> {
    /// Claim the cycle, or mark a follow-up as wanted if one is running.
    fn acquire(flight: &'a Mutex<Flight>) -> Option<Self> {
        let mut state = flight.lock();
        if state.running {
            state.pending = true;
            return None;
        }
        state.running = true;
        Some(Self { flight, released: false })
    }

    /// Keep ownership for one more cycle if a trigger arrived, else release.
    fn rearm(&mut self) -> bool {
        let mut state = self.flight.lock();
        if state.pending {
            state.pending = false;
            return true;
        }
        state.running = false;
        self.released = true;
        false
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            let mut state = self.flight.lock();
            state.running = false;
            state.pending = false;
        }
    }
}

impl SyncCoordinator {
    /// Run the startup sync (`Idle → Syncing → Ready`).
    pub async fn start(&self) -> SyncOutcome {
        info!("Starting catalog sync");
        self.sync(SyncTrigger::Startup).await
    }

    /// Request a sync cycle.
    ///
    /// If none is running, runs one now and returns its outcome. If one is
    /// already in flight, records that another is wanted and returns
    /// [`SyncOutcome::Coalesced`] at once; the running caller then performs
    /// exactly one follow-up cycle however many triggers arrived meanwhile.
    #[tracing::instrument(skip(self), fields(trigger = %trigger))]
    pub async fn sync(&self, trigger: SyncTrigger) -> SyncOutcome {
        let Some(mut guard) = InFlightGuard::acquire(&self.flight) else {
            debug!("Sync already in flight, trigger coalesced");
            crate::metrics::record_sync(trigger.as_str(), SyncOutcome::Coalesced.as_str());
            return SyncOutcome::Coalesced;
        };

        let mut trigger = trigger;
        loop {
            let outcome = self.run_cycle(trigger).await;
            crate::metrics::record_sync(trigger.as_str(), outcome.as_str());

            if !guard.rearm() {
                return outcome;
            }
            trigger = SyncTrigger::Coalesced;
        }
    }

    /// One fetch + write-through/fallback. Caller holds the [`InFlightGuard`].
    async fn run_cycle(&self, trigger: SyncTrigger) -> SyncOutcome {
        self.set_state(SyncState::Syncing);

        let mut timer = FetchTimer::start();
        let result = self.source.fetch_all().await;
        if result.is_ok() {
            timer.succeed();
        }
        drop(timer);

        match result {
            Ok(snapshot) => {
                let snapshot = if snapshot.is_fresh() {
                    snapshot
                } else {
                    CatalogSnapshot::fresh(snapshot.into_recipes())
                };
                let recipes = snapshot.len();

                if let Err(e) = self.cache.write(&snapshot).await {
                    warn!(error = %e, "Catalog fetched but not cached; serving it for this session");
                }

                self.publish(Arc::new(snapshot));
                *self.last_error.write() = None;
                self.cold_failure.store(false, Ordering::Release);
                self.set_state(SyncState::Ready(Freshness::Fresh));

                info!(recipes, trigger = %trigger, "Catalog refreshed");
                SyncOutcome::Refreshed { recipes }
            }
            Err(e) => {
                crate::metrics::record_fetch_error(e.kind());
                *self.last_error.write() = Some(e.clone());

                let current = self.catalog.borrow().clone().or_else(|| self.cache.read());
                let outcome = match current {
                    Some(current) => {
                        warn!(error = %e, recipes = current.len(), "Catalog fetch failed, serving last known data");
                        if current.is_fresh() {
                            self.publish(Arc::new(current.as_stale()));
                        } else if self.catalog.borrow().is_none() {
                            self.publish(current);
                        }
                        SyncOutcome::ServedStale
                    }
                    None => {
                        error!(error = %e, "Catalog fetch failed and nothing is cached");
                        self.cold_failure.store(true, Ordering::Release);
                        SyncOutcome::NoCache
                    }
                };

                self.set_state(SyncState::Ready(Freshness::Stale));
                outcome
            }
        }
    }
}

#[async_trait]
impl ResyncSink for SyncCoordinator {
    async fn resync(&self, trigger: SyncTrigger) {
        self.sync(trigger).await;
    }
}
