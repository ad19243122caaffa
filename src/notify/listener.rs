// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Change notification listener.
//!
//! A scoped subscription: [`ChangeNotificationListener::spawn`] acquires one
//! feed receiver and one lifecycle observer, and the returned
//! [`ListenerHandle`] gives both back on [`ListenerHandle::release`] or when
//! dropped. Mount/unmount cycles therefore never accumulate subscriptions.
//!
//! Each trigger is handed to the sink on its own task so a slow sync never
//! backs up the feed; overlapping triggers are collapsed by the sink.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{AppLifecycle, AppState, ChangeFeed, SyncTrigger};

/// Receiver of "catalog may have changed, resync" signals.
#[async_trait]
pub trait ResyncSink: Send + Sync + 'static {
    async fn resync(&self, trigger: SyncTrigger);
}

pub struct ChangeNotificationListener;

impl ChangeNotificationListener {
    /// Subscribe to `feed` (events for `table` only) and to `lifecycle`,
    /// forwarding triggers to `sink` until the handle is released.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        feed: &dyn ChangeFeed,
        lifecycle: &AppLifecycle,
        table: impl Into<String>,
        sink: Arc<dyn ResyncSink>,
    ) -> ListenerHandle {
        let table = table.into();
        let mut events = feed.subscribe();
        let mut app = lifecycle.subscribe();
        let mut last_state = *app.borrow_and_update();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let gauge = crate::metrics::SubscriptionGauge::acquire();
        info!(table = %table, subscribers = feed.subscriber_count(), "Change listener subscribed");

        let task = tokio::spawn(async move {
            let _gauge = gauge;
            let mut feed_open = true;
            let mut lifecycle_open = true;

            while feed_open || lifecycle_open {
                tokio::select! {
                    _ = &mut shutdown_rx => break,

                    event = events.recv(), if feed_open => match event {
                        Ok(event) if event.table == table => {
                            debug!(op = event.op.as_str(), "Catalog change received");
                            fire(&sink, SyncTrigger::CatalogChanged);
                        }
                        Ok(event) => {
                            debug!(table = %event.table, "Change on unrelated table ignored");
                        }
                        Err(RecvError::Lagged(missed)) => {
                            warn!(missed, "Change feed lagged, resyncing");
                            fire(&sink, SyncTrigger::CatalogChanged);
                        }
                        Err(RecvError::Closed) => {
                            debug!("Change feed closed");
                            feed_open = false;
                        }
                    },

                    changed = app.changed(), if lifecycle_open => match changed {
                        Ok(()) => {
                            let state = *app.borrow_and_update();
                            if state == AppState::Active && last_state != AppState::Active {
                                debug!(from = ?last_state, "App returned to foreground");
                                fire(&sink, SyncTrigger::ForegroundResumed);
                            }
                            last_state = state;
                        }
                        Err(_) => {
                            debug!("Lifecycle source closed");
                            lifecycle_open = false;
                        }
                    },
                }
            }

            debug!("Change listener stopped");
        });

        ListenerHandle {
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

fn fire(sink: &Arc<dyn ResyncSink>, trigger: SyncTrigger) {
    crate::metrics::record_trigger(trigger.as_str());
    let sink = Arc::clone(sink);
    tokio::spawn(async move {
        sink.resync(trigger).await;
    });
}

/// Owner of a live listener subscription.
///
/// Dropping the handle aborts the listener task, which drops both
/// subscriptions; [`release`](Self::release) does the same and waits for it.
pub struct ListenerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    /// Unsubscribe and wait until the listener task has exited.
    pub async fn release(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Change listener task failed");
                }
            }
        }
        info!("Change listener released");
    }

    /// False once the listener has stopped for any reason.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{BroadcastChangeFeed, ChangeEvent, ChangeOp};
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingSink {
        triggers: Mutex<Vec<SyncTrigger>>,
    }

    #[async_trait]
    impl ResyncSink for RecordingSink {
        async fn resync(&self, trigger: SyncTrigger) {
            self.triggers.lock().push(trigger);
        }
    }

    impl RecordingSink {
        async fn wait_for(&self, count: usize) -> Vec<SyncTrigger> {
            for _ in 0..200 {
                if self.triggers.lock().len() >= count {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            self.triggers.lock().clone()
        }
    }

    fn setup() -> (BroadcastChangeFeed, AppLifecycle, Arc<RecordingSink>) {
        (BroadcastChangeFeed::new(16), AppLifecycle::new(), Arc::new(RecordingSink::default()))
    }

    #[tokio::test]
    async fn test_catalog_events_fire_and_others_are_ignored() {
        let (feed, lifecycle, sink) = setup();
        let handle = ChangeNotificationListener::spawn(&feed, &lifecycle, "recipes", sink.clone());

        feed.publish(ChangeEvent::new("profiles", ChangeOp::Insert));
        feed.publish(ChangeEvent::new("recipes", ChangeOp::Delete));

        let seen = sink.wait_for(1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(seen, vec![SyncTrigger::CatalogChanged]);
        assert_eq!(sink.triggers.lock().len(), 1);

        handle.release().await;
    }

    #[tokio::test]
    async fn test_only_resume_to_active_fires() {
        let (feed, lifecycle, sink) = setup();
        let handle = ChangeNotificationListener::spawn(&feed, &lifecycle, "recipes", sink.clone());

        lifecycle.set(AppState::Inactive);
        tokio::time::sleep(Duration::from_millis(10)).await;
        lifecycle.set(AppState::Background);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(sink.triggers.lock().is_empty());

        lifecycle.set(AppState::Active);
        let seen = sink.wait_for(1).await;
        assert_eq!(seen, vec![SyncTrigger::ForegroundResumed]);

        handle.release().await;
    }

    #[tokio::test]
    async fn test_release_unsubscribes() {
        let (feed, lifecycle, sink) = setup();
        let handle = ChangeNotificationListener::spawn(&feed, &lifecycle, "recipes", sink.clone());
        assert_eq!(feed.subscriber_count(), 1);
        assert_eq!(lifecycle.observer_count(), 1);
        assert!(handle.is_active());

        handle.release().await;
        assert_eq!(feed.subscriber_count(), 0);
        assert_eq!(lifecycle.observer_count(), 0);

        feed.publish(ChangeEvent::new("recipes", ChangeOp::Update));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(sink.triggers.lock().is_empty());
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let (feed, lifecycle, sink) = setup();
        for _ in 0..3 {
            let _handle = ChangeNotificationListener::spawn(&feed, &lifecycle, "recipes", sink.clone());
        }

        for _ in 0..200 {
            if feed.subscriber_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_lagged_feed_counts_as_change() {
        let feed = BroadcastChangeFeed::new(1);
        let lifecycle = AppLifecycle::new();
        let sink = Arc::new(RecordingSink::default());

        // current_thread runtime: the listener cannot run until we yield
        let handle = ChangeNotificationListener::spawn(&feed, &lifecycle, "recipes", sink.clone());
        for _ in 0..3 {
            feed.publish(ChangeEvent::new("recipes", ChangeOp::Insert));
        }

        let seen = sink.wait_for(2).await;
        assert!(seen.len() >= 2);
        assert!(seen.iter().all(|t| *t == SyncTrigger::CatalogChanged));

        handle.release().await;
    }
}
