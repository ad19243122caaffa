//! In-process fan-out for change events and lifecycle state.
//!
//! The host bridges its realtime transport into [`BroadcastChangeFeed::publish`]
//! and its platform lifecycle callbacks into [`AppLifecycle::set`].

use tokio::sync::{broadcast, watch};
use tracing::trace;

use super::{AppState, ChangeEvent};

/// A subscribable stream of table mutations.
pub trait ChangeFeed: Send + Sync {
    /// New subscription; dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;

    /// Live subscriptions. A count that grows across remounts is a leak.
    fn subscriber_count(&self) -> usize;
}

#[derive(Clone)]
pub struct BroadcastChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl BroadcastChangeFeed {
    /// `capacity` is how many events a slow subscriber may fall behind
    /// before it observes a lag.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Deliver `event` to every subscriber. Returns how many received it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let delivered = self.tx.send(event).unwrap_or(0);
        trace!(delivered, "Change event published");
        delivered
    }
}

impl ChangeFeed for BroadcastChangeFeed {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Current process lifecycle state, starting [`AppState::Active`].
#[derive(Clone)]
pub struct AppLifecycle {
    tx: watch::Sender<AppState>,
}

impl AppLifecycle {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(AppState::Active);
        Self { tx }
    }

    /// Report a lifecycle change. Repeating the current state is a no-op.
    pub fn set(&self, state: AppState) {
        self.tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }

    #[must_use]
    pub fn current(&self) -> AppState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for AppLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ChangeOp;

    #[tokio::test]
    async fn test_publish_fans_out() {
        let feed = BroadcastChangeFeed::new(8);
        assert_eq!(feed.publish(ChangeEvent::new("recipes", ChangeOp::Insert)), 0);

        let mut a = feed.subscribe();
        let mut b = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 2);
        assert_eq!(feed.publish(ChangeEvent::new("recipes", ChangeOp::Update)), 2);

        assert_eq!(a.recv().await.unwrap().op, ChangeOp::Update);
        assert_eq!(b.recv().await.unwrap().table, "recipes");

        drop(a);
        assert_eq!(feed.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_lifecycle_ignores_repeats() {
        let lifecycle = AppLifecycle::new();
        let mut rx = lifecycle.subscribe();

        lifecycle.set(AppState::Active);
        assert!(!rx.has_changed().unwrap());

        lifecycle.set(AppState::Background);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), AppState::Background);
        assert_eq!(lifecycle.current(), AppState::Background);
    }
}
