//! Live progress fan-out.
//!
//! [`ProgressBroadcaster`] is a best-effort broadcast of human-readable lines to
//! whoever is listening right now. It is not a queue: nothing is buffered for
//! late subscribers and nothing is retried.
//!
//! Every subscriber owns a bounded mailbox. Publishing uses `try_send`, so a
//! publisher never waits on a listener; a subscriber whose mailbox is full (or
//! whose receiving side is gone) is dropped from the registry on the spot.
//!
//! The registry is the only owner of each mailbox's sender. Removing an entry
//! drops the sender, which ends the subscriber's stream. Removal can only
//! succeed once, so a client disconnect racing a backpressure drop or a
//! shutdown closes the stream exactly once.

use std::{
    collections::HashMap,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    task::{Context, Poll},
};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Identifies one registration with a [`ProgressBroadcaster`].
pub type SubscriberId = u64;

#[derive(Default)]
struct Registry {
    subscribers: HashMap<SubscriberId, mpsc::Sender<String>>,
}

struct Shared {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
    capacity: usize,
}

/// Cheaply cloneable handle to a subscriber registry.
///
/// Clones share the same registry; independent instances are fully isolated.
#[derive(Clone)]
pub struct ProgressBroadcaster {
    shared: Arc<Shared>,
}

impl ProgressBroadcaster {
    /// Creates a broadcaster whose subscribers get `capacity` buffered lines.
    ///
    /// A capacity of zero is raised to one: the smallest mailbox that can hold
    /// a line until the listener polls for it.
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry::default()),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Registers a new listener.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.shared.capacity);
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        self.shared.registry.lock().subscribers.insert(id, tx);
        tracing::debug!("Progress subscriber {id} registered");

        Subscription {
            id,
            rx,
            broadcaster: self.clone(),
        }
    }

    /// Deregisters a listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.shared.registry.lock().subscribers.remove(&id);
        if removed.is_some() {
            tracing::debug!("Progress subscriber {id} unregistered");
        }
        removed.is_some()
    }

    /// Delivers `message` to every registered listener that has room for it.
    ///
    /// Listeners that are full or disconnected are dropped. With no listeners
    /// the message is discarded.
    pub fn publish(&self, message: impl Into<String>) {
        let message = message.into();
        let mut registry = self.shared.registry.lock();
        if registry.subscribers.is_empty() {
            return;
        }

        registry.subscribers.retain(|id, tx| match tx.try_send(message.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::debug!("Dropping slow progress subscriber {id}");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }

    /// Closes every subscription, e.g. on process shutdown.
    pub fn close_all(&self) {
        let drained = std::mem::take(&mut self.shared.registry.lock().subscribers);
        if !drained.is_empty() {
            tracing::info!("Closing {} progress subscribers", drained.len());
        }
    }

    /// Number of subscriptions currently registered.
    pub fn subscriber_count(&self) -> usize {
        self.shared.registry.lock().subscribers.len()
    }
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new(16)
    }
}

/// A live registration. Yields progress lines until it is unsubscribed,
/// dropped for backpressure, or the broadcaster shuts down.
///
/// Dropping the subscription unregisters it.
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<String>,
    broadcaster: ProgressBroadcaster,
}

impl Subscription {
    /// Registry key, as accepted by [`ProgressBroadcaster::unsubscribe`].
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Receives the next line, or `None` once the subscription is closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

impl Stream for Subscription {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.broadcaster.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;

    use super::*;

    #[test]
    fn publish_without_subscribers_is_discarded() {
        let progress = ProgressBroadcaster::new(4);
        progress.publish("nobody hears this");

        let mut sub = progress.subscribe();
        assert!(sub.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn every_subscriber_receives_the_message() {
        let progress = ProgressBroadcaster::new(4);
        let mut a = progress.subscribe();
        let mut b = progress.subscribe();

        progress.publish("user #1 started");

        assert_eq!(a.recv().await.as_deref(), Some("user #1 started"));
        assert_eq!(b.next().await.as_deref(), Some("user #1 started"));
    }

    #[tokio::test]
    async fn full_mailbox_drops_the_subscriber() {
        let progress = ProgressBroadcaster::new(1);
        let mut slow = progress.subscribe();
        let mut fast = progress.subscribe();

        progress.publish("one");
        assert_eq!(fast.recv().await.as_deref(), Some("one"));
        progress.publish("two");

        assert_eq!(progress.subscriber_count(), 1);
        assert_eq!(slow.recv().await.as_deref(), Some("one"));
        assert_eq!(slow.recv().await, None);
        assert_eq!(fast.recv().await.as_deref(), Some("two"));
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let progress = ProgressBroadcaster::new(4);
        let sub = progress.subscribe();
        let id = sub.id();

        assert!(progress.unsubscribe(id));
        assert!(!progress.unsubscribe(id));
        drop(sub);
        assert_eq!(progress.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn unsubscribe_ends_the_stream() {
        let progress = ProgressBroadcaster::new(4);
        let mut sub = progress.subscribe();

        progress.unsubscribe(sub.id());
        assert_eq!(sub.next().await, None);
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let progress = ProgressBroadcaster::new(4);
        let sub = progress.subscribe();
        let _other = progress.subscribe();
        assert_eq!(progress.subscriber_count(), 2);

        drop(sub);
        assert_eq!(progress.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn close_all_ends_every_stream() {
        let progress = ProgressBroadcaster::new(4);
        let mut a = progress.subscribe();
        let mut b = progress.subscribe();

        progress.close_all();

        assert_eq!(progress.subscriber_count(), 0);
        assert_eq!(a.recv().await, None);
        assert_eq!(b.recv().await, None);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let progress = ProgressBroadcaster::new(0);
        let mut sub = progress.subscribe();

        progress.publish("first");
        assert_eq!(sub.rx.try_recv().ok().as_deref(), Some("first"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_publishers_never_block_on_idle_subscriber() {
        let progress = ProgressBroadcaster::new(2);
        let _idle = progress.subscribe();

        let publishers: Vec<_> = (0..8)
            .map(|i| {
                let progress = progress.clone();
                tokio::spawn(async move {
                    for j in 0..100 {
                        progress.publish(format!("{i}:{j}"));
                    }
                })
            })
            .collect();

        let all = futures::future::join_all(publishers);
        let joined = tokio::time::timeout(Duration::from_secs(5), all)
            .await
            .expect("publishers blocked");
        assert!(joined.into_iter().all(|r| r.is_ok()));
        assert_eq!(progress.subscriber_count(), 0);
    }
}
