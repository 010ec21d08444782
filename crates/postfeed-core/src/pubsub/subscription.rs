//! Delivery channels handed to subscribers.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::Stream;
use tokio::sync::mpsc;

use postfeed_proto::{Event, Topic};

use super::registry::RegistryInner;

/// Unique subscription identifier within one registry.
pub type SubscriptionId = u64;

/// A single subscriber's ordered, cancellable event stream.
///
/// Events arrive in publish order. Reading suspends while the buffer is
/// empty. The sequence ends after [`cancel`](Self::cancel), or once the
/// registry shuts down and buffered events are drained. It cannot be
/// reopened; subscribe again instead.
///
/// Dropping a subscription cancels it.
pub struct Subscription<T> {
    id: SubscriptionId,
    topic: Topic,
    receiver: mpsc::Receiver<Event<T>>,
    registry: Weak<RegistryInner<T>>,
    dropped: Arc<AtomicU64>,
    cancelled: bool,
}

impl<T> Subscription<T> {
    pub(crate) fn new(
        id: SubscriptionId,
        topic: Topic,
        receiver: mpsc::Receiver<Event<T>>,
        registry: Weak<RegistryInner<T>>,
        dropped: Arc<AtomicU64>,
    ) -> Self {
        Self {
            id,
            topic,
            receiver,
            registry,
            dropped,
            cancelled: false,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Events discarded for this subscription because its buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Wait for the next event. `None` means the sequence has ended.
    pub async fn recv(&mut self) -> Option<Event<T>> {
        if self.cancelled {
            return None;
        }
        self.receiver.recv().await
    }

    /// Take the next event if one is already buffered.
    pub fn try_recv(&mut self) -> Option<Event<T>> {
        if self.cancelled {
            return None;
        }
        self.receiver.try_recv().ok()
    }

    /// Stop the subscription.
    ///
    /// Pending events are discarded, the sequence ends, and the channel is
    /// removed from its registry. Calling it again has no effect.
    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}

        if let Some(registry) = self.registry.upgrade() {
            registry.unsubscribe(self.id);
        }
    }
}

impl<T> Stream for Subscription<T> {
    type Item = Event<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.cancelled {
            return Poll::Ready(None);
        }
        this.receiver.poll_recv(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("cancelled", &self.cancelled)
            .finish()
    }
}

/// Point-in-time view of a registered subscription.
#[derive(Debug, Clone)]
pub struct SubscriptionInfo {
    pub id: SubscriptionId,
    pub topic: Topic,
    /// When the subscription was created.
    pub created_at: Instant,
    /// Events enqueued into the channel so far.
    pub events_delivered: u64,
    /// Events dropped on a full buffer.
    pub events_dropped: u64,
}

impl SubscriptionInfo {
    /// Get the age of this subscription.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}
