//! Topic registry for handling subscriptions and publishing events.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use postfeed_proto::{Event, Topic};

use super::subscription::{Subscription, SubscriptionId, SubscriptionInfo};
use crate::config::PubSubConfig;
use crate::error::Error;
use crate::metrics::{PubSubMetrics, SharedPubSubMetrics};

/// A registered delivery channel.
struct ChannelEntry<T> {
    topic: Topic,
    sender: mpsc::Sender<Event<T>>,
    created_at: Instant,
    delivered: u64,
    dropped: Arc<AtomicU64>,
}

/// Mutable registry state. Every read and write goes through one lock, so a
/// publish never observes a half-updated subscriber set.
struct RegistryState<T> {
    closed: bool,
    /// Active channels keyed by subscription ID.
    channels: HashMap<SubscriptionId, ChannelEntry<T>>,
    /// Index of subscription IDs by topic, iterated in ID order.
    topic_index: BTreeMap<Topic, BTreeSet<SubscriptionId>>,
}

impl<T> RegistryState<T> {
    fn new() -> Self {
        Self {
            closed: false,
            channels: HashMap::new(),
            topic_index: BTreeMap::new(),
        }
    }

    fn remove(&mut self, id: SubscriptionId) -> Option<ChannelEntry<T>> {
        let entry = self.channels.remove(&id)?;
        if let Some(ids) = self.topic_index.get_mut(&entry.topic) {
            ids.remove(&id);
            if ids.is_empty() {
                self.topic_index.remove(&entry.topic);
            }
        }
        Some(entry)
    }
}

impl<T: Clone> RegistryState<T> {
    /// Enqueue `event` into every channel on its topic. Never waits.
    fn deliver(&mut self, event: &Event<T>, metrics: &PubSubMetrics) -> usize {
        let RegistryState {
            channels,
            topic_index,
            ..
        } = self;

        let Some(ids) = topic_index.get(event.topic()) else {
            return 0;
        };

        let mut delivered = 0;
        for id in ids {
            let Some(entry) = channels.get_mut(id) else {
                continue;
            };
            match entry.sender.try_send(event.clone()) {
                Ok(()) => {
                    entry.delivered += 1;
                    delivered += 1;
                }
                Err(TrySendError::Full(_)) => {
                    entry.dropped.fetch_add(1, Ordering::Relaxed);
                    metrics.record_drop();
                    tracing::warn!(
                        subscription_id = id,
                        topic = %event.topic(),
                        kind = %event.kind(),
                        "subscriber buffer full, dropping newest event"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    // Consumer is mid-cancel; it unregisters itself next.
                }
            }
        }
        delivered
    }
}

/// Shared registry internals, also referenced weakly by each subscription.
pub(crate) struct RegistryInner<T> {
    state: Mutex<RegistryState<T>>,
    next_subscription_id: AtomicU64,
    config: PubSubConfig,
    metrics: SharedPubSubMetrics,
}

impl<T> RegistryInner<T> {
    /// Remove a subscription. Returns false if it was already gone.
    pub(crate) fn unsubscribe(&self, subscription_id: SubscriptionId) -> bool {
        let entry = self.state.lock().remove(subscription_id);

        match entry {
            Some(entry) => {
                self.metrics.record_unsubscribe(1);
                tracing::debug!(
                    subscription_id,
                    topic = %entry.topic,
                    events_delivered = entry.delivered,
                    events_dropped = entry.dropped.load(Ordering::Relaxed),
                    "subscription removed"
                );
                true
            }
            None => false,
        }
    }
}

/// Maps topics to the delivery channels listening on them.
///
/// The registry is a cheap cloneable handle; clones share the same state.
/// Each instance is independent, so tests can run isolated registries.
pub struct TopicRegistry<T> {
    inner: Arc<RegistryInner<T>>,
}

impl<T> Clone for TopicRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> TopicRegistry<T> {
    /// Create a registry with the default configuration.
    pub fn new() -> Self {
        Self::with_config(PubSubConfig::default())
    }

    /// Create a registry with the given configuration.
    pub fn with_config(config: PubSubConfig) -> Self {
        Self::with_metrics(config, Arc::new(PubSubMetrics::new()))
    }

    /// Create a registry that reports into an existing metrics handle.
    pub fn with_metrics(config: PubSubConfig, metrics: SharedPubSubMetrics) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                state: Mutex::new(RegistryState::new()),
                next_subscription_id: AtomicU64::new(1),
                config,
                metrics,
            }),
        }
    }

    /// Open a new delivery channel on `topic`.
    ///
    /// The channel only sees events published after this call returns.
    pub fn subscribe(&self, topic: Topic) -> Result<Subscription<T>, Error> {
        let (sender, receiver) = mpsc::channel(self.inner.config.channel_capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));

        let subscription_id = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(Error::RegistryClosed);
            }

            let subscription_id = self
                .inner
                .next_subscription_id
                .fetch_add(1, Ordering::SeqCst);

            state.channels.insert(
                subscription_id,
                ChannelEntry {
                    topic: topic.clone(),
                    sender,
                    created_at: Instant::now(),
                    delivered: 0,
                    dropped: Arc::clone(&dropped),
                },
            );
            state
                .topic_index
                .entry(topic.clone())
                .or_default()
                .insert(subscription_id);

            subscription_id
        };

        self.inner.metrics.record_subscribe();
        tracing::debug!(subscription_id, topic = %topic, "subscription created");

        Ok(Subscription::new(
            subscription_id,
            topic,
            receiver,
            Arc::downgrade(&self.inner),
            dropped,
        ))
    }

    /// Publish an event to every channel on the event's topic.
    ///
    /// Returns the number of channels that accepted the event. Having no
    /// subscribers is not an error. A full channel drops this event and the
    /// publisher carries on.
    pub fn publish(&self, event: Event<T>) -> Result<usize, Error> {
        let delivered = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(Error::RegistryClosed);
            }
            state.deliver(&event, &self.inner.metrics)
        };

        self.inner.metrics.record_publish(delivered as u64);
        tracing::trace!(
            topic = %event.topic(),
            kind = %event.kind(),
            delivered,
            "published event"
        );

        Ok(delivered)
    }

    /// Publish several events under one critical section.
    ///
    /// Either every event is offered to its topic's channels or, if the
    /// registry is closed, none is. Returns total deliveries.
    pub fn publish_batch(&self, events: &[Event<T>]) -> Result<usize, Error> {
        let per_event: Vec<usize> = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(Error::RegistryClosed);
            }
            events
                .iter()
                .map(|event| state.deliver(event, &self.inner.metrics))
                .collect()
        };

        for (event, delivered) in events.iter().zip(&per_event) {
            self.inner.metrics.record_publish(*delivered as u64);
            tracing::trace!(
                topic = %event.topic(),
                kind = %event.kind(),
                delivered,
                "published event"
            );
        }

        Ok(per_event.iter().sum())
    }

    /// Remove a subscription from the registry. Idempotent.
    ///
    /// Returns whether a subscription was removed by this call.
    pub fn unsubscribe(&self, subscription_id: SubscriptionId) -> bool {
        self.inner.unsubscribe(subscription_id)
    }

    /// Close the registry.
    ///
    /// Every channel is dropped, so consumers finish the events already
    /// buffered and then end. Later `subscribe`/`publish` calls fail with
    /// [`Error::RegistryClosed`].
    pub fn shutdown(&self) {
        let closed = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.topic_index.clear();
            let count = state.channels.len();
            state.channels.clear();
            count
        };

        self.inner.metrics.record_unsubscribe(closed as u64);
        tracing::info!(subscriptions_closed = closed, "topic registry shut down");
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Get the number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.inner.state.lock().channels.len()
    }

    /// Get subscription IDs registered on a topic, in ascending order.
    pub fn subscribers_for(&self, topic: &Topic) -> Vec<SubscriptionId> {
        let state = self.inner.state.lock();
        state
            .topic_index
            .get(topic)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Get all topics with at least one subscriber.
    pub fn topics(&self) -> Vec<Topic> {
        self.inner.state.lock().topic_index.keys().cloned().collect()
    }

    /// Get a snapshot of a subscription's bookkeeping.
    pub fn subscription_info(&self, subscription_id: SubscriptionId) -> Option<SubscriptionInfo> {
        let state = self.inner.state.lock();
        state
            .channels
            .get(&subscription_id)
            .map(|entry| SubscriptionInfo {
                id: subscription_id,
                topic: entry.topic.clone(),
                created_at: entry.created_at,
                events_delivered: entry.delivered,
                events_dropped: entry.dropped.load(Ordering::Relaxed),
            })
    }

    /// Get the metrics handle.
    pub fn metrics(&self) -> &SharedPubSubMetrics {
        &self.inner.metrics
    }

    /// Get the configuration.
    pub fn config(&self) -> &PubSubConfig {
        &self.inner.config
    }
}

impl<T: Clone + Send + 'static> Default for TopicRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
