//! Pub/sub configuration.

/// Default number of pending events buffered per subscription.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Configuration for a [`TopicRegistry`](crate::pubsub::TopicRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubSubConfig {
    /// Pending events buffered per subscription before new events are dropped.
    /// Zero is treated as one.
    pub channel_capacity: usize,
}

impl PubSubConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Set the per-subscription buffer size. Clamped to at least one.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}

impl Default for PubSubConfig {
    fn default() -> Self {
        Self::new()
    }
}
