//! Pub/sub counters.
//!
//! Collects delivery statistics for the registry and dispatcher and exports
//! them in Prometheus text format.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Counters for publish/subscribe activity.
pub struct PubSubMetrics {
    started_at: Instant,

    // Publish metrics
    events_published: AtomicU64,
    deliveries: AtomicU64,
    events_dropped: AtomicU64,

    // Dispatch metrics
    notifications: AtomicU64,
    notifications_suppressed: AtomicU64,

    // Subscription metrics
    subscriptions_opened: AtomicU64,
    subscriptions_closed: AtomicU64,
}

impl PubSubMetrics {
    /// Create a zeroed set of counters.
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            events_published: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            notifications: AtomicU64::new(0),
            notifications_suppressed: AtomicU64::new(0),
            subscriptions_opened: AtomicU64::new(0),
            subscriptions_closed: AtomicU64::new(0),
        }
    }

    /// Record one published event and how many channels accepted it.
    pub fn record_publish(&self, delivered: u64) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered, Ordering::Relaxed);
    }

    /// Record an event discarded because a channel buffer was full.
    pub fn record_drop(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dispatcher notification that produced an event.
    pub fn record_notification(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dispatcher notification that produced no event.
    pub fn record_suppressed(&self) {
        self.notifications_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_subscribe(&self) {
        self.subscriptions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unsubscribe(&self, count: u64) {
        self.subscriptions_closed.fetch_add(count, Ordering::Relaxed);
    }

    // Getters

    /// Get uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    pub fn deliveries(&self) -> u64 {
        self.deliveries.load(Ordering::Relaxed)
    }

    pub fn events_dropped(&self) -> u64 {
        self.events_dropped.load(Ordering::Relaxed)
    }

    pub fn notifications(&self) -> u64 {
        self.notifications.load(Ordering::Relaxed)
    }

    pub fn notifications_suppressed(&self) -> u64 {
        self.notifications_suppressed.load(Ordering::Relaxed)
    }

    pub fn subscriptions_opened(&self) -> u64 {
        self.subscriptions_opened.load(Ordering::Relaxed)
    }

    pub fn subscriptions_closed(&self) -> u64 {
        self.subscriptions_closed.load(Ordering::Relaxed)
    }

    /// Subscriptions opened and not yet closed.
    pub fn active_subscriptions(&self) -> u64 {
        self.subscriptions_opened()
            .saturating_sub(self.subscriptions_closed())
    }

    /// Export all counters in Prometheus text exposition format.
    pub fn to_prometheus(&self) -> String {
        let mut out = String::new();

        let counters = [
            (
                "postfeed_events_published_total",
                "Events published to the topic registry",
                self.events_published(),
            ),
            (
                "postfeed_deliveries_total",
                "Events enqueued into subscriber channels",
                self.deliveries(),
            ),
            (
                "postfeed_events_dropped_total",
                "Events dropped because a subscriber buffer was full",
                self.events_dropped(),
            ),
            (
                "postfeed_notifications_total",
                "Mutations classified into an event",
                self.notifications(),
            ),
            (
                "postfeed_notifications_suppressed_total",
                "Mutations that produced no observable event",
                self.notifications_suppressed(),
            ),
            (
                "postfeed_subscriptions_opened_total",
                "Subscriptions created",
                self.subscriptions_opened(),
            ),
            (
                "postfeed_subscriptions_closed_total",
                "Subscriptions cancelled or closed by shutdown",
                self.subscriptions_closed(),
            ),
        ];

        for (name, help, value) in counters {
            let _ = writeln!(out, "# HELP {name} {help}");
            let _ = writeln!(out, "# TYPE {name} counter");
            let _ = writeln!(out, "{name} {value}");
        }

        let _ = writeln!(out, "# HELP postfeed_subscriptions_active Currently open subscriptions");
        let _ = writeln!(out, "# TYPE postfeed_subscriptions_active gauge");
        let _ = writeln!(out, "postfeed_subscriptions_active {}", self.active_subscriptions());

        let _ = writeln!(out, "# HELP postfeed_uptime_seconds Seconds since startup");
        let _ = writeln!(out, "# TYPE postfeed_uptime_seconds gauge");
        let _ = writeln!(out, "postfeed_uptime_seconds {}", self.uptime_secs());

        out
    }
}

impl Default for PubSubMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics handle.
pub type SharedPubSubMetrics = Arc<PubSubMetrics>;

/// Create a new shared metrics handle.
pub fn new_shared_metrics() -> SharedPubSubMetrics {
    Arc::new(PubSubMetrics::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_counters() {
        let metrics = PubSubMetrics::new();
        metrics.record_publish(3);
        metrics.record_publish(0);
        metrics.record_drop();

        assert_eq!(metrics.events_published(), 2);
        assert_eq!(metrics.deliveries(), 3);
        assert_eq!(metrics.events_dropped(), 1);
    }

    #[test]
    fn test_active_subscriptions() {
        let metrics = PubSubMetrics::new();
        metrics.record_subscribe();
        metrics.record_subscribe();
        metrics.record_unsubscribe(1);

        assert_eq!(metrics.active_subscriptions(), 1);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = PubSubMetrics::new();
        metrics.record_notification();
        metrics.record_suppressed();

        let text = metrics.to_prometheus();
        assert!(text.contains("# TYPE postfeed_events_published_total counter"));
        assert!(text.contains("postfeed_notifications_total 1"));
        assert!(text.contains("postfeed_notifications_suppressed_total 1"));
        assert!(text.contains("postfeed_subscriptions_active 0"));
    }
}
