//! postfeed core engine.
//!
//! This crate turns committed resource writes into change events and
//! delivers them to live subscribers:
//!
//! - [`classify`] decides which mutation kind a state transition produces,
//!   honouring per-category visibility gates.
//! - [`pubsub`] holds the topic registry and the bounded, cancellable
//!   delivery channels handed to subscribers.
//! - [`dispatch`] glues the two together for mutation handlers.

pub mod classify;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod pubsub;

pub use classify::{classify, Transition, VisibilityRule};
pub use config::PubSubConfig;
pub use dispatch::{CategoryRoute, Dispatcher, ScopeFn};
pub use error::Error;
pub use metrics::{new_shared_metrics, PubSubMetrics, SharedPubSubMetrics};
pub use pubsub::{Subscription, SubscriptionId, SubscriptionInfo, TopicRegistry};

pub use postfeed_proto::{Event, MutationKind, Topic};
