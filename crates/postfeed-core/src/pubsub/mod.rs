//! Topic-based publish/subscribe.
//!
//! A [`TopicRegistry`] maps topics to the delivery channels listening on
//! them. Subscribers receive a [`Subscription`], a bounded, cancellable,
//! in-order stream of events. When a subscriber falls behind and its buffer
//! fills up, newly published events are dropped for that subscriber only;
//! publishers never wait on consumers.

mod registry;
mod subscription;

pub use registry::TopicRegistry;
pub use subscription::{Subscription, SubscriptionId, SubscriptionInfo};
