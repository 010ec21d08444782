//! Change events and the frames delivered to streaming subscribers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::topic::Topic;

/// Semantic classification of a resource change.
///
/// "Nothing observable happened" is not a variant: it is represented by the
/// absence of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MutationKind {
    /// The resource became observable.
    Created,
    /// An observable resource changed and is still observable.
    Updated,
    /// The resource stopped being observable.
    Deleted,
}

impl MutationKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Created => "CREATED",
            MutationKind::Updated => "UPDATED",
            MutationKind::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified mutation routed to one topic.
///
/// The payload is opaque to the pub/sub engine. Events are immutable once
/// built; fan-out clones them per receiving channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<T> {
    topic: Topic,
    kind: MutationKind,
    payload: T,
}

impl<T> Event<T> {
    /// Create a new event.
    pub fn new(topic: Topic, kind: MutationKind, payload: T) -> Self {
        Self {
            topic,
            kind,
            payload,
        }
    }

    /// Topic the event was published on.
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Kind of mutation.
    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    /// Resource snapshot carried by the event.
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Take the payload out of the event.
    pub fn into_payload(self) -> T {
        self.payload
    }

    /// Copy of this event addressed to another topic.
    pub fn retarget(&self, topic: Topic) -> Self
    where
        T: Clone,
    {
        Self {
            topic,
            kind: self.kind,
            payload: self.payload.clone(),
        }
    }
}

/// Frame sent to a streaming client for each delivered event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPayload<T> {
    /// Topic the event arrived on.
    pub topic: Topic,
    /// What happened.
    pub mutation: MutationKind,
    /// Snapshot of the resource.
    pub data: T,
}

impl<T: Serialize> SubscriptionPayload<T> {
    /// Encode the frame as JSON text.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<T> From<Event<T>> for SubscriptionPayload<T> {
    fn from(event: Event<T>) -> Self {
        Self {
            topic: event.topic,
            mutation: event.kind,
            data: event.payload,
        }
    }
}
