//! Mutation dispatcher.
//!
//! The dispatcher is what mutation handlers call after a committed write. It
//! resolves the category's route, classifies the transition and publishes
//! the resulting event on the category topic, plus the scoped topic when the
//! route defines a scope key.

use std::collections::HashMap;

use postfeed_proto::{Event, MutationKind, Topic};

use crate::classify::{classify, Transition, VisibilityRule};
use crate::error::Error;
use crate::pubsub::TopicRegistry;

/// Extracts the scope key (e.g. a post ID) from a resource snapshot.
pub type ScopeFn<T> = fn(&T) -> Option<String>;

/// How events for one resource category are classified and routed.
pub struct CategoryRoute<T> {
    category: String,
    topic: Topic,
    rule: VisibilityRule<T>,
    scope: Option<ScopeFn<T>>,
}

impl<T> CategoryRoute<T> {
    /// Route for a category where every write is observable.
    pub fn ungated(category: impl Into<String>) -> Self {
        Self::new(category, VisibilityRule::Ungated)
    }

    /// Route for a category whose resources are observable only while
    /// `visible` holds.
    pub fn gated(category: impl Into<String>, visible: fn(&T) -> bool) -> Self {
        Self::new(category, VisibilityRule::Gated(visible))
    }

    fn new(category: impl Into<String>, rule: VisibilityRule<T>) -> Self {
        let category = category.into();
        Self {
            topic: Topic::new(category.clone()),
            category,
            rule,
            scope: None,
        }
    }

    /// Publish on a topic other than the category name.
    pub fn with_topic(mut self, topic: Topic) -> Self {
        self.topic = topic;
        self
    }

    /// Also publish on `<topic>:<scope>` whenever `scope` yields a key.
    pub fn with_scope(mut self, scope: ScopeFn<T>) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn rule(&self) -> &VisibilityRule<T> {
        &self.rule
    }

    pub fn is_scoped(&self) -> bool {
        self.scope.is_some()
    }

    /// Scoped topic for a snapshot, if the route scopes and the snapshot has a key.
    pub fn scoped_topic(&self, snapshot: &T) -> Option<Topic> {
        let key = (self.scope?)(snapshot)?;
        Some(Topic::scoped(self.topic.as_str(), key))
    }
}

impl<T> std::fmt::Debug for CategoryRoute<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryRoute")
            .field("category", &self.category)
            .field("topic", &self.topic)
            .field("rule", &self.rule)
            .field("scoped", &self.scope.is_some())
            .finish()
    }
}

/// Glues classification to topic delivery.
pub struct Dispatcher<T> {
    registry: TopicRegistry<T>,
    routes: HashMap<String, CategoryRoute<T>>,
}

impl<T: Clone + Send + 'static> Dispatcher<T> {
    /// Create a dispatcher publishing into `registry`, with no routes.
    pub fn new(registry: TopicRegistry<T>) -> Self {
        Self {
            registry,
            routes: HashMap::new(),
        }
    }

    /// Register a category route, replacing any previous route for it.
    pub fn with_route(mut self, route: CategoryRoute<T>) -> Self {
        self.add_route(route);
        self
    }

    /// Register a category route, replacing any previous route for it.
    pub fn add_route(&mut self, route: CategoryRoute<T>) {
        tracing::debug!(
            category = %route.category,
            topic = %route.topic,
            gated = route.rule.is_gated(),
            scoped = route.is_scoped(),
            "dispatch route registered"
        );
        self.routes.insert(route.category.clone(), route);
    }

    pub fn route(&self, category: &str) -> Option<&CategoryRoute<T>> {
        self.routes.get(category)
    }

    pub fn registry(&self) -> &TopicRegistry<T> {
        &self.registry
    }

    /// Classify a committed write and publish the resulting event.
    ///
    /// Returns the kind that was published, or `None` when the write was not
    /// observable. The event goes out on every interested topic or on none.
    pub fn notify(
        &self,
        category: &str,
        transition: Transition<T>,
    ) -> Result<Option<MutationKind>, Error> {
        let route = self
            .routes
            .get(category)
            .ok_or_else(|| Error::UnknownCategory(category.to_string()))?;

        let Some(kind) = classify(&transition, &route.rule) else {
            self.registry.metrics().record_suppressed();
            tracing::trace!(
                category,
                operation = %transition.operation(),
                "mutation not observable, no event"
            );
            return Ok(None);
        };

        let payload = transition.payload_for(kind);
        let canonical = Event::new(route.topic.clone(), kind, payload.clone());
        let scoped = route
            .scoped_topic(payload)
            .map(|topic| canonical.retarget(topic));
        let events: Vec<Event<T>> = std::iter::once(canonical).chain(scoped).collect();

        let delivered = self.registry.publish_batch(&events)?;
        self.registry.metrics().record_notification();

        tracing::debug!(
            category,
            kind = %kind,
            topics = events.len(),
            delivered,
            "mutation dispatched"
        );

        Ok(Some(kind))
    }

    /// [`notify`](Self::notify) with optional before/after states.
    ///
    /// # Panics
    ///
    /// Panics if both states are `None`.
    pub fn notify_states(
        &self,
        category: &str,
        before: Option<T>,
        after: Option<T>,
    ) -> Result<Option<MutationKind>, Error> {
        self.notify(category, Transition::from_states(before, after))
    }
}
