//! Mutation-event classification.
//!
//! Decides which [`MutationKind`], if any, a resource state transition
//! produces. For gated categories (posts, gated on `published`) the decision
//! depends only on whether the resource was visible before and after the
//! write:
//!
//! | visible before | visible after | event     |
//! |----------------|---------------|-----------|
//! | no / absent    | yes           | `CREATED` |
//! | yes            | no / absent   | `DELETED` |
//! | yes            | yes           | `UPDATED` |
//! | no / absent    | no / absent   | none      |
//!
//! Ungated categories (users, comments) are always visible, so the event
//! simply mirrors the write that was performed.

use std::fmt;

use postfeed_proto::MutationKind;

/// State of a resource across one committed write.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition<T> {
    /// The resource did not exist before the write.
    Created(T),
    /// The resource existed before and after the write.
    Updated { before: T, after: T },
    /// The resource no longer exists after the write.
    Deleted(T),
}

impl<T> Transition<T> {
    /// Build a transition from optional before/after states.
    ///
    /// # Panics
    ///
    /// Panics if both states are `None`. A write always has at least one
    /// side; receiving neither is a bug in the caller.
    pub fn from_states(before: Option<T>, after: Option<T>) -> Self {
        match (before, after) {
            (None, Some(after)) => Transition::Created(after),
            (Some(before), Some(after)) => Transition::Updated { before, after },
            (Some(before), None) => Transition::Deleted(before),
            (None, None) => panic!("transition requires a previous or a next state"),
        }
    }

    /// State before the write, if the resource existed.
    pub fn before(&self) -> Option<&T> {
        match self {
            Transition::Created(_) => None,
            Transition::Updated { before, .. } => Some(before),
            Transition::Deleted(before) => Some(before),
        }
    }

    /// State after the write, if the resource still exists.
    pub fn after(&self) -> Option<&T> {
        match self {
            Transition::Created(after) => Some(after),
            Transition::Updated { after, .. } => Some(after),
            Transition::Deleted(_) => None,
        }
    }

    /// The write operation itself, ignoring visibility.
    pub fn operation(&self) -> MutationKind {
        match self {
            Transition::Created(_) => MutationKind::Created,
            Transition::Updated { .. } => MutationKind::Updated,
            Transition::Deleted(_) => MutationKind::Deleted,
        }
    }

    /// The snapshot an event of `kind` should carry.
    ///
    /// `DELETED` carries the last state subscribers could see; every other
    /// kind carries the new state.
    pub fn payload_for(&self, kind: MutationKind) -> &T {
        match (self, kind) {
            (Transition::Updated { before, .. }, MutationKind::Deleted) => before,
            (Transition::Updated { after, .. }, _) => after,
            (Transition::Created(state), _) | (Transition::Deleted(state), _) => state,
        }
    }
}

/// Whether subscribers may observe a resource in a given state.
pub enum VisibilityRule<T> {
    /// Every state is observable.
    Ungated,
    /// Only states satisfying the predicate are observable.
    Gated(fn(&T) -> bool),
}

impl<T> VisibilityRule<T> {
    /// Whether `state` is observable. An absent resource never is.
    pub fn is_visible(&self, state: Option<&T>) -> bool {
        match (self, state) {
            (_, None) => false,
            (VisibilityRule::Ungated, Some(_)) => true,
            (VisibilityRule::Gated(predicate), Some(state)) => predicate(state),
        }
    }

    pub fn is_gated(&self) -> bool {
        matches!(self, VisibilityRule::Gated(_))
    }
}

impl<T> Clone for VisibilityRule<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for VisibilityRule<T> {}

impl<T> fmt::Debug for VisibilityRule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisibilityRule::Ungated => f.write_str("Ungated"),
            VisibilityRule::Gated(_) => f.write_str("Gated"),
        }
    }
}

/// Classify a transition under a visibility rule.
///
/// Pure function; returns `None` when nothing observable changed.
pub fn classify<T>(transition: &Transition<T>, rule: &VisibilityRule<T>) -> Option<MutationKind> {
    if !rule.is_gated() {
        return Some(transition.operation());
    }

    let was_visible = rule.is_visible(transition.before());
    let is_visible = rule.is_visible(transition.after());

    match (was_visible, is_visible) {
        (false, true) => Some(MutationKind::Created),
        (true, false) => Some(MutationKind::Deleted),
        (true, true) => Some(MutationKind::Updated),
        (false, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Doc {
        title: &'static str,
        published: bool,
    }

    fn doc(title: &'static str, published: bool) -> Doc {
        Doc { title, published }
    }

    fn is_published(doc: &Doc) -> bool {
        doc.published
    }

    fn gated() -> VisibilityRule<Doc> {
        VisibilityRule::Gated(is_published)
    }

    fn ungated() -> VisibilityRule<Doc> {
        VisibilityRule::Ungated
    }

    #[test]
    fn test_gated_decision_table() {
        let cases = [
            (None, Some(doc("a", true)), Some(MutationKind::Created)),
            (None, Some(doc("a", false)), None),
            (Some(doc("a", false)), Some(doc("a", true)), Some(MutationKind::Created)),
            (Some(doc("a", true)), Some(doc("a", false)), Some(MutationKind::Deleted)),
            (Some(doc("a", true)), None, Some(MutationKind::Deleted)),
            (Some(doc("a", true)), Some(doc("b", true)), Some(MutationKind::Updated)),
            (Some(doc("a", false)), Some(doc("b", false)), None),
            (Some(doc("a", false)), None, None),
        ];

        for (before, after, expected) in cases {
            let transition = Transition::from_states(before.clone(), after.clone());
            assert_eq!(
                classify(&transition, &gated()),
                expected,
                "before={before:?} after={after:?}"
            );
        }
    }

    #[test]
    fn test_ungated_mirrors_operation() {
        let created = Transition::Created(doc("a", false));
        let updated = Transition::Updated {
            before: doc("a", false),
            after: doc("b", false),
        };
        let deleted = Transition::Deleted(doc("a", false));

        assert_eq!(classify(&created, &ungated()), Some(MutationKind::Created));
        assert_eq!(classify(&updated, &ungated()), Some(MutationKind::Updated));
        assert_eq!(classify(&deleted, &ungated()), Some(MutationKind::Deleted));
    }

    #[test]
    fn test_update_without_visibility_change() {
        // Title edit on a visible post.
        let visible = Transition::Updated {
            before: doc("old", true),
            after: doc("new", true),
        };
        assert_eq!(classify(&visible, &gated()), Some(MutationKind::Updated));

        // Title edit on a draft.
        let draft = Transition::Updated {
            before: doc("old", false),
            after: doc("new", false),
        };
        assert_eq!(classify(&draft, &gated()), None);
    }

    #[test]
    fn test_payload_for_kind() {
        let unpublish = Transition::Updated {
            before: doc("a", true),
            after: doc("a", false),
        };
        let kind = classify(&unpublish, &gated()).unwrap();
        assert_eq!(kind, MutationKind::Deleted);
        assert_eq!(unpublish.payload_for(kind), &doc("a", true));

        let publish = Transition::Updated {
            before: doc("a", false),
            after: doc("a", true),
        };
        let kind = classify(&publish, &gated()).unwrap();
        assert_eq!(publish.payload_for(kind), &doc("a", true));

        let deleted = Transition::Deleted(doc("gone", true));
        assert_eq!(deleted.payload_for(MutationKind::Deleted), &doc("gone", true));
    }

    #[test]
    fn test_transition_accessors() {
        let t = Transition::from_states(Some(1), Some(2));
        assert_eq!(t.before(), Some(&1));
        assert_eq!(t.after(), Some(&2));
        assert_eq!(t.operation(), MutationKind::Updated);

        let t = Transition::from_states(None, Some(2));
        assert!(t.before().is_none());
        assert_eq!(t.operation(), MutationKind::Created);
    }

    #[test]
    #[should_panic(expected = "transition requires a previous or a next state")]
    fn test_empty_transition_panics() {
        let _ = Transition::<u32>::from_states(None, None);
    }

    #[test]
    fn test_absent_is_never_visible() {
        assert!(!ungated().is_visible(None));
        assert!(ungated().is_visible(Some(&doc("a", false))));
        assert!(!gated().is_visible(Some(&doc("a", false))));
    }
}
