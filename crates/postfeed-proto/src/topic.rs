//! Topic keys.
//!
//! Topics are plain strings shared by publishers and subscribers. A topic is
//! either a bare resource category (`"post"`, `"comment"`, `"user"`) or a
//! category scoped by an identifier, joined with a colon (`"comment:10"`).

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Separator between a category and its scope key.
pub const SCOPE_SEPARATOR: char = ':';

/// Topic for user mutations.
pub const USER: &str = "user";
/// Topic for post mutations.
pub const POST: &str = "post";
/// Topic for comment mutations.
pub const COMMENT: &str = "comment";

/// A routing key selecting which subscribers receive an event.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Topic for a whole resource category.
    pub fn new(category: impl Into<String>) -> Self {
        Self(category.into())
    }

    /// Topic for a category narrowed to one scope key, e.g. the comments of one post.
    pub fn scoped(category: &str, scope: impl fmt::Display) -> Self {
        Self(format!("{category}{SCOPE_SEPARATOR}{scope}"))
    }

    /// Parse and validate a topic string.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let (category, scope) = match raw.split_once(SCOPE_SEPARATOR) {
            Some((category, scope)) => (category, Some(scope)),
            None => (raw, None),
        };

        if category.is_empty() || category.chars().any(char::is_whitespace) {
            return Err(Error::InvalidTopic(raw.to_string()));
        }
        if matches!(scope, Some(s) if s.is_empty()) {
            return Err(Error::InvalidTopic(raw.to_string()));
        }

        Ok(Self(raw.to_string()))
    }

    /// The category part of the topic.
    pub fn category(&self) -> &str {
        self.0
            .split_once(SCOPE_SEPARATOR)
            .map(|(category, _)| category)
            .unwrap_or(&self.0)
    }

    /// The scope key, if this is a scoped topic.
    pub fn scope(&self) -> Option<&str> {
        self.0.split_once(SCOPE_SEPARATOR).map(|(_, scope)| scope)
    }

    /// Whether the topic is narrowed to a scope key.
    pub fn is_scoped(&self) -> bool {
        self.scope().is_some()
    }

    /// The raw topic string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Topic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<&str> for Topic {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for Topic {
    fn borrow(&self) -> &str {
        &self.0
    }
}
