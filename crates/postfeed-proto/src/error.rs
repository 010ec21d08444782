//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A topic string does not follow the `<category>[:<scope>]` convention.
    #[error("invalid topic: {0}")]
    InvalidTopic(String),

    /// A payload could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
