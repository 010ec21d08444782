//! Core error types.

use thiserror::Error;

/// Pub/sub engine errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The registry has been shut down.
    #[error("topic registry is closed")]
    RegistryClosed,

    /// No dispatch route is registered for the resource category.
    #[error("unknown resource category: {0}")]
    UnknownCategory(String),
}
