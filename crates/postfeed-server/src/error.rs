//! Server error types and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Server errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Resource lookup failed.
    #[error("{entity} {id} does not exist")]
    NotFound { entity: &'static str, id: String },

    /// Another user already uses the email address.
    #[error("email already taken: {0}")]
    EmailTaken(String),

    /// A referenced user or post is missing or not visible.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// Pub/sub engine error.
    #[error("pubsub error: {0}")]
    PubSub(#[from] postfeed_core::Error),

    /// Malformed topic or payload.
    #[error("protocol error: {0}")]
    Protocol(#[from] postfeed_proto::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, id: &str) -> Self {
        Error::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Internal server error.
    Internal(String),
    /// Bad request.
    BadRequest(String),
    /// Not found.
    NotFound(String),
    /// Conflicting state, e.g. a duplicate email.
    Conflict(String),
    /// The server is shutting down.
    Unavailable(String),
}

/// Error response body.
#[derive(Serialize)]
pub struct ErrorResponse {
    /// Error flag.
    pub error: bool,
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", msg),
        };

        let body = ErrorResponse {
            error: true,
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound { .. } => AppError::NotFound(err.to_string()),
            Error::EmailTaken(_) => AppError::Conflict(err.to_string()),
            Error::InvalidReference(_)
            | Error::Protocol(postfeed_proto::Error::InvalidTopic(_)) => {
                AppError::BadRequest(err.to_string())
            }
            Error::PubSub(postfeed_core::Error::RegistryClosed) => {
                AppError::Unavailable(err.to_string())
            }
            Error::PubSub(_) | Error::Protocol(_) | Error::Config(_) | Error::Io(_) => {
                AppError::Internal(err.to_string())
            }
        }
    }
}

impl From<postfeed_core::Error> for AppError {
    fn from(err: postfeed_core::Error) -> Self {
        Error::from(err).into()
    }
}

impl From<postfeed_proto::Error> for AppError {
    fn from(err: postfeed_proto::Error) -> Self {
        Error::from(err).into()
    }
}
