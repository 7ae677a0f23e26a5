//! Error types for the engine REST client.
//!
//! # Design
//! Two classes of failure reach the caller. `Validation` is raised locally
//! when a required identifier is missing and is never sent to the transport.
//! Every other variant describes something the HTTP round-trip produced and
//! is forwarded unchanged. `NotFound` keeps its own variant because callers
//! frequently distinguish "the resource does not exist" from "the server
//! returned an unexpected status."

use thiserror::Error;

/// Errors delivered by every resource operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// A required input was missing; no request was issued.
    #[error("{0}")]
    Validation(String),

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The transport could not complete the round-trip.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    /// True when the error was raised before any request was issued.
    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_is_displayed_verbatim() {
        let err = ApiError::validation("Task complete needs a task id.");
        assert_eq!(err.to_string(), "Task complete needs a task id.");
        assert!(err.is_validation());
    }

    #[test]
    fn http_error_includes_status_and_body() {
        let err = ApiError::Http {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 500: boom");
        assert!(!err.is_validation());
    }
}
