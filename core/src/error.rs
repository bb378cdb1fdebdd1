//! Error types for the Fomo API client.
//!
//! # Design
//! `MalformedResponse` covers every payload that does not have the shape the
//! call expects. Transport failures are opaque and keep the collaborator's
//! error as their source. `NotFound` gets a dedicated variant because callers
//! frequently distinguish "the event does not exist" from "the server returned
//! an unexpected status"; all other non-2xx responses land in `HttpError`
//! with the raw status code and body.

use thiserror::Error;

/// Opaque error produced by a `Transport` implementation.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by `FomoClient` and the codec.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 404; the requested event does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body does not match the shape expected for the call.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The transport could not complete the round-trip.
    #[error("transport failure: {0}")]
    TransportFailure(#[source] TransportError),

    /// The draft lacks a field the service requires.
    #[error("invalid event draft: {0}")]
    Validation(String),

    /// An update was requested for an event that has no server id.
    #[error("event has no id")]
    MissingEventId,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    pub(crate) fn malformed(reason: impl std::fmt::Display) -> Self {
        Self::MalformedResponse(reason.to_string())
    }
}
