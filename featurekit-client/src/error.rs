//! Error types for the feature service client.

use featurekit_model::ModelError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, Error>;

/// Errors that can occur talking to a feature service.
#[derive(Debug, Error)]
pub enum Error {
    /// A request failed on the wire or the service reported a failure.
    #[error(transparent)]
    Protocol(Box<ProtocolError>),

    /// The caller violated an operation's precondition. Nothing was sent.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Schema, mapping or coercion failure.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A token could not be produced.
    #[error("token error: {0}")]
    Token(String),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<ProtocolError> for Error {
    fn from(err: ProtocolError) -> Self {
        Error::Protocol(Box::new(err))
    }
}

impl Error {
    /// Returns the protocol failure, if this is one.
    pub fn as_protocol(&self) -> Option<&ProtocolError> {
        match self {
            Error::Protocol(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// A failed request, with everything needed to diagnose it.
///
/// Credentials are redacted from `url` and `request_body`.
#[derive(Debug, Error)]
#[error("request to {url} failed: {cause}")]
pub struct ProtocolError {
    pub url: String,
    /// The form body of a POST request.
    pub request_body: Option<String>,
    /// The raw response text, when one was received.
    pub response_body: Option<String>,
    #[source]
    pub cause: ProtocolCause,
}

/// What made a request fail.
#[derive(Debug, Error)]
pub enum ProtocolCause {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// The response carried a non-null error envelope.
    #[error("service error {code}: {message}")]
    Service {
        code: i64,
        message: String,
        details: Vec<String>,
    },

    /// An edit result reported a per-record failure.
    #[error("edit rejected for object {object_id:?} ({code}): {description}")]
    EditRejected {
        object_id: Option<i64>,
        code: i64,
        description: String,
    },
}
