use thiserror::Error;

/// Failure of a single streamed request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Adapter could not be constructed (empty key, bad URL, bad proxy)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Request rejected before anything was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Network or transport-level failure (connect, TLS, body read, idle timeout)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Response did not match the provider's expected shape (status, frame, encoding)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Body ended before the provider signalled completion
    #[error("Stream ended before completion: {0}")]
    IncompleteStream(String),
}

/// Discriminant of [`TransportError`], handy for matching in callers and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    Configuration,
    InvalidRequest,
    Connection,
    Protocol,
    IncompleteStream,
}

impl TransportError {
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            Self::Configuration(_) => TransportErrorKind::Configuration,
            Self::InvalidRequest(_) => TransportErrorKind::InvalidRequest,
            Self::Connection(_) => TransportErrorKind::Connection,
            Self::Protocol(_) => TransportErrorKind::Protocol,
            Self::IncompleteStream(_) => TransportErrorKind::IncompleteStream,
        }
    }

    /// Build the error for a non-2xx response
    pub fn status(provider: &str, status: reqwest::StatusCode, body: &str) -> Self {
        Self::Protocol(format!("{} API error ({}): {}", provider, status, body))
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
