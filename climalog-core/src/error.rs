//! Error types for climalog-core
//!
//! Transport failures carry an explicit [`ErrorKind`] so callers can decide
//! what to log without looking at message text.

use thiserror::Error;

/// Main error type for the climalog-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Hostname of a transport endpoint could not be resolved
    #[error("DNS resolution failed for {host}: {message}")]
    Dns { host: String, message: String },

    /// Transport-level refusal, drop, or timeout
    #[error("connection error: {0}")]
    Connection(String),

    /// The peer answered, but rejected the request (HTTP status, broker channel error)
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Weather source error
    #[error("fetch error: {0}")]
    Fetch(String),
}

/// Failure classes of the delivery subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Dns,
    Connection,
    Protocol,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Dns => "dns",
            ErrorKind::Connection => "connection",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Config => "config",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Classify this error.
    ///
    /// IO errors count as connection failures, JSON and fetch errors as
    /// protocol failures.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Dns { .. } => ErrorKind::Dns,
            Error::Connection(_) | Error::Io(_) => ErrorKind::Connection,
            Error::Protocol(_) | Error::Json(_) | Error::Fetch(_) => ErrorKind::Protocol,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    /// Operator hint for failures that usually come from a misconfigured host.
    pub fn hint(&self) -> Option<&'static str> {
        match self.kind() {
            ErrorKind::Dns => Some(
                "check the configured host; outside containers use 'localhost' instead of the service name",
            ),
            _ => None,
        }
    }
}

/// Result type alias for climalog-core
pub type Result<T> = std::result::Result<T, Error>;
