//! Error types for the OXM SDK
//!
//! Two families live here:
//!
//! - [`AdError`]: the closed set of load failures reported to the host
//!   through the delegate. These are data, never propagated with `?`.
//! - [`Error`]: invalid or unparseable configuration, returned as `Result`
//!   from fallible operations.

use thiserror::Error;

/// Result type alias for OXM operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the OXM SDK
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (never retried)
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Failures reported by an [`AdTransport`](crate::traits::AdTransport)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The ad server could not be reached
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// The request timed out
    #[error("timed out: {0}")]
    Timeout(String),

    /// Any other transport failure
    #[error("{0}")]
    Other(String),
}

/// Ad load failure kinds
///
/// Every failed request cycle maps to exactly one of these and is reported
/// once via `DidFailToReceiveAd`. Numeric codes match the wire codes hosts
/// already know from earlier SDK releases.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdError {
    /// Anything not covered by the other kinds
    #[error("unknown error: {0}")]
    Unknown(String),

    /// Internet connection is down or the server is unreachable
    #[error("no connection: {0}")]
    NoConnection(String),

    /// Ad server problem (5xx or protocol-level failure)
    #[error("server error: {0}")]
    Server(String),

    /// The response could not be interpreted
    #[error("malformed response: {0}")]
    Response(String),

    /// Well-formed response without any ads
    #[error("no ads loaded")]
    NoAdsLoaded,
}

impl AdError {
    /// Numeric error code
    pub fn code(&self) -> u16 {
        match self {
            AdError::Unknown(_) => 1000,
            AdError::NoConnection(_) => 1001,
            AdError::Server(_) => 1002,
            AdError::Response(_) => 1003,
            AdError::NoAdsLoaded => 1004,
        }
    }
}

impl From<TransportError> for AdError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unreachable(msg) | TransportError::Timeout(msg) => {
                AdError::NoConnection(msg)
            }
            TransportError::Other(msg) => AdError::Unknown(msg),
        }
    }
}
