//! Config store error types.

use sdstore_config::ConfigError;
use thiserror::Error;

/// Result type for config store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Config store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Malformed agent or store settings.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Unknown store kind requested.
    #[error("Unsupported config store backend: {0}")]
    UnsupportedBackend(String),

    /// Template path absent in the store.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Store read exceeded its deadline.
    #[error("Read of {0} timed out")]
    Timeout(String),

    /// Any other transport or server failure.
    #[error("Store connection error: {0}")]
    Connection(String),

    /// The store answered with something we could not decode.
    #[error("Malformed store response: {0}")]
    MalformedResponse(String),
}

impl StoreError {
    /// Expected-absence errors, recovered through the static fallback table.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(self, Self::KeyNotFound(_) | Self::Timeout(_))
    }

    /// Check if this error indicates the store could not be reached.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Classify a transport error raised while reading `path`.
    pub(crate) fn from_transport(path: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(path.to_string())
        } else if err.is_decode() {
            Self::MalformedResponse(format!("{}: {}", path, err))
        } else {
            Self::Connection(format!("{}: {}", path, err))
        }
    }
}
