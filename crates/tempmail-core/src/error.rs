//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A caller-supplied value is out of range or malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A pagination cursor could not be decoded.
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// The recipient domain is not served by this deployment.
    #[error("Domain not supported: {0}")]
    UnsupportedDomain(String),
}

impl Error {
    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Returns true if the error came from the storage layer.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
