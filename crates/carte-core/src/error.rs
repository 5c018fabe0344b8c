//! Error types for the carte back-office.

use thiserror::Error;

/// Result type alias using carte's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for carte operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A required field is missing or malformed. Raised before any store call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Document store operation failed
    #[error("Store error: {0}")]
    Store(String),

    /// Object storage (upload, URL resolution, removal) failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// A multi-document transaction could not be committed
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (authenticated but not authorized)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
