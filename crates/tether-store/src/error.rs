//! Error types for the store module.

use tether_core::ErrorKind;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport failure talking to a gateway. Retryable.
    #[error("network error: {0}")]
    Network(String),

    /// The gateway answered with an unexpected status.
    #[error("gateway returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Blob or key not present.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bytes returned for a pointer do not hash to that pointer.
    #[error("integrity check failed: expected {expected}, got {actual}")]
    Integrity { expected: String, actual: String },

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Blocking task or lock failure.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Network(_) => ErrorKind::Network,
            StoreError::Http { status, .. } if *status == 429 || *status >= 500 => {
                ErrorKind::Network
            }
            StoreError::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::InvalidData,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => StoreError::Http {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None => StoreError::Network(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
