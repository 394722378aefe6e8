//! Error types for the naming module.

use tether_core::{CoreError, ErrorKind, ValidationError};
use thiserror::Error;

/// Errors that can occur during naming operations.
#[derive(Debug, Error)]
pub enum NamingError {
    /// Transport failure or timeout. Retryable.
    #[error("network error: {0}")]
    Network(String),

    /// The naming service asked us to slow down.
    #[error("rate limited by naming service")]
    RateLimited,

    /// The service answered with an unexpected status.
    #[error("naming service returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// A revision lost a race: the service already holds this sequence or a
    /// later one. Re-resolve and retry.
    #[error("stale revision: service is at sequence {current}, attempted {attempted}")]
    StaleRevision { current: u64, attempted: u64 },

    /// The name has never been published, or the identity has no local key.
    #[error("name not found: {0}")]
    NotFound(String),

    /// The name is at the last representable sequence and cannot move.
    #[error("sequence exhausted for name {0}")]
    SequenceExhausted(String),

    /// A revision failed validation.
    #[error("invalid revision: {0}")]
    InvalidRevision(#[from] ValidationError),

    /// Revision encoding failed.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Wire format error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl NamingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NamingError::Network(_) | NamingError::RateLimited => ErrorKind::Network,
            NamingError::Http { status, .. } if *status >= 500 => ErrorKind::Network,
            NamingError::StaleRevision { .. } => ErrorKind::StaleRevision,
            NamingError::NotFound(_) => ErrorKind::NotFound,
            NamingError::InvalidRevision(e) => e.kind(),
            NamingError::Core(e) => e.kind(),
            _ => ErrorKind::InvalidData,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<reqwest::Error> for NamingError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => NamingError::Http {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None => NamingError::Network(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for NamingError {
    fn from(e: serde_json::Error) -> Self {
        NamingError::Serialization(e.to_string())
    }
}

/// Result type for naming operations.
pub type Result<T> = std::result::Result<T, NamingError>;
