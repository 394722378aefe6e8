//! Error types for Tether Core, and the error taxonomy shared by every crate.

use thiserror::Error;

/// Coarse classification of every error surfaced by Tether.
///
/// Each crate's error enum maps onto one of these kinds via `kind()`, so
/// callers can decide between retrying, re-authenticating, or reporting
/// without matching on crate-specific variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transport failure or timeout. Retryable.
    Network,
    /// Content, identity or alias is absent.
    NotFound,
    /// Signature or decryption mismatch. The user must re-authenticate.
    AuthFailure,
    /// Identity or alias already exists.
    Conflict,
    /// Registry revert: not owner, inactive, insufficient payment, ...
    ConstraintViolation,
    /// A naming update raced another writer. Retryable after re-resolve.
    StaleRevision,
    /// The identity was never backed up.
    MissingKeyRef,
    /// Malformed data, unsupported versions, integrity failures.
    InvalidData,
    /// Missing or invalid configuration.
    Configuration,
}

impl ErrorKind {
    /// Whether an operation that failed with this kind may succeed on retry.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::StaleRevision)
    }
}

/// Core errors that can occur during revision operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("unsupported revision version: {0}")]
    UnsupportedVersion(u8),

    #[error("malformed revision: {0}")]
    MalformedRevision(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

impl CoreError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidSignature | CoreError::InvalidPublicKey => ErrorKind::AuthFailure,
            _ => ErrorKind::InvalidData,
        }
    }
}

/// Validation errors for revision structure, signatures and ordering.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("signature verification failed")]
    SignatureFailed,

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),

    #[error("first revision must have sequence 0, got {got}")]
    InvalidInitialSequence { got: u64 },

    #[error("stale revision: current sequence {current}, got {got}")]
    StaleSequence { current: u64, got: u64 },

    #[error("revision signed for {got} but expected {expected}")]
    IdentityMismatch { expected: String, got: String },

    #[error("structural error: {0}")]
    StructuralError(String),
}

impl ValidationError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::SignatureFailed => ErrorKind::AuthFailure,
            ValidationError::StaleSequence { .. } => ErrorKind::StaleRevision,
            _ => ErrorKind::InvalidData,
        }
    }
}

impl From<CoreError> for ValidationError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidSignature | CoreError::InvalidPublicKey => {
                ValidationError::SignatureFailed
            }
            CoreError::UnsupportedVersion(v) => ValidationError::UnsupportedVersion(v),
            CoreError::MalformedRevision(msg) | CoreError::EncodingError(msg) => {
                ValidationError::StructuralError(msg)
            }
            CoreError::InvalidHex(e) => ValidationError::StructuralError(e.to_string()),
        }
    }
}
