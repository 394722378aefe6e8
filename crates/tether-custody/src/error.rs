//! Error types for key custody.

use tether_core::{Address, ErrorKind, Identity};
use thiserror::Error;

/// Errors that can occur while sealing or opening key blobs.
#[derive(Debug, Error)]
pub enum CustodyError {
    /// Decryption failed: wrong signature, or tampered ciphertext.
    #[error("authentication failed: key blob does not open with this signature")]
    AuthFailure,

    /// The blob names a different owner than the one recovering.
    #[error("owner mismatch: blob belongs to {actual}, expected {expected}")]
    OwnerMismatch { expected: Address, actual: Address },

    /// The decrypted key does not derive the identity it was stored for.
    #[error("key mismatch: decrypted key is for {actual}, expected {expected}")]
    KeyMismatch { expected: Identity, actual: Identity },

    #[error("unsupported key blob version: {0}")]
    UnsupportedVersion(String),

    /// Structurally invalid blob or sealed box.
    #[error("malformed key blob: {0}")]
    Malformed(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// The wallet refused or failed to sign.
    #[error("wallet signer error: {0}")]
    Signer(String),

    #[error("encryption error: {0}")]
    Encryption(String),
}

impl CustodyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CustodyError::AuthFailure
            | CustodyError::OwnerMismatch { .. }
            | CustodyError::Signer(_) => ErrorKind::AuthFailure,
            _ => ErrorKind::InvalidData,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<serde_json::Error> for CustodyError {
    fn from(e: serde_json::Error) -> Self {
        CustodyError::Serialization(e.to_string())
    }
}

impl From<base64::DecodeError> for CustodyError {
    fn from(e: base64::DecodeError) -> Self {
        CustodyError::Malformed(format!("invalid base64: {}", e))
    }
}

/// Result type for custody operations.
pub type Result<T> = std::result::Result<T, CustodyError>;
