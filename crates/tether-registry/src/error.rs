//! Error types for the registry.

use serde::{Deserialize, Serialize};
use tether_core::{Address, ErrorKind, Identity};
use thiserror::Error;

/// A contract-level rejection. The call reverted and state is unchanged.
///
/// Serializable so the RPC gateway can report reverts in the same shape the
/// in-process contract produces them.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ContractError {
    #[error("identity already registered: {identity}")]
    AlreadyRegistered { identity: Identity },

    #[error("unknown identity: {identity}")]
    UnknownIdentity { identity: Identity },

    #[error("unknown alias: {alias}")]
    UnknownAlias { alias: String },

    #[error("owner must not be the zero address")]
    ZeroOwner,

    #[error("{sender} is not the owner of {identity}")]
    NotOwner { identity: Identity, sender: Address },

    #[error("identity is inactive: {identity}")]
    Inactive { identity: Identity },

    #[error("alias already taken: {alias}")]
    AliasTaken { alias: String },

    #[error("invalid alias: {alias}")]
    InvalidAlias { alias: String },

    #[error("identity has no alias: {identity}")]
    NoAlias { identity: Identity },

    #[error("insufficient payment: required {required}, paid {paid}")]
    InsufficientPayment { required: u64, paid: u64 },

    #[error("anonymous identity {identity} does not accept a submitter")]
    AnonymousSubmitter { identity: Identity },
}

impl ContractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContractError::AlreadyRegistered { .. } | ContractError::AliasTaken { .. } => {
                ErrorKind::Conflict
            }
            ContractError::UnknownIdentity { .. } | ContractError::UnknownAlias { .. } => {
                ErrorKind::NotFound
            }
            _ => ErrorKind::ConstraintViolation,
        }
    }
}

/// Errors from registry bindings.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The contract rejected the call.
    #[error("reverted: {0}")]
    Reverted(#[from] ContractError),

    /// Transport failure or timeout. Retryable.
    #[error("network error: {0}")]
    Network(String),

    /// The gateway answered with an unexpected status.
    #[error("registry gateway returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The transaction was sent but did not reach the required
    /// confirmations in time. It may still be mined later.
    #[error("transaction {tx_hash} not confirmed after {waited_ms} ms")]
    ConfirmationTimeout { tx_hash: String, waited_ms: u64 },

    /// Wire format error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::Reverted(e) => e.kind(),
            RegistryError::Network(_) | RegistryError::ConfirmationTimeout { .. } => {
                ErrorKind::Network
            }
            RegistryError::Http { status, .. } if *status >= 500 || *status == 429 => {
                ErrorKind::Network
            }
            RegistryError::Http { status: 404, .. } => ErrorKind::NotFound,
            _ => ErrorKind::InvalidData,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => RegistryError::Http {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None => RegistryError::Network(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(e: serde_json::Error) -> Self {
        RegistryError::Serialization(e.to_string())
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let identity = Identity::from_bytes([1u8; 32]);
        assert_eq!(
            RegistryError::from(ContractError::AlreadyRegistered { identity }).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            ContractError::AnonymousSubmitter { identity }.kind(),
            ErrorKind::ConstraintViolation
        );
        assert!(RegistryError::from(ContractError::UnknownIdentity { identity }).is_not_found());
        assert!(RegistryError::ConfirmationTimeout {
            tx_hash: "0xab".into(),
            waited_ms: 10
        }
        .is_retryable());
    }

    #[test]
    fn test_revert_wire_format() {
        let json = r#"{"reason":"insufficient_payment","required":10,"paid":3}"#;
        let err: ContractError = serde_json::from_str(json).unwrap();
        assert_eq!(
            err,
            ContractError::InsufficientPayment {
                required: 10,
                paid: 3
            }
        );
    }
}
