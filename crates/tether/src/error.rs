//! Error types for the Tether facade.

use tether_core::{ErrorKind, Identity};
use tether_custody::CustodyError;
use tether_naming::NamingError;
use tether_registry::RegistryError;
use tether_store::StoreError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during Tether operations.
#[derive(Debug, Error)]
pub enum TetherError {
    /// Content or key store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Naming service error.
    #[error("naming error: {0}")]
    Naming(#[from] NamingError),

    /// Registry error, including contract reverts.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Key custody error.
    #[error("custody error: {0}")]
    Custody(#[from] CustodyError),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// This device holds no signing key for the identity.
    #[error("no local signing key for identity {0}")]
    MissingLocalKey(Identity),
}

impl TetherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TetherError::Store(e) => e.kind(),
            TetherError::Naming(e) => e.kind(),
            TetherError::Registry(e) => e.kind(),
            TetherError::Custody(e) => e.kind(),
            TetherError::Config(_) => ErrorKind::Configuration,
            TetherError::MissingLocalKey(_) => ErrorKind::NotFound,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Result type for Tether operations.
pub type Result<T> = std::result::Result<T, TetherError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tether_registry::ContractError;

    #[test]
    fn test_kind_passes_through() {
        let err: TetherError = RegistryError::Reverted(ContractError::AlreadyRegistered {
            identity: Identity::from_bytes([1u8; 32]),
        })
        .into();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err: TetherError = StoreError::Network("reset".into()).into();
        assert!(err.is_retryable());

        let err: TetherError = CustodyError::AuthFailure.into();
        assert_eq!(err.kind(), ErrorKind::AuthFailure);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_config_errors_are_configuration() {
        let err: TetherError = ConfigError::Missing("registry.contract_address").into();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
