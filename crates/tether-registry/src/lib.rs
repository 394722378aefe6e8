//! # Tether Registry
//!
//! The on-chain ledger for Tether identities: who owns each identity, where
//! its encrypted signing key lives, its privacy mode and alias, and an
//! append-only log of submissions.
//!
//! - [`RegistryContract`] is the contract itself as a synchronous state
//!   machine. Rejected calls leave it untouched.
//! - [`Registry`] is the async binding used by the rest of the system.
//!   [`LocalRegistry`] runs the contract in-process; [`RpcRegistry`] talks
//!   to a deployed contract through an HTTP gateway and waits for
//!   confirmations.

pub mod contract;
pub mod error;
pub mod local;
pub mod registry;
pub mod rpc;
pub mod types;

pub use contract::{validate_alias, RegistryContract, DEFAULT_ALIAS_PRICE};
pub use error::{ContractError, RegistryError, Result};
pub use local::LocalRegistry;
pub use registry::Registry;
pub use rpc::{RpcRegistry, RpcRegistryConfig, TxState, TxStatus};
pub use types::{
    AliasRecord, PrivacyMode, RegistryCall, RegistryEvent, RegistryRecord, SubmissionRecord,
    Transaction, TxReceipt,
};
