//! # Tether
//!
//! Updateable, recoverable identities for content-addressed documents.
//!
//! ## Overview
//!
//! A document's content is immutable and addressed by its hash. What makes it
//! updateable is a mutable name: a keypair-addressed pointer that only the
//! key holder can move forward. The name's identity is registered on chain
//! together with its owner's wallet address and a pointer to an encrypted
//! backup of the signing key, so any device holding the wallet can recover
//! the key and keep editing.
//!
//! - **Content**: immutable blobs by Blake3 hash ([`store`])
//! - **Names**: signed, sequence-numbered revisions ([`naming`])
//! - **Registry**: ownership, aliases, submissions ([`registry`])
//! - **Custody**: key blobs sealed under a wallet signature ([`custody`])
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tether::{Tether, TetherConfig};
//! use tether::custody::{LocalWallet, WalletSigner};
//! use tether::registry::PrivacyMode;
//!
//! async fn example() {
//!     let tether = Tether::from_config(TetherConfig::default()).unwrap();
//!     let wallet = LocalWallet::generate();
//!
//!     let doc = tether
//!         .create_document(&wallet, b"{\"title\":\"Survey\"}", PrivacyMode::Identified)
//!         .await
//!         .unwrap();
//!     tether
//!         .update_document(&doc.identity, b"{\"title\":\"Survey v2\"}")
//!         .await
//!         .unwrap();
//!
//!     // On another device with the same wallet:
//!     let _results = tether
//!         .recovery()
//!         .restore_all(&wallet.address(), &wallet, |_| {})
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `tether::core` - identities, pointers, revisions
//! - `tether::store` - content and key stores
//! - `tether::naming` - naming services and the `MutableNames` client
//! - `tether::registry` - registry contract and bindings
//! - `tether::custody` - key blobs and wallet signing

pub mod config;
pub mod error;
pub mod facade;
pub mod recovery;
pub mod telemetry;

// Re-export component crates
pub use tether_core as core;
pub use tether_custody as custody;
pub use tether_naming as naming;
pub use tether_registry as registry;
pub use tether_store as store;

pub use config::{ConfigError, TetherConfig};
pub use error::{Result, TetherError};
pub use facade::{Backends, CreatedDocument, ResolvedDocument, Submission, Tether};
pub use recovery::{
    OwnedIdentity, RecoveryOrchestrator, RecoveryStatus, RestoreError, RestoreProgress,
    RestoreResult,
};
pub use telemetry::init_tracing;

pub use tether_core::{Address, ContentPointer, ErrorKind, Identity, Keypair, Revision};
