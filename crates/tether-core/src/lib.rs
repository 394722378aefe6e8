//! # Tether Core
//!
//! Pure primitives for Tether: identities, content pointers, signed revisions
//! and the shared error taxonomy.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`Identity`] - Public half of a mutable-name keypair, the primary handle
//! - [`ContentPointer`] - Content-derived address (Blake3) of an immutable blob
//! - [`Address`] - 20-byte account address used for ownership
//! - [`Revision`] - A signed, sequence-numbered pointer update for an identity
//! - [`NameState`] - Locally observed head of a mutable name
//!
//! ## Canonicalization
//!
//! Revision headers are signed over deterministic CBOR. See [`canonical`] module.

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod name;
pub mod revision;
pub mod serde_hex;
pub mod types;
pub mod validation;

pub use canonical::{canonical_bytes, canonical_header_bytes, signed_message};
pub use crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair};
pub use error::{CoreError, ErrorKind, ValidationError};
pub use name::{NameState, NameStatus, ObserveResult};
pub use revision::{Revision, RevisionBuilder, RevisionHeader, REVISION_VERSION};
pub use types::{now_millis, Address, ContentPointer, Identity};
pub use validation::{validate_revision, validate_successor};
