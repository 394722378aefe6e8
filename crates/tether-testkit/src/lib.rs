//! # Tether Testkit
//!
//! Testing utilities for Tether.
//!
//! - **Fixtures**: in-memory backends wired together, shared between
//!   simulated devices
//! - **Generators**: proptest strategies for identities, pointers, addresses
//!   and revisions
//! - **Vectors**: deterministic revisions for checking canonical encoding
//!
//! ## Fixtures
//!
//! ```rust
//! use tether_testkit::fixtures::TestBackends;
//!
//! let laptop = TestBackends::new();
//! // Same content store, naming service and chain; empty key store.
//! let phone = laptop.device();
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use tether_testkit::generators::{revision_from_params, RevisionParams};
//!
//! proptest! {
//!     #[test]
//!     fn digest_is_deterministic(params: RevisionParams) {
//!         let a = revision_from_params(&params);
//!         let b = revision_from_params(&params);
//!         prop_assert_eq!(a.digest().unwrap(), b.digest().unwrap());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{make_revision, wallets, TestBackends};
pub use generators::{revision_from_params, RevisionParams};
pub use vectors::{all_vectors, revision_from_vector, vector_report, RevisionVector};
