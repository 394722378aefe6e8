//! # Tether Naming
//!
//! Signed, monotonically versioned pointers ("mutable names") on top of
//! content pointers.
//!
//! ## Overview
//!
//! An identity is an Ed25519 public key. Whoever holds the private key can
//! move the name by signing a [`tether_core::Revision`] with a higher
//! sequence and publishing it to a [`NamingService`]. Resolution is
//! eventually consistent; [`MutableNames`] keeps reads from going backwards.
//!
//! ## Lifecycle
//!
//! ```text
//! create() ──> Unpublished ──publish()──> Published(seq=0) ──update()──> Updated(seq=n)
//!                                                              ^            │
//!                                                              └──update()──┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tether_core::ContentPointer;
//! use tether_naming::{MemoryNamingService, MutableNames};
//!
//! async fn example() {
//!     let names = MutableNames::new(Arc::new(MemoryNamingService::new()));
//!     let (identity, key) = names.create();
//!     names.publish(&key, ContentPointer::of(b"v0")).await.unwrap();
//!     names.update(&key, ContentPointer::of(b"v1")).await.unwrap();
//!     let head = names.resolve(&identity).await.unwrap();
//!     assert_eq!(head.sequence(), 1);
//! }
//! ```

pub mod client;
pub mod error;
pub mod http;
pub mod messages;
pub mod rate_limit;
pub mod service;

pub use client::MutableNames;
pub use error::{NamingError, Result};
pub use http::{HttpNamingConfig, HttpNamingService};
pub use messages::{ErrorResponse, NamingErrorCode, PublishRequest, ResolveResponse};
pub use rate_limit::RateLimiter;
pub use service::{memory::MemoryNamingService, NamingService};
