//! # Tether Store
//!
//! Storage abstractions for Tether:
//!
//! - [`ContentStore`] - immutable blobs addressed by Blake3 hash, with
//!   [`MemoryContentStore`], [`SqliteContentStore`] and [`HttpContentStore`]
//! - [`LocalKeyStore`] - device-local signing keys, with [`MemoryKeyStore`]
//!   and [`SqliteKeyStore`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tether_store::{ContentStore, SqliteContentStore};
//!
//! async fn example() {
//!     let store = SqliteContentStore::open("tether.db").unwrap();
//!     let pointer = store.put(b"{\"title\":\"Survey\"}").await.unwrap();
//!     let bytes = store.get(&pointer).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Content addressing**: a pointer is the Blake3 hash of the bytes, so
//!   puts are idempotent and every read can be verified.
//! - **Containers**: reads through [`ContentStore::get`] unwrap directory
//!   containers (see [`container`]).

pub mod container;
pub mod error;
pub mod http;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use container::{Directory, DirectoryEntry, DEFAULT_MEMBER};
pub use error::{Result, StoreError};
pub use http::{HttpContentStore, HttpStoreConfig};
pub use memory::{MemoryContentStore, MemoryKeyStore};
pub use sqlite::{SqliteContentStore, SqliteKeyStore};
pub use traits::{ContentStore, KeyOrigin, KeyRecord, LocalKeyStore};
