//! # Tether Custody
//!
//! Encrypted backup of name signing keys, recoverable from a wallet
//! signature.
//!
//! ## Model
//!
//! 1. The wallet signs the canonical [custody message](custody_message) for
//!    its address.
//! 2. The signature is hashed (Blake3 derive-key) into a ChaCha20-Poly1305
//!    key.
//! 3. Each identity's seed is sealed with a fresh nonce into an
//!    [`EncryptedKeyBlob`] and stored in the content store.
//!
//! Any device whose wallet produces the same signature re-derives the same
//! key. One signature opens every blob of the owner.
//!
//! Nothing in this crate performs I/O.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tether_core::Keypair;
//! use tether_custody::{sign_custody_message, EncryptedKeyBlob, LocalWallet, WalletSigner};
//!
//! async fn example() {
//!     let wallet = LocalWallet::generate();
//!     let name_key = Keypair::generate();
//!
//!     let sig = sign_custody_message(&wallet).await.unwrap();
//!     let blob = EncryptedKeyBlob::seal_keypair(&name_key, wallet.address(), &sig).unwrap();
//!
//!     let restored = blob.open_keypair(&wallet.address(), &sig).unwrap();
//!     assert_eq!(restored.identity(), name_key.identity());
//! }
//! ```

pub mod blob;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod wallet;

pub use blob::{EncryptedKeyBlob, BLOB_VERSION};
pub use crypto::{decrypt, derive_key, encrypt, SealNonce, SymmetricKey, KEY_DERIVATION_CONTEXT};
pub use envelope::SealedBox;
pub use error::{CustodyError, Result};
pub use wallet::{
    custody_message, sign_custody_message, LocalWallet, WalletSignature, WalletSigner,
    CUSTODY_FORMAT,
};
