//! Symmetric key derivation and ChaCha20-Poly1305 sealing.
//!
//! The symmetric key is never stored. It is re-derived from a wallet
//! signature over the custody message, so any device that can produce the
//! same signature can open the blob.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::envelope::SealedBox;
use crate::error::{CustodyError, Result};

/// Blake3 derive-key context for the symmetric key.
pub const KEY_DERIVATION_CONTEXT: &str = "tether-custody v1 symmetric key";

/// A 256-bit ChaCha20-Poly1305 key. Zeroized on drop.
#[derive(Clone)]
pub struct SymmetricKey(Zeroizing<[u8; 32]>);

impl SymmetricKey {
    /// Derive the key from wallet signature bytes.
    pub fn derive(signature: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(KEY_DERIVATION_CONTEXT);
        hasher.update(signature);
        Self(Zeroizing::new(*hasher.finalize().as_bytes()))
    }

    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; 32]);
        rand::thread_rng().fill_bytes(&mut bytes[..]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn cipher(&self) -> Result<ChaCha20Poly1305> {
        ChaCha20Poly1305::new_from_slice(&self.0[..])
            .map_err(|e| CustodyError::Encryption(e.to_string()))
    }

    /// Encrypt under `nonce`. The output carries the authentication tag.
    pub fn encrypt(&self, plaintext: &[u8], nonce: &SealNonce) -> Result<Vec<u8>> {
        self.cipher()?
            .encrypt(Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| CustodyError::Encryption(e.to_string()))
    }

    /// Decrypt and authenticate. Any failure is `AuthFailure`.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &SealNonce) -> Result<Zeroizing<Vec<u8>>> {
        self.cipher()?
            .decrypt(Nonce::from_slice(&nonce.0), ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| CustodyError::AuthFailure)
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// A 96-bit ChaCha20-Poly1305 nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SealNonce(pub [u8; 12]);

impl SealNonce {
    pub const LEN: usize = 12;

    /// Fresh random nonce. Never reuse one under the same key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

/// Derive the symmetric key for a wallet signature.
pub fn derive_key(signature: &[u8]) -> SymmetricKey {
    SymmetricKey::derive(signature)
}

/// Encrypt `plaintext` under the key derived from `signature`, with a fresh
/// random nonce.
pub fn encrypt(plaintext: &[u8], signature: &[u8]) -> Result<SealedBox> {
    SealedBox::seal(plaintext, &derive_key(signature))
}

/// Open a box sealed by [`encrypt`]. Fails closed with `AuthFailure`.
pub fn decrypt(sealed: &SealedBox, signature: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    sealed.open(&derive_key(signature))
}
