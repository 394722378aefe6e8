//! Sealed box: nonce plus AEAD ciphertext.
//!
//! Wire form is `nonce (12 bytes) ‖ ciphertext ‖ tag (16 bytes)`, base64
//! encoded inside key blobs.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use zeroize::Zeroizing;

use crate::crypto::{SealNonce, SymmetricKey};
use crate::error::{CustodyError, Result};

/// Poly1305 tag length.
pub const TAG_LEN: usize = 16;

/// A ChaCha20-Poly1305 ciphertext together with its nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBox {
    pub nonce: SealNonce,
    /// Ciphertext including the authentication tag.
    pub ciphertext: Vec<u8>,
}

impl SealedBox {
    /// Encrypt under `key` with a fresh nonce.
    pub fn seal(plaintext: &[u8], key: &SymmetricKey) -> Result<Self> {
        let nonce = SealNonce::generate();
        let ciphertext = key.encrypt(plaintext, &nonce)?;
        Ok(Self { nonce, ciphertext })
    }

    pub fn open(&self, key: &SymmetricKey) -> Result<Zeroizing<Vec<u8>>> {
        key.decrypt(&self.ciphertext, &self.nonce)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SealNonce::LEN + self.ciphertext.len());
        out.extend_from_slice(self.nonce.as_bytes());
        out.extend_from_slice(&self.ciphertext);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < SealNonce::LEN + TAG_LEN {
            return Err(CustodyError::Malformed(format!(
                "sealed box too short: {} bytes",
                bytes.len()
            )));
        }
        let (nonce, ciphertext) = bytes.split_at(SealNonce::LEN);
        let mut nonce_bytes = [0u8; 12];
        nonce_bytes.copy_from_slice(nonce);
        Ok(Self {
            nonce: SealNonce::from_bytes(nonce_bytes),
            ciphertext: ciphertext.to_vec(),
        })
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_bytes())
    }

    pub fn from_base64(encoded: &str) -> Result<Self> {
        Self::from_bytes(&BASE64.decode(encoded)?)
    }
}
