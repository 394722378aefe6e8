//! The encrypted key blob stored in the content store.
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "identity": "<64 hex>",
//!   "owner": "0x<40 hex>",
//!   "encryptedKey": "<base64(nonce ‖ ciphertext ‖ tag)>",
//!   "createdAt": "2024-01-01T00:00:00Z"
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tether_core::{Address, Identity, Keypair};
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto::derive_key;
use crate::envelope::SealedBox;
use crate::error::{CustodyError, Result};
use crate::wallet::WalletSignature;

/// Current blob format version.
pub const BLOB_VERSION: &str = "1.0";

/// An identity's signing key, encrypted under a wallet-derived key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedKeyBlob {
    pub version: String,
    pub identity: Identity,
    pub owner: Address,
    pub encrypted_key: String,
    pub created_at: DateTime<Utc>,
}

impl EncryptedKeyBlob {
    /// Encrypt `plaintext` for `identity` under the key derived from
    /// `signature`.
    pub fn package(
        plaintext: &[u8],
        identity: Identity,
        owner: Address,
        signature: &WalletSignature,
    ) -> Result<Self> {
        let sealed = SealedBox::seal(plaintext, &derive_key(signature.as_bytes()))?;
        Ok(Self {
            version: BLOB_VERSION.to_string(),
            identity,
            owner,
            encrypted_key: sealed.to_base64(),
            created_at: Utc::now(),
        })
    }

    /// Seal the seed of `keypair`. The blob's identity is the keypair's.
    pub fn seal_keypair(
        keypair: &Keypair,
        owner: Address,
        signature: &WalletSignature,
    ) -> Result<Self> {
        let seed = Zeroizing::new(keypair.seed());
        Self::package(&seed[..], keypair.identity(), owner, signature)
    }

    /// Check version and owner, then decrypt.
    ///
    /// The owner check runs before any decryption is attempted.
    pub fn unpackage(
        &self,
        expected_owner: &Address,
        signature: &WalletSignature,
    ) -> Result<Zeroizing<Vec<u8>>> {
        self.check_version()?;
        if self.owner != *expected_owner {
            return Err(CustodyError::OwnerMismatch {
                expected: *expected_owner,
                actual: self.owner,
            });
        }

        let sealed = SealedBox::from_base64(&self.encrypted_key)?;
        let plaintext = sealed.open(&derive_key(signature.as_bytes()))?;
        debug!(identity = %self.identity, "opened key blob");
        Ok(plaintext)
    }

    /// Decrypt and rebuild the signing keypair, checking that it derives the
    /// identity the blob was stored for.
    pub fn open_keypair(
        &self,
        expected_owner: &Address,
        signature: &WalletSignature,
    ) -> Result<Keypair> {
        let plaintext = self.unpackage(expected_owner, signature)?;
        let seed: [u8; 32] = plaintext.as_slice().try_into().map_err(|_| {
            CustodyError::Malformed(format!(
                "expected a 32-byte seed, got {} bytes",
                plaintext.len()
            ))
        })?;
        let seed = Zeroizing::new(seed);

        let keypair = Keypair::from_seed(&seed);
        if keypair.identity() != self.identity {
            return Err(CustodyError::KeyMismatch {
                expected: self.identity,
                actual: keypair.identity(),
            });
        }
        Ok(keypair)
    }

    fn check_version(&self) -> Result<()> {
        if self.version != BLOB_VERSION {
            return Err(CustodyError::UnsupportedVersion(self.version.clone()));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a blob, rejecting unknown versions.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let blob: Self = serde_json::from_slice(bytes)?;
        blob.check_version()?;
        Ok(blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::{sign_custody_message, LocalWallet, WalletSigner};
    use proptest::prelude::*;

    fn signature(seed: u8) -> WalletSignature {
        WalletSignature::new(vec![seed; 64])
    }

    #[test]
    fn test_package_unpackage() {
        let owner = Address::from_bytes([1u8; 20]);
        let identity = Identity::from_bytes([2u8; 32]);

        let blob = EncryptedKeyBlob::package(b"secret seed", identity, owner, &signature(9)).unwrap();
        assert_eq!(blob.version, BLOB_VERSION);
        let plaintext = blob.unpackage(&owner, &signature(9)).unwrap();
        assert_eq!(plaintext.as_slice(), b"secret seed");
    }

    #[test]
    fn test_wrong_signature_is_auth_failure() {
        let owner = Address::from_bytes([1u8; 20]);
        let blob = EncryptedKeyBlob::package(b"k", Identity::from_bytes([2u8; 32]), owner, &signature(1))
            .unwrap();
        assert!(matches!(
            blob.unpackage(&owner, &signature(2)),
            Err(CustodyError::AuthFailure)
        ));
    }

    #[test]
    fn test_owner_checked_before_decryption() {
        let owner = Address::from_bytes([1u8; 20]);
        let other = Address::from_bytes([3u8; 20]);
        let mut blob =
            EncryptedKeyBlob::package(b"k", Identity::from_bytes([2u8; 32]), owner, &signature(1))
                .unwrap();
        // Garbage ciphertext would fail decryption; the owner error must win.
        blob.encrypted_key = "AAAA".to_string();

        assert!(matches!(
            blob.unpackage(&other, &signature(1)),
            Err(CustodyError::OwnerMismatch { .. })
        ));
    }

    #[test]
    fn test_json_field_names() {
        let blob = EncryptedKeyBlob::package(
            b"k",
            Identity::from_bytes([2u8; 32]),
            Address::from_bytes([1u8; 20]),
            &signature(1),
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&blob.to_json().unwrap()).unwrap();

        assert_eq!(json["version"], "1.0");
        assert!(json["encryptedKey"].is_string());
        assert!(json["createdAt"].as_str().unwrap().contains('T'));
        assert_eq!(json["owner"], "0x0101010101010101010101010101010101010101");
        assert_eq!(EncryptedKeyBlob::from_json(&blob.to_json().unwrap()).unwrap(), blob);
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut blob = EncryptedKeyBlob::package(
            b"k",
            Identity::from_bytes([2u8; 32]),
            Address::from_bytes([1u8; 20]),
            &signature(1),
        )
        .unwrap();
        blob.version = "2.0".into();

        let bytes = blob.to_json().unwrap();
        assert!(matches!(
            EncryptedKeyBlob::from_json(&bytes),
            Err(CustodyError::UnsupportedVersion(v)) if v == "2.0"
        ));
    }

    #[tokio::test]
    async fn test_keypair_recovery_with_wallet() {
        let wallet = LocalWallet::from_seed(&[5u8; 32]);
        let name_key = Keypair::generate();

        let sig = sign_custody_message(&wallet).await.unwrap();
        let blob = EncryptedKeyBlob::seal_keypair(&name_key, wallet.address(), &sig).unwrap();

        // Another device: same wallet, fresh signature.
        let sig_again = sign_custody_message(&wallet).await.unwrap();
        let restored = blob.open_keypair(&wallet.address(), &sig_again).unwrap();
        assert_eq!(restored.identity(), name_key.identity());
    }

    #[test]
    fn test_key_for_wrong_identity_detected() {
        let owner = Address::from_bytes([1u8; 20]);
        let key = Keypair::generate();
        let mut blob = EncryptedKeyBlob::seal_keypair(&key, owner, &signature(4)).unwrap();
        blob.identity = Keypair::generate().identity();

        assert!(matches!(
            blob.open_keypair(&owner, &signature(4)),
            Err(CustodyError::KeyMismatch { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_blob_opens_only_with_its_signature(
            seed in any::<[u8; 32]>(),
            sig_byte in any::<u8>(),
            other_byte in any::<u8>(),
        ) {
            prop_assume!(sig_byte != other_byte);
            let owner = Address::from_bytes([1u8; 20]);
            let key = Keypair::from_seed(&seed);
            let blob = EncryptedKeyBlob::seal_keypair(&key, owner, &signature(sig_byte)).unwrap();

            let opened = blob.open_keypair(&owner, &signature(sig_byte)).unwrap();
            prop_assert_eq!(opened.identity(), key.identity());
            prop_assert!(matches!(
                blob.open_keypair(&owner, &signature(other_byte)),
                Err(CustodyError::AuthFailure)
            ));
        }
    }
}
