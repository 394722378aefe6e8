//! Wallet signing seam and the custody message.

use std::fmt;

use async_trait::async_trait;
use tether_core::{Address, Keypair};
use zeroize::Zeroizing;

use crate::error::Result;

/// Format tag of the custody message.
pub const CUSTODY_FORMAT: &str = "tether-custody/v1";

/// The message a wallet signs to unlock every key blob of `owner`.
///
/// ```text
/// tether key custody
/// format: tether-custody/v1
/// owner: 0x<40 hex>
/// ```
///
/// Only the owner is bound, so one signature covers all of the owner's
/// identities.
pub fn custody_message(owner: &Address) -> String {
    format!(
        "tether key custody\nformat: {}\nowner: {}",
        CUSTODY_FORMAT,
        owner.to_hex()
    )
}

/// Signature bytes returned by a wallet. Zeroized on drop, never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct WalletSignature(Zeroizing<Vec<u8>>);

impl WalletSignature {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for WalletSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletSignature({} bytes)", self.0.len())
    }
}

/// An external wallet able to sign messages for one account.
///
/// Signing must be deterministic: the same message always yields the same
/// signature, or previously sealed blobs become unreadable.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn address(&self) -> Address;

    async fn sign_message(&self, message: &[u8]) -> Result<WalletSignature>;
}

/// Sign the custody message for the signer's own address.
pub async fn sign_custody_message(signer: &dyn WalletSigner) -> Result<WalletSignature> {
    let message = custody_message(&signer.address());
    signer.sign_message(message.as_bytes()).await
}

/// An in-process Ed25519 wallet.
pub struct LocalWallet {
    keypair: Keypair,
    address: Address,
}

impl LocalWallet {
    pub fn generate() -> Self {
        Self::from_keypair(Keypair::generate())
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::from_keypair(Keypair::from_seed(seed))
    }

    fn from_keypair(keypair: Keypair) -> Self {
        let address = Address::from_public_key(&keypair.public_key());
        Self { keypair, address }
    }
}

impl fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WalletSigner for LocalWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_message(&self, message: &[u8]) -> Result<WalletSignature> {
        Ok(WalletSignature::new(
            self.keypair.sign(message).as_bytes().to_vec(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custody_message_format() {
        let owner = Address::from_bytes([0xab; 20]);
        assert_eq!(
            custody_message(&owner),
            format!(
                "tether key custody\nformat: tether-custody/v1\nowner: 0x{}",
                "ab".repeat(20)
            )
        );
    }

    #[tokio::test]
    async fn test_local_wallet_is_deterministic() {
        let wallet = LocalWallet::from_seed(&[7u8; 32]);
        let a = sign_custody_message(&wallet).await.unwrap();
        let b = sign_custody_message(&wallet).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_bytes().len(), 64);

        let other = LocalWallet::from_seed(&[8u8; 32]);
        assert_ne!(wallet.address(), other.address());
        assert_ne!(sign_custody_message(&other).await.unwrap(), a);
    }

    #[test]
    fn test_signature_debug_is_redacted() {
        let sig = WalletSignature::new(vec![1, 2, 3]);
        assert_eq!(format!("{:?}", sig), "WalletSignature(3 bytes)");
    }
}
