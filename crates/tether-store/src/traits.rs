//! Storage traits: content-addressed blobs and local signing keys.
//!
//! Both traits are async so network and SQLite backends fit behind the same
//! interface. SQLite backends use `spawn_blocking` internally.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tether_core::{ContentPointer, Identity, Keypair};
use zeroize::Zeroize;

use crate::container::Directory;
use crate::error::Result;

/// Immutable byte blobs addressed by their Blake3 hash.
///
/// # Design Notes
///
/// - **Idempotent puts**: storing the same bytes twice yields the same pointer.
/// - **Typed misses**: an absent blob is `StoreError::NotFound`, never an
///   empty result.
/// - **Container tolerant reads**: [`ContentStore::get`] unwraps directory
///   containers; [`ContentStore::get_raw`] returns stored bytes untouched.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store bytes and return their pointer.
    async fn put(&self, data: &[u8]) -> Result<ContentPointer>;

    /// Fetch exactly the bytes stored under `pointer`.
    async fn get_raw(&self, pointer: &ContentPointer) -> Result<Bytes>;

    /// Check whether a blob exists.
    async fn has(&self, pointer: &ContentPointer) -> Result<bool>;

    /// Fetch the object at `pointer`, unwrapping a directory container.
    async fn get(&self, pointer: &ContentPointer) -> Result<Bytes> {
        let raw = self.get_raw(pointer).await?;
        match Directory::parse(&raw) {
            Some(dir) => {
                let member = dir.select_member()?;
                tracing::debug!(
                    container = %pointer,
                    member = %member.name,
                    "unwrapping directory container"
                );
                self.get_raw(&member.pointer).await
            }
            None => Ok(raw),
        }
    }

    /// Store `data` and a directory container naming it `member`.
    ///
    /// Returns the container's pointer.
    async fn put_wrapped(&self, member: &str, data: &[u8]) -> Result<ContentPointer> {
        let inner = self.put(data).await?;
        let dir = Directory::single(member, inner);
        self.put(&dir.to_json()?).await
    }
}

/// Where a locally held signing key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyOrigin {
    /// Generated on this device.
    Created,
    /// Recovered from an encrypted backup.
    Restored,
}

/// A mutable-name signing key held on this device.
///
/// The seed is wiped when the record is dropped.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub identity: Identity,
    #[serde(with = "tether_core::serde_hex")]
    seed: [u8; 32],
    pub origin: KeyOrigin,
    /// Unix ms.
    pub stored_at: i64,
}

impl KeyRecord {
    pub fn new(keypair: &Keypair, origin: KeyOrigin, stored_at: i64) -> Self {
        Self {
            identity: keypair.identity(),
            seed: keypair.seed(),
            origin,
            stored_at,
        }
    }

    pub fn keypair(&self) -> Keypair {
        Keypair::from_seed(&self.seed)
    }
}

impl std::fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRecord")
            .field("identity", &self.identity)
            .field("origin", &self.origin)
            .field("stored_at", &self.stored_at)
            .finish_non_exhaustive()
    }
}

impl Drop for KeyRecord {
    fn drop(&mut self) {
        self.seed.zeroize();
    }
}

/// Device-local table of signing keys, keyed by identity.
#[async_trait]
pub trait LocalKeyStore: Send + Sync {
    async fn load(&self, identity: &Identity) -> Result<Option<KeyRecord>>;

    /// Insert or replace the record for `record.identity`.
    async fn save(&self, record: &KeyRecord) -> Result<()>;

    /// Returns whether a record was removed.
    async fn remove(&self, identity: &Identity) -> Result<bool>;

    /// All identities with a key on this device, sorted.
    async fn list(&self) -> Result<Vec<Identity>>;

    async fn clear(&self) -> Result<()>;

    async fn contains(&self, identity: &Identity) -> Result<bool> {
        Ok(self.load(identity).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_record_rebuilds_keypair() {
        let kp = Keypair::from_seed(&[5; 32]);
        let record = KeyRecord::new(&kp, KeyOrigin::Created, 10);
        assert_eq!(record.identity, kp.identity());
        assert_eq!(record.keypair().public_key(), kp.public_key());
    }

    #[test]
    fn test_debug_hides_seed() {
        let kp = Keypair::from_seed(&[0xab; 32]);
        let record = KeyRecord::new(&kp, KeyOrigin::Restored, 0);
        let debug = format!("{:?}", record);
        assert!(!debug.contains("abababab"));
        assert!(debug.contains("Restored"));
    }
}
