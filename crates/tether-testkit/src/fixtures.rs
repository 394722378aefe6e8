//! Test fixtures and helpers.
//!
//! In-memory backends for integration tests. A [`TestBackends`] plays one
//! device; [`TestBackends::device`] adds another that shares the network
//! side (content, names, chain) but has its own key store.

use std::sync::Arc;
use std::time::Duration;

use tether_core::{ContentPointer, CoreError, Keypair, Revision, RevisionBuilder};
use tether_custody::LocalWallet;
use tether_naming::MemoryNamingService;
use tether_registry::LocalRegistry;
use tether_store::{MemoryContentStore, MemoryKeyStore};

/// In-memory backends for one simulated device.
#[derive(Clone)]
pub struct TestBackends {
    pub content: Arc<MemoryContentStore>,
    pub naming: Arc<MemoryNamingService>,
    pub registry: Arc<LocalRegistry>,
    pub keys: Arc<MemoryKeyStore>,
}

impl TestBackends {
    pub fn new() -> Self {
        Self::with_naming(MemoryNamingService::new())
    }

    /// Backends whose naming service publishes with a lag.
    pub fn with_propagation_delay(delay: Duration) -> Self {
        Self::with_naming(MemoryNamingService::with_propagation_delay(delay))
    }

    fn with_naming(naming: MemoryNamingService) -> Self {
        Self {
            content: Arc::new(MemoryContentStore::new()),
            naming: Arc::new(naming),
            registry: Arc::new(LocalRegistry::new()),
            keys: Arc::new(MemoryKeyStore::new()),
        }
    }

    /// Another device on the same network, with an empty key store.
    pub fn device(&self) -> Self {
        Self {
            content: self.content.clone(),
            naming: self.naming.clone(),
            registry: self.registry.clone(),
            keys: Arc::new(MemoryKeyStore::new()),
        }
    }
}

impl Default for TestBackends {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic wallets; wallet `i` is seeded with `i + 1`.
pub fn wallets(count: usize) -> Vec<LocalWallet> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[..8].copy_from_slice(&(i as u64 + 1).to_le_bytes());
            LocalWallet::from_seed(&seed)
        })
        .collect()
}

/// Sign a revision pointing at the content pointer of `body`.
pub fn make_revision(
    keypair: &Keypair,
    sequence: u64,
    body: &[u8],
) -> Result<Revision, CoreError> {
    RevisionBuilder::new(sequence, ContentPointer::of(body))
        .timestamp(1_700_000_000_000 + sequence as i64)
        .sign(keypair)
}
