//! In-process registry chain.
//!
//! Wraps a [`RegistryContract`] behind an async lock. Every accepted
//! transaction is mined immediately as its own block, so receipts returned
//! here are always confirmed.

use std::collections::HashMap;

use async_trait::async_trait;
use tether_core::{now_millis, Address, Identity};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::contract::RegistryContract;
use crate::error::Result;
use crate::registry::Registry;
use crate::types::{RegistryEvent, RegistryRecord, SubmissionRecord, Transaction, TxReceipt};

#[derive(Debug, Default)]
struct Chain {
    contract: RegistryContract,
    block_number: u64,
    receipts: HashMap<String, TxReceipt>,
    events: Vec<(u64, RegistryEvent)>,
}

/// Registry running in this process.
#[derive(Debug, Default)]
pub struct LocalRegistry {
    chain: RwLock<Chain>,
}

impl LocalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contract(contract: RegistryContract) -> Self {
        Self {
            chain: RwLock::new(Chain {
                contract,
                ..Chain::default()
            }),
        }
    }

    /// Number of mined blocks.
    pub async fn block_number(&self) -> u64 {
        self.chain.read().await.block_number
    }

    /// All events emitted so far, tagged with their block number.
    pub async fn events(&self) -> Vec<(u64, RegistryEvent)> {
        self.chain.read().await.events.clone()
    }

    pub async fn receipt(&self, tx_hash: &str) -> Option<TxReceipt> {
        self.chain.read().await.receipts.get(tx_hash).cloned()
    }
}

fn tx_hash(tx: &Transaction, block_number: u64) -> Result<String> {
    let body = serde_json::to_vec(tx)?;
    let mut hasher = blake3::Hasher::new_derive_key("tether registry tx v1");
    hasher.update(&block_number.to_be_bytes());
    hasher.update(&body);
    Ok(format!("0x{}", hex::encode(hasher.finalize().as_bytes())))
}

#[async_trait]
impl Registry for LocalRegistry {
    async fn submit(&self, tx: Transaction) -> Result<TxReceipt> {
        let mut chain = self.chain.write().await;
        let block_number = chain.block_number + 1;
        let tx_hash = tx_hash(&tx, block_number)?;

        let events = chain.contract.apply(&tx, now_millis()).map_err(|e| {
            debug!(
                call = tx.call.name(),
                identity = %tx.call.identity(),
                error = %e,
                "transaction reverted"
            );
            e
        })?;

        chain.block_number = block_number;
        chain
            .events
            .extend(events.iter().cloned().map(|e| (block_number, e)));

        let receipt = TxReceipt {
            tx_hash: tx_hash.clone(),
            block_number,
            events,
        };
        chain.receipts.insert(tx_hash, receipt.clone());

        info!(
            call = tx.call.name(),
            identity = %tx.call.identity(),
            block = block_number,
            "registry transaction mined"
        );
        Ok(receipt)
    }

    async fn get_record(&self, identity: &Identity) -> Result<Option<RegistryRecord>> {
        Ok(self.chain.read().await.contract.record(identity).cloned())
    }

    async fn resolve_alias(&self, alias_or_identity: &str) -> Result<Identity> {
        Ok(self
            .chain
            .read()
            .await
            .contract
            .resolve_alias(alias_or_identity)?)
    }

    async fn get_record_count(&self, identity: &Identity) -> Result<u64> {
        Ok(self.chain.read().await.contract.record_count(identity)?)
    }

    async fn list_owned(&self, owner: &Address) -> Result<Vec<RegistryRecord>> {
        Ok(self.chain.read().await.contract.list_owned(owner))
    }

    async fn get_submissions(
        &self,
        identity: &Identity,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<SubmissionRecord>> {
        Ok(self
            .chain
            .read()
            .await
            .contract
            .submissions(identity, offset, limit)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use crate::types::PrivacyMode;
    use std::sync::Arc;
    use tether_core::{ContentPointer, ErrorKind};

    fn owner() -> Address {
        Address::from_bytes([0x11; 20])
    }

    fn registry() -> LocalRegistry {
        LocalRegistry::with_contract(RegistryContract::with_alias_price(5))
    }

    #[tokio::test]
    async fn test_each_write_is_one_block() {
        let registry = registry();
        let identity = Identity::from_bytes([1u8; 32]);

        let r1 = registry
            .register(owner(), owner(), identity, None, PrivacyMode::Identified)
            .await
            .unwrap();
        let r2 = registry
            .register_alias(owner(), identity, "hello", 5)
            .await
            .unwrap();

        assert_eq!(r1.block_number, 1);
        assert_eq!(r2.block_number, 2);
        assert_ne!(r1.tx_hash, r2.tx_hash);
        assert_eq!(registry.receipt(&r2.tx_hash).await, Some(r2));
        assert_eq!(registry.events().await.len(), 2);
    }

    #[tokio::test]
    async fn test_revert_does_not_mine() {
        let registry = registry();
        let identity = Identity::from_bytes([1u8; 32]);
        registry
            .register(owner(), owner(), identity, None, PrivacyMode::Identified)
            .await
            .unwrap();

        let err = registry
            .register(owner(), owner(), identity, None, PrivacyMode::Identified)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Reverted(_)));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(registry.block_number().await, 1);
    }

    #[tokio::test]
    async fn test_reads() {
        let registry = registry();
        let identity = Identity::from_bytes([2u8; 32]);
        let key_ref = ContentPointer::of(b"sealed");
        registry
            .register(owner(), owner(), identity, Some(key_ref), PrivacyMode::Anonymous)
            .await
            .unwrap();

        let record = registry.get_record(&identity).await.unwrap().unwrap();
        assert_eq!(record.encrypted_key_ref, Some(key_ref));
        assert!(record.active);
        assert_eq!(registry.list_owned(&owner()).await.unwrap().len(), 1);
        assert!(registry
            .get_record(&Identity::from_bytes([9u8; 32]))
            .await
            .unwrap()
            .is_none());
        assert!(registry
            .resolve_alias("nothing-here")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_concurrent_submissions_are_all_counted() {
        let registry = Arc::new(registry());
        let identity = Identity::from_bytes([3u8; 32]);
        registry
            .register(owner(), owner(), identity, None, PrivacyMode::Anonymous)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..50u8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .submit_record(
                        owner(),
                        identity,
                        ContentPointer::of(&[i]),
                        Address::ZERO,
                        true,
                        "form",
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(registry.get_record_count(&identity).await.unwrap(), 50);
        let page = registry.get_submissions(&identity, 40, 20).await.unwrap();
        assert_eq!(page.len(), 10);
        assert_eq!(registry.block_number().await, 51);
    }
}
