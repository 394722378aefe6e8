//! Multi-device key recovery.
//!
//! Given an owner address, the orchestrator finds every identity the owner
//! registered, fetches each encrypted key blob and decrypts it with a single
//! wallet signature, then stores the recovered keys on this device.
//!
//! Failures are per identity: one corrupt blob never aborts the batch.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tether_core::{now_millis, Address, ContentPointer, ErrorKind, Identity};
use tether_custody::{custody_message, CustodyError, EncryptedKeyBlob, WalletSignature, WalletSigner};
use tether_registry::{Registry, RegistryRecord};
use tether_store::{ContentStore, KeyOrigin, KeyRecord, LocalKeyStore, StoreError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Why a single identity could not be restored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RestoreError {
    /// The identity was registered without a key backup.
    #[error("no encrypted key backup registered")]
    MissingKeyRef,

    /// The blob does not open with this wallet's signature.
    #[error("key blob does not open with this wallet")]
    AuthFailure,

    /// The registry points at a blob the content store does not have.
    #[error("key blob not found")]
    BlobNotFound,

    /// The blob was sealed for a different owner.
    #[error("key blob belongs to another owner")]
    OwnerMismatch,

    /// The decrypted key does not derive the identity.
    #[error("decrypted key does not match the identity")]
    KeyMismatch,

    #[error("network error: {0}")]
    Network(String),

    /// The blob is unreadable: bad JSON, unknown version, failed integrity.
    #[error("corrupted key blob: {0}")]
    Corrupted(String),

    #[error("identity is inactive")]
    Inactive,

    /// The identity is registered to a different owner.
    #[error("identity is not owned by this address")]
    NotOwned,

    #[error("identity is not registered")]
    NotRegistered,

    /// The key was recovered but could not be saved on this device.
    #[error("local key store error: {0}")]
    LocalStore(String),
}

impl RestoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RestoreError::MissingKeyRef => ErrorKind::MissingKeyRef,
            RestoreError::AuthFailure | RestoreError::OwnerMismatch => ErrorKind::AuthFailure,
            RestoreError::BlobNotFound | RestoreError::NotRegistered => ErrorKind::NotFound,
            RestoreError::Network(_) => ErrorKind::Network,
            RestoreError::Inactive | RestoreError::NotOwned => ErrorKind::ConstraintViolation,
            RestoreError::KeyMismatch | RestoreError::Corrupted(_) | RestoreError::LocalStore(_) => {
                ErrorKind::InvalidData
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<StoreError> for RestoreError {
    fn from(e: StoreError) -> Self {
        match e.kind() {
            ErrorKind::NotFound => RestoreError::BlobNotFound,
            ErrorKind::Network => RestoreError::Network(e.to_string()),
            _ => RestoreError::Corrupted(e.to_string()),
        }
    }
}

impl From<CustodyError> for RestoreError {
    fn from(e: CustodyError) -> Self {
        match e {
            CustodyError::AuthFailure | CustodyError::Signer(_) => RestoreError::AuthFailure,
            CustodyError::OwnerMismatch { .. } => RestoreError::OwnerMismatch,
            CustodyError::KeyMismatch { .. } => RestoreError::KeyMismatch,
            other => RestoreError::Corrupted(other.to_string()),
        }
    }
}

/// Outcome for one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreResult {
    pub identity: Identity,
    pub error: Option<RestoreError>,
}

impl RestoreResult {
    fn restored(identity: Identity) -> Self {
        Self {
            identity,
            error: None,
        }
    }

    fn failed(identity: Identity, error: RestoreError) -> Self {
        Self {
            identity,
            error: Some(error),
        }
    }

    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Progress report passed to the `restore_all` callback after each identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreProgress {
    pub completed: usize,
    pub total: usize,
    pub identity: Identity,
    pub success: bool,
}

/// An identity that can be restored: active, with a key backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnedIdentity {
    pub identity: Identity,
    pub encrypted_key_ref: ContentPointer,
    pub active: bool,
}

/// Recovery overview for an owner on this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecoveryStatus {
    /// Active identities owned by the address.
    pub total: usize,
    /// Of those, identities with a key backup.
    pub available: usize,
    /// Backed-up identities whose key is not yet on this device.
    pub needing_restore: usize,
}

/// Restores signing keys from their encrypted backups.
pub struct RecoveryOrchestrator {
    registry: Arc<dyn Registry>,
    content: Arc<dyn ContentStore>,
    keys: Arc<dyn LocalKeyStore>,
    batch_size: usize,
}

impl RecoveryOrchestrator {
    pub fn new(
        registry: Arc<dyn Registry>,
        content: Arc<dyn ContentStore>,
        keys: Arc<dyn LocalKeyStore>,
        batch_size: usize,
    ) -> Self {
        Self {
            registry,
            content,
            keys,
            batch_size: batch_size.max(1),
        }
    }

    /// Active identities of `owner` that have a key backup, in registration
    /// order.
    pub async fn enumerate_owned_identities(&self, owner: &Address) -> Result<Vec<OwnedIdentity>> {
        let records = self.registry.list_owned(owner).await?;
        Ok(records
            .into_iter()
            .filter(|r| r.active)
            .filter_map(|r| {
                r.encrypted_key_ref.map(|key_ref| OwnedIdentity {
                    identity: r.identity,
                    encrypted_key_ref: key_ref,
                    active: r.active,
                })
            })
            .collect())
    }

    /// Restore every active identity of `owner`.
    ///
    /// The wallet is asked for exactly one signature, and only if at least one
    /// identity has a key backup. Returns one result per active identity, in
    /// registration order. Each restored key is saved as soon as it is
    /// recovered, so an interrupted run keeps its completed work.
    pub async fn restore_all<F>(
        &self,
        owner: &Address,
        signer: &dyn WalletSigner,
        mut on_progress: F,
    ) -> Result<Vec<RestoreResult>>
    where
        F: FnMut(&RestoreProgress) + Send,
    {
        let targets: Vec<RegistryRecord> = self
            .registry
            .list_owned(owner)
            .await?
            .into_iter()
            .filter(|r| r.active)
            .collect();
        let total = targets.len();

        let mut results: Vec<(usize, RestoreResult)> = Vec::with_capacity(total);
        let mut restorable = Vec::new();
        for (index, record) in targets.into_iter().enumerate() {
            match record.encrypted_key_ref {
                Some(key_ref) => restorable.push((index, record.identity, key_ref)),
                None => {
                    warn!(identity = %record.identity, "identity has no key backup");
                    results.push((
                        index,
                        RestoreResult::failed(record.identity, RestoreError::MissingKeyRef),
                    ));
                }
            }
        }

        let mut completed = 0;
        for (_, result) in &results {
            completed += 1;
            on_progress(&RestoreProgress {
                completed,
                total,
                identity: result.identity,
                success: false,
            });
        }

        if restorable.is_empty() {
            info!(owner = %owner, total, "nothing to restore");
            return Ok(in_order(results));
        }

        let signature = self.session_signature(owner, signer).await?;
        info!(
            owner = %owner,
            total,
            restorable = restorable.len(),
            batch_size = self.batch_size,
            "restoring identities"
        );

        let signature = &signature;
        let mut outcomes = stream::iter(restorable)
            .map(move |(index, identity, key_ref)| async move {
                let result = match self.restore_one(identity, key_ref, owner, signature).await {
                    Ok(()) => RestoreResult::restored(identity),
                    Err(e) => RestoreResult::failed(identity, e),
                };
                (index, result)
            })
            .buffer_unordered(self.batch_size);

        while let Some((index, result)) = outcomes.next().await {
            completed += 1;
            on_progress(&RestoreProgress {
                completed,
                total,
                identity: result.identity,
                success: result.success(),
            });
            results.push((index, result));
        }

        let results = in_order(results);
        let failed = results.iter().filter(|r| !r.success()).count();
        info!(owner = %owner, total, failed, "restore finished");
        Ok(results)
    }

    /// Restore one identity after checking it is registered, owned by
    /// `owner`, active and backed up. The wallet is not asked to sign when a
    /// check fails.
    pub async fn restore_single(
        &self,
        identity: &Identity,
        owner: &Address,
        signer: &dyn WalletSigner,
    ) -> Result<RestoreResult> {
        let record = match self.registry.get_record(identity).await? {
            Some(record) => record,
            None => return Ok(RestoreResult::failed(*identity, RestoreError::NotRegistered)),
        };
        if record.owner != *owner {
            return Ok(RestoreResult::failed(*identity, RestoreError::NotOwned));
        }
        if !record.active {
            return Ok(RestoreResult::failed(*identity, RestoreError::Inactive));
        }
        let Some(key_ref) = record.encrypted_key_ref else {
            return Ok(RestoreResult::failed(*identity, RestoreError::MissingKeyRef));
        };

        let signature = self.session_signature(owner, signer).await?;
        Ok(match self.restore_one(*identity, key_ref, owner, &signature).await {
            Ok(()) => RestoreResult::restored(*identity),
            Err(e) => RestoreResult::failed(*identity, e),
        })
    }

    pub async fn check_status(&self, owner: &Address) -> Result<RecoveryStatus> {
        let records = self.registry.list_owned(owner).await?;
        let mut status = RecoveryStatus::default();
        for record in records.iter().filter(|r| r.active) {
            status.total += 1;
            if !record.has_key_backup() {
                continue;
            }
            status.available += 1;
            if self.keys.load(&record.identity).await?.is_none() {
                status.needing_restore += 1;
            }
        }
        Ok(status)
    }

    async fn session_signature(
        &self,
        owner: &Address,
        signer: &dyn WalletSigner,
    ) -> Result<WalletSignature> {
        let message = custody_message(owner);
        Ok(signer.sign_message(message.as_bytes()).await?)
    }

    async fn restore_one(
        &self,
        identity: Identity,
        key_ref: ContentPointer,
        owner: &Address,
        signature: &WalletSignature,
    ) -> std::result::Result<(), RestoreError> {
        let outcome = self.fetch_and_open(identity, key_ref, owner, signature).await;
        match &outcome {
            Ok(()) => info!(identity = %identity, "restored signing key"),
            Err(e) => warn!(identity = %identity, key_ref = %key_ref, error = %e, "restore failed"),
        }
        outcome
    }

    async fn fetch_and_open(
        &self,
        identity: Identity,
        key_ref: ContentPointer,
        owner: &Address,
        signature: &WalletSignature,
    ) -> std::result::Result<(), RestoreError> {
        let bytes = self.content.get(&key_ref).await?;
        let blob = EncryptedKeyBlob::from_json(&bytes)?;
        if blob.identity != identity {
            return Err(RestoreError::KeyMismatch);
        }
        let keypair = blob.open_keypair(owner, signature)?;
        debug!(identity = %identity, "decrypted key blob");

        let record = KeyRecord::new(&keypair, KeyOrigin::Restored, now_millis());
        self.keys
            .save(&record)
            .await
            .map_err(|e| RestoreError::LocalStore(e.to_string()))
    }
}

fn in_order(mut results: Vec<(usize, RestoreResult)>) -> Vec<RestoreResult> {
    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, result)| result).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tether_core::Keypair;
    use tether_custody::LocalWallet;
    use tether_registry::{LocalRegistry, PrivacyMode};
    use tether_store::{MemoryContentStore, MemoryKeyStore};

    /// Wraps a wallet and counts signature requests.
    struct CountingWallet {
        inner: LocalWallet,
        calls: AtomicUsize,
    }

    impl CountingWallet {
        fn new(seed: u8) -> Self {
            Self {
                inner: LocalWallet::from_seed(&[seed; 32]),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WalletSigner for CountingWallet {
        fn address(&self) -> Address {
            self.inner.address()
        }

        async fn sign_message(&self, message: &[u8]) -> tether_custody::Result<WalletSignature> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.sign_message(message).await
        }
    }

    struct Setup {
        registry: Arc<LocalRegistry>,
        content: Arc<MemoryContentStore>,
        keys: Arc<MemoryKeyStore>,
        orchestrator: RecoveryOrchestrator,
    }

    fn setup(batch_size: usize) -> Setup {
        let registry = Arc::new(LocalRegistry::new());
        let content = Arc::new(MemoryContentStore::new());
        let keys = Arc::new(MemoryKeyStore::new());
        let orchestrator =
            RecoveryOrchestrator::new(registry.clone(), content.clone(), keys.clone(), batch_size);
        Setup {
            registry,
            content,
            keys,
            orchestrator,
        }
    }

    /// Register an identity for `wallet`, backed up unless `backup` is false.
    async fn register(s: &Setup, wallet: &CountingWallet, backup: bool) -> Keypair {
        let key = Keypair::generate();
        let owner = wallet.address();
        let key_ref = if backup {
            let sig = wallet
                .inner
                .sign_message(custody_message(&owner).as_bytes())
                .await
                .unwrap();
            let blob = EncryptedKeyBlob::seal_keypair(&key, owner, &sig).unwrap();
            Some(s.content.put(&blob.to_json().unwrap()).await.unwrap())
        } else {
            None
        };
        s.registry
            .register(owner, owner, key.identity(), key_ref, PrivacyMode::Identified)
            .await
            .unwrap();
        key
    }

    #[tokio::test]
    async fn test_restore_all_signs_once() {
        let s = setup(3);
        let wallet = CountingWallet::new(1);
        let mut expected = Vec::new();
        for _ in 0..7 {
            expected.push(register(&s, &wallet, true).await.identity());
        }

        let mut progress = Vec::new();
        let results = s
            .orchestrator
            .restore_all(&wallet.address(), &wallet, |p| progress.push(*p))
            .await
            .unwrap();

        assert_eq!(wallet.calls(), 1);
        assert_eq!(results.len(), 7);
        assert!(results.iter().all(RestoreResult::success));
        let restored: Vec<_> = results.iter().map(|r| r.identity).collect();
        assert_eq!(restored, expected);

        assert_eq!(progress.len(), 7);
        assert_eq!(progress.last().unwrap().completed, 7);
        for identity in &expected {
            let record = s.keys.load(identity).await.unwrap().unwrap();
            assert_eq!(record.origin, KeyOrigin::Restored);
        }
    }

    #[tokio::test]
    async fn test_missing_backup_never_fetched_or_signed() {
        let s = setup(4);
        let wallet = CountingWallet::new(2);
        let key = register(&s, &wallet, false).await;

        let results = s
            .orchestrator
            .restore_all(&wallet.address(), &wallet, |_| {})
            .await
            .unwrap();

        assert_eq!(wallet.calls(), 0);
        assert_eq!(
            results,
            vec![RestoreResult::failed(key.identity(), RestoreError::MissingKeyRef)]
        );
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let s = setup(2);
        let wallet = CountingWallet::new(3);
        let good = register(&s, &wallet, true).await;
        let evicted = register(&s, &wallet, true).await;
        let corrupted = register(&s, &wallet, true).await;
        let unbacked = register(&s, &wallet, false).await;

        let record = s.registry.get_record(&evicted.identity()).await.unwrap().unwrap();
        s.content.evict(&record.encrypted_key_ref.unwrap());
        let record = s.registry.get_record(&corrupted.identity()).await.unwrap().unwrap();
        s.content
            .overwrite(record.encrypted_key_ref.unwrap(), b"{\"version\":\"1.0\"}".to_vec());

        let results = s
            .orchestrator
            .restore_all(&wallet.address(), &wallet, |_| {})
            .await
            .unwrap();

        assert_eq!(results.len(), 4);
        assert!(results[0].success());
        assert_eq!(results[0].identity, good.identity());
        assert_eq!(results[1].error, Some(RestoreError::BlobNotFound));
        assert!(matches!(results[2].error, Some(RestoreError::Corrupted(_))));
        assert_eq!(results[3].error, Some(RestoreError::MissingKeyRef));
        assert_eq!(results[3].identity, unbacked.identity());
    }

    #[tokio::test]
    async fn test_wrong_wallet_is_auth_failure() {
        let s = setup(2);
        let owner_wallet = CountingWallet::new(4);
        register(&s, &owner_wallet, true).await;

        let impostor = CountingWallet::new(5);
        let results = s
            .orchestrator
            .restore_all(&owner_wallet.address(), &impostor, |_| {})
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].error, Some(RestoreError::AuthFailure));
        assert!(s.keys.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_identities_skipped() {
        let s = setup(2);
        let wallet = CountingWallet::new(6);
        let kept = register(&s, &wallet, true).await;
        let retired = register(&s, &wallet, true).await;
        s.registry
            .set_active(wallet.address(), retired.identity(), false)
            .await
            .unwrap();

        let owned = s
            .orchestrator
            .enumerate_owned_identities(&wallet.address())
            .await
            .unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].identity, kept.identity());

        let results = s
            .orchestrator
            .restore_all(&wallet.address(), &wallet, |_| {})
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_restore_single_checks() {
        let s = setup(2);
        let wallet = CountingWallet::new(7);
        let other = CountingWallet::new(8);
        let key = register(&s, &wallet, true).await;

        let unknown = Keypair::generate().identity();
        let result = s
            .orchestrator
            .restore_single(&unknown, &wallet.address(), &wallet)
            .await
            .unwrap();
        assert_eq!(result.error, Some(RestoreError::NotRegistered));

        let result = s
            .orchestrator
            .restore_single(&key.identity(), &other.address(), &other)
            .await
            .unwrap();
        assert_eq!(result.error, Some(RestoreError::NotOwned));
        assert_eq!(other.calls(), 0);

        let result = s
            .orchestrator
            .restore_single(&key.identity(), &wallet.address(), &wallet)
            .await
            .unwrap();
        assert!(result.success());
        assert_eq!(wallet.calls(), 1);
    }

    #[tokio::test]
    async fn test_check_status() {
        let s = setup(2);
        let wallet = CountingWallet::new(9);
        let first = register(&s, &wallet, true).await;
        register(&s, &wallet, true).await;
        register(&s, &wallet, false).await;

        s.keys
            .save(&KeyRecord::new(&first, KeyOrigin::Created, 0))
            .await
            .unwrap();

        let status = s.orchestrator.check_status(&wallet.address()).await.unwrap();
        assert_eq!(
            status,
            RecoveryStatus {
                total: 3,
                available: 2,
                needing_restore: 1,
            }
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(RestoreError::MissingKeyRef.kind(), ErrorKind::MissingKeyRef);
        assert_eq!(RestoreError::AuthFailure.kind(), ErrorKind::AuthFailure);
        assert!(RestoreError::Network("timeout".into()).is_retryable());
        assert_eq!(
            RestoreError::from(StoreError::NotFound("x".into())),
            RestoreError::BlobNotFound
        );
    }
}
