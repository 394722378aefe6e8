//! The Tether facade: updateable documents with recoverable keys.
//!
//! A document is a mutable name whose value points at immutable content.
//! Creating one publishes the first revision, keeps the signing key on this
//! device, seals a backup of the key under the owner's wallet and registers
//! the identity on chain.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use tether_core::{now_millis, Address, ContentPointer, Identity, Keypair, Revision};
use tether_custody::{sign_custody_message, EncryptedKeyBlob, WalletSigner};
use tether_naming::{HttpNamingService, MemoryNamingService, MutableNames, NamingService};
use tether_registry::{
    LocalRegistry, PrivacyMode, Registry, RegistryRecord, RpcRegistry, TxReceipt,
};
use tether_store::{
    ContentStore, HttpContentStore, KeyOrigin, KeyRecord, LocalKeyStore, MemoryContentStore,
    MemoryKeyStore, SqliteContentStore, SqliteKeyStore,
};
use tracing::{debug, info};

use crate::config::{
    ConfigError, ContentBackend, KeystoreBackend, NamingBackend, RegistryBackend, TetherConfig,
};
use crate::error::{Result, TetherError};
use crate::recovery::RecoveryOrchestrator;

/// A freshly created document.
#[derive(Debug, Clone)]
pub struct CreatedDocument {
    pub identity: Identity,
    pub revision: Revision,
    /// Pointer to the encrypted signing-key blob.
    pub key_ref: ContentPointer,
    pub receipt: TxReceipt,
}

/// The current content of a document.
#[derive(Debug, Clone)]
pub struct ResolvedDocument {
    pub identity: Identity,
    pub revision: Revision,
    pub content: Bytes,
}

/// A recorded submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub content_ref: ContentPointer,
    pub receipt: TxReceipt,
}

/// Component backends of a [`Tether`] instance.
#[derive(Clone)]
pub struct Backends {
    pub content: Arc<dyn ContentStore>,
    pub naming: Arc<dyn NamingService>,
    pub registry: Arc<dyn Registry>,
    pub keys: Arc<dyn LocalKeyStore>,
}

impl Backends {
    /// Build the backends a configuration names.
    pub fn from_config(config: &TetherConfig) -> Result<Self> {
        config.validate()?;

        let content: Arc<dyn ContentStore> = match config.content.backend {
            ContentBackend::Memory => Arc::new(MemoryContentStore::new()),
            ContentBackend::Http => Arc::new(HttpContentStore::new(config.content.http_config())?),
            ContentBackend::Sqlite => {
                let path = config
                    .content
                    .sqlite_path
                    .as_ref()
                    .ok_or(ConfigError::Missing("content.sqlite_path"))?;
                Arc::new(SqliteContentStore::open(path)?)
            }
        };

        let naming: Arc<dyn NamingService> = match config.naming.backend {
            NamingBackend::Memory => Arc::new(MemoryNamingService::with_propagation_delay(
                Duration::from_millis(config.naming.propagation_delay_ms),
            )),
            NamingBackend::Http => Arc::new(HttpNamingService::new(config.naming.http_config())?),
        };

        let registry: Arc<dyn Registry> = match config.registry.backend {
            RegistryBackend::Local => Arc::new(LocalRegistry::new()),
            RegistryBackend::Rpc => Arc::new(RpcRegistry::new(config.registry.rpc_config()?)?),
        };

        let keys: Arc<dyn LocalKeyStore> = match config.keystore.backend {
            KeystoreBackend::Memory => Arc::new(MemoryKeyStore::new()),
            KeystoreBackend::Sqlite => {
                let path = config
                    .keystore
                    .path
                    .as_ref()
                    .ok_or(ConfigError::Missing("keystore.path"))?;
                Arc::new(SqliteKeyStore::open(path)?)
            }
        };

        Ok(Self {
            content,
            naming,
            registry,
            keys,
        })
    }
}

/// Unified API over content, names, registry and key custody.
pub struct Tether {
    content: Arc<dyn ContentStore>,
    names: MutableNames,
    registry: Arc<dyn Registry>,
    keys: Arc<dyn LocalKeyStore>,
    config: TetherConfig,
}

impl Tether {
    pub fn new(backends: Backends, config: TetherConfig) -> Self {
        Self {
            content: backends.content,
            names: MutableNames::new(backends.naming),
            registry: backends.registry,
            keys: backends.keys,
            config,
        }
    }

    /// Validate `config` and build the backends it names.
    pub fn from_config(config: TetherConfig) -> Result<Self> {
        let backends = Backends::from_config(&config)?;
        Ok(Self::new(backends, config))
    }

    pub fn config(&self) -> &TetherConfig {
        &self.config
    }

    pub fn content(&self) -> &Arc<dyn ContentStore> {
        &self.content
    }

    pub fn names(&self) -> &MutableNames {
        &self.names
    }

    pub fn registry(&self) -> &Arc<dyn Registry> {
        &self.registry
    }

    pub fn keys(&self) -> &Arc<dyn LocalKeyStore> {
        &self.keys
    }

    /// A recovery orchestrator sharing this instance's backends.
    pub fn recovery(&self) -> RecoveryOrchestrator {
        RecoveryOrchestrator::new(
            self.registry.clone(),
            self.content.clone(),
            self.keys.clone(),
            self.config.recovery.batch_size,
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Documents
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a document owned by the signer's wallet.
    ///
    /// The signing key is saved locally before anything is registered, so a
    /// failure after publishing leaves the key on this device.
    pub async fn create_document(
        &self,
        signer: &dyn WalletSigner,
        content: &[u8],
        privacy_mode: PrivacyMode,
    ) -> Result<CreatedDocument> {
        let owner = signer.address();
        let pointer = self.content.put(content).await?;

        let (identity, key) = self.names.create();
        let revision = self.names.publish(&key, pointer).await?;
        self.keys
            .save(&KeyRecord::new(&key, KeyOrigin::Created, now_millis()))
            .await?;

        let key_ref = self.store_key_backup(&key, signer).await?;
        let receipt = self
            .registry
            .register(owner, owner, identity, Some(key_ref), privacy_mode)
            .await?;

        info!(
            identity = %identity,
            owner = %owner,
            pointer = %pointer,
            tx = %receipt.tx_hash,
            "created document"
        );
        Ok(CreatedDocument {
            identity,
            revision,
            key_ref,
            receipt,
        })
    }

    /// Point an existing document at new content. Needs the signing key on
    /// this device.
    pub async fn update_document(&self, identity: &Identity, content: &[u8]) -> Result<Revision> {
        let key = self.local_key(identity).await?;
        let pointer = self.content.put(content).await?;
        let revision = self.names.update(&key, pointer).await?;
        info!(
            identity = %identity,
            sequence = revision.sequence(),
            pointer = %pointer,
            "updated document"
        );
        Ok(revision)
    }

    /// Resolve an alias or identity hex to the document's current content.
    pub async fn resolve_document(&self, alias_or_identity: &str) -> Result<ResolvedDocument> {
        let identity = self.registry.resolve_alias(alias_or_identity).await?;
        let revision = self.names.resolve(&identity).await?;
        let content = self.content.get(revision.value()).await?;
        debug!(
            identity = %identity,
            sequence = revision.sequence(),
            "resolved document"
        );
        Ok(ResolvedDocument {
            identity,
            revision,
            content,
        })
    }

    /// Seal the local key of `identity` again and point the registry at the
    /// new blob. Fails if this device holds no key for the identity.
    pub async fn backup_key(
        &self,
        identity: &Identity,
        signer: &dyn WalletSigner,
    ) -> Result<ContentPointer> {
        let key = self.local_key(identity).await?;
        let key_ref = self.store_key_backup(&key, signer).await?;
        self.registry
            .rotate_key_ref(signer.address(), *identity, key_ref)
            .await?;
        info!(identity = %identity, key_ref = %key_ref, "rotated key backup");
        Ok(key_ref)
    }

    /// Register `alias` for an identity owned by the signer.
    pub async fn register_alias(
        &self,
        signer: &dyn WalletSigner,
        identity: &Identity,
        alias: &str,
        payment: u64,
    ) -> Result<TxReceipt> {
        Ok(self
            .registry
            .register_alias(signer.address(), *identity, alias, payment)
            .await?)
    }

    pub async fn release_alias(
        &self,
        signer: &dyn WalletSigner,
        identity: &Identity,
    ) -> Result<TxReceipt> {
        Ok(self
            .registry
            .release_alias(signer.address(), *identity)
            .await?)
    }

    pub async fn set_active(
        &self,
        signer: &dyn WalletSigner,
        identity: &Identity,
        active: bool,
    ) -> Result<TxReceipt> {
        Ok(self
            .registry
            .set_active(signer.address(), *identity, active)
            .await?)
    }

    pub async fn record(&self, identity: &Identity) -> Result<Option<RegistryRecord>> {
        Ok(self.registry.get_record(identity).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Submissions
    // ─────────────────────────────────────────────────────────────────────────

    /// Store `content` and append it to the identity's submission log.
    ///
    /// Anonymous identities only accept the zero address as `submitter`.
    pub async fn submit(
        &self,
        identity: &Identity,
        content: &[u8],
        submitter: Address,
        verified: bool,
        kind: &str,
    ) -> Result<Submission> {
        let content_ref = self.content.put(content).await?;
        let receipt = self
            .registry
            .submit_record(submitter, *identity, content_ref, submitter, verified, kind)
            .await?;
        debug!(identity = %identity, content_ref = %content_ref, kind, "recorded submission");
        Ok(Submission {
            content_ref,
            receipt,
        })
    }

    /// Submission counts for many identities, queried with bounded
    /// concurrency. Results follow the order of `identities`.
    pub async fn submission_counts(&self, identities: &[Identity]) -> Result<Vec<(Identity, u64)>> {
        let registry = &self.registry;
        stream::iter(identities.iter().copied())
            .map(|identity| async move {
                let count = registry.get_record_count(&identity).await?;
                Ok::<_, TetherError>((identity, count))
            })
            .buffered(self.config.registry.read_concurrency.max(1))
            .try_collect()
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    async fn local_key(&self, identity: &Identity) -> Result<Keypair> {
        self.keys
            .load(identity)
            .await?
            .map(|record| record.keypair())
            .ok_or(TetherError::MissingLocalKey(*identity))
    }

    async fn store_key_backup(
        &self,
        key: &Keypair,
        signer: &dyn WalletSigner,
    ) -> Result<ContentPointer> {
        let signature = sign_custody_message(signer).await?;
        let blob = EncryptedKeyBlob::seal_keypair(key, signer.address(), &signature)?;
        Ok(self.content.put(&blob.to_json()?).await?)
    }
}
