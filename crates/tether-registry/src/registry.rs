//! Registry binding abstraction.

use async_trait::async_trait;
use tether_core::{Address, ContentPointer, Identity};

use crate::error::Result;
use crate::types::{
    PrivacyMode, RegistryCall, RegistryRecord, SubmissionRecord, Transaction, TxReceipt,
};

/// Async interface to a deployed registry.
///
/// `submit` returns only once the transaction is confirmed; a receipt is
/// proof the write is durable. Reads never change state.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Send a transaction and wait for confirmation.
    async fn submit(&self, tx: Transaction) -> Result<TxReceipt>;

    async fn get_record(&self, identity: &Identity) -> Result<Option<RegistryRecord>>;

    /// Resolve a registered identity (hex) or an alias. `NotFound` otherwise.
    async fn resolve_alias(&self, alias_or_identity: &str) -> Result<Identity>;

    /// Number of submissions for `identity`, read from a stored counter.
    async fn get_record_count(&self, identity: &Identity) -> Result<u64>;

    /// Every record owned by `owner`, in registration order.
    async fn list_owned(&self, owner: &Address) -> Result<Vec<RegistryRecord>>;

    async fn get_submissions(
        &self,
        identity: &Identity,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<SubmissionRecord>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Call helpers
    // ─────────────────────────────────────────────────────────────────────────

    async fn register(
        &self,
        sender: Address,
        owner: Address,
        identity: Identity,
        encrypted_key_ref: Option<ContentPointer>,
        privacy_mode: PrivacyMode,
    ) -> Result<TxReceipt> {
        let call = RegistryCall::Register {
            owner,
            identity,
            encrypted_key_ref,
            privacy_mode,
        };
        self.submit(Transaction::new(sender, call)).await
    }

    async fn register_alias(
        &self,
        sender: Address,
        identity: Identity,
        alias: &str,
        payment: u64,
    ) -> Result<TxReceipt> {
        let call = RegistryCall::RegisterAlias {
            identity,
            alias: alias.to_string(),
        };
        self.submit(Transaction::new(sender, call).with_value(payment))
            .await
    }

    async fn release_alias(&self, sender: Address, identity: Identity) -> Result<TxReceipt> {
        self.submit(Transaction::new(
            sender,
            RegistryCall::ReleaseAlias { identity },
        ))
        .await
    }

    async fn set_active(
        &self,
        sender: Address,
        identity: Identity,
        active: bool,
    ) -> Result<TxReceipt> {
        self.submit(Transaction::new(
            sender,
            RegistryCall::SetActive { identity, active },
        ))
        .await
    }

    async fn rotate_key_ref(
        &self,
        sender: Address,
        identity: Identity,
        new_ref: ContentPointer,
    ) -> Result<TxReceipt> {
        self.submit(Transaction::new(
            sender,
            RegistryCall::RotateKeyRef { identity, new_ref },
        ))
        .await
    }

    async fn submit_record(
        &self,
        sender: Address,
        identity: Identity,
        content_ref: ContentPointer,
        submitter: Address,
        verified: bool,
        kind: &str,
    ) -> Result<TxReceipt> {
        let call = RegistryCall::SubmitRecord {
            identity,
            content_ref,
            submitter,
            verified,
            kind: kind.to_string(),
        };
        self.submit(Transaction::new(sender, call)).await
    }
}
