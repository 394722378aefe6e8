//! Registry records, calls, events and receipts.
//!
//! These are the typed ABI of the registry contract. Every type serializes
//! to JSON for the RPC gateway.

use serde::{Deserialize, Serialize};
use tether_core::{Address, ContentPointer, Identity};

/// Whether submissions to an identity may name their submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyMode {
    /// Submissions carry the submitter's address.
    Identified,
    /// Submissions must carry the zero address.
    Anonymous,
}

/// On-chain record for one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub identity: Identity,

    /// Set at registration, never changes.
    pub owner: Address,

    /// Pointer to the encrypted signing-key blob. `None` means the key was
    /// never backed up.
    pub encrypted_key_ref: Option<ContentPointer>,

    pub privacy_mode: PrivacyMode,

    /// Soft-delete flag.
    pub active: bool,

    pub alias: Option<String>,

    /// Block timestamp of registration (Unix ms).
    pub created_at: i64,

    /// Number of submissions in this identity's log.
    pub submission_count: u64,
}

impl RegistryRecord {
    pub fn has_key_backup(&self) -> bool {
        self.encrypted_key_ref.is_some()
    }
}

/// Forward alias mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRecord {
    pub alias: String,
    pub identity: Identity,
    pub owner: Address,
    pub price_paid: u64,
}

/// One entry of an identity's append-only submission log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub identity: Identity,
    pub content_ref: ContentPointer,

    /// [`Address::ZERO`] for anonymous submissions.
    pub submitter: Address,

    pub verified: bool,

    /// Free-form submission category.
    pub kind: String,

    /// Block timestamp (Unix ms).
    pub timestamp: i64,
}

/// A state-changing registry call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum RegistryCall {
    Register {
        owner: Address,
        identity: Identity,
        encrypted_key_ref: Option<ContentPointer>,
        privacy_mode: PrivacyMode,
    },
    /// Payment is the transaction value.
    RegisterAlias { identity: Identity, alias: String },
    ReleaseAlias { identity: Identity },
    SetActive { identity: Identity, active: bool },
    RotateKeyRef {
        identity: Identity,
        new_ref: ContentPointer,
    },
    SubmitRecord {
        identity: Identity,
        content_ref: ContentPointer,
        submitter: Address,
        verified: bool,
        kind: String,
    },
}

impl RegistryCall {
    /// The identity this call operates on.
    pub fn identity(&self) -> &Identity {
        match self {
            RegistryCall::Register { identity, .. }
            | RegistryCall::RegisterAlias { identity, .. }
            | RegistryCall::ReleaseAlias { identity }
            | RegistryCall::SetActive { identity, .. }
            | RegistryCall::RotateKeyRef { identity, .. }
            | RegistryCall::SubmitRecord { identity, .. } => identity,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RegistryCall::Register { .. } => "register",
            RegistryCall::RegisterAlias { .. } => "register_alias",
            RegistryCall::ReleaseAlias { .. } => "release_alias",
            RegistryCall::SetActive { .. } => "set_active",
            RegistryCall::RotateKeyRef { .. } => "rotate_key_ref",
            RegistryCall::SubmitRecord { .. } => "submit_record",
        }
    }
}

/// A call plus the account authorizing it and the value it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: Address,
    #[serde(default)]
    pub value: u64,
    pub call: RegistryCall,
}

impl Transaction {
    pub fn new(sender: Address, call: RegistryCall) -> Self {
        Self {
            sender,
            value: 0,
            call,
        }
    }

    pub fn with_value(mut self, value: u64) -> Self {
        self.value = value;
        self
    }
}

/// Events emitted by successful calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    Created {
        identity: Identity,
        owner: Address,
        privacy_mode: PrivacyMode,
    },
    AliasRegistered {
        identity: Identity,
        alias: String,
        price_paid: u64,
    },
    AliasReleased { identity: Identity, alias: String },
    StatusChanged { identity: Identity, active: bool },
    KeyRotated {
        identity: Identity,
        new_ref: ContentPointer,
    },
    RecordSubmitted {
        identity: Identity,
        index: u64,
        submitter: Address,
    },
}

/// Proof that a transaction was mined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block_number: u64,
    pub events: Vec<RegistryEvent>,
}
