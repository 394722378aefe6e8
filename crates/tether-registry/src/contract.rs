//! The registry contract as a pure state machine.
//!
//! [`RegistryContract::apply`] executes one transaction. Every check runs
//! before the first mutation, so a rejected call leaves the state exactly as
//! it was.

use std::collections::HashMap;

use tether_core::{Address, ContentPointer, Identity};

use crate::error::ContractError;
use crate::types::{
    AliasRecord, PrivacyMode, RegistryCall, RegistryEvent, RegistryRecord, SubmissionRecord,
    Transaction,
};

/// Default price of an alias, in the chain's smallest unit.
pub const DEFAULT_ALIAS_PRICE: u64 = 10_000_000_000_000_000;

pub const ALIAS_MIN_LEN: usize = 3;
pub const ALIAS_MAX_LEN: usize = 63;

type ContractResult<T> = std::result::Result<T, ContractError>;

/// Check alias syntax: 3 to 63 chars of `[a-z0-9-]`, no leading or trailing `-`.
pub fn validate_alias(alias: &str) -> ContractResult<()> {
    let valid = (ALIAS_MIN_LEN..=ALIAS_MAX_LEN).contains(&alias.len())
        && alias
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !alias.starts_with('-')
        && !alias.ends_with('-');

    if valid {
        Ok(())
    } else {
        Err(ContractError::InvalidAlias {
            alias: alias.to_string(),
        })
    }
}

/// Registry state.
#[derive(Debug, Clone)]
pub struct RegistryContract {
    records: HashMap<Identity, RegistryRecord>,

    /// alias -> forward record.
    aliases: HashMap<String, AliasRecord>,

    /// owner -> identities in registration order.
    by_owner: HashMap<Address, Vec<Identity>>,

    /// identity -> append-only submission log.
    submissions: HashMap<Identity, Vec<SubmissionRecord>>,

    alias_price: u64,
}

impl Default for RegistryContract {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryContract {
    pub fn new() -> Self {
        Self::with_alias_price(DEFAULT_ALIAS_PRICE)
    }

    pub fn with_alias_price(alias_price: u64) -> Self {
        Self {
            records: HashMap::new(),
            aliases: HashMap::new(),
            by_owner: HashMap::new(),
            submissions: HashMap::new(),
            alias_price,
        }
    }

    pub fn alias_price(&self) -> u64 {
        self.alias_price
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Execute a transaction at block time `timestamp`.
    pub fn apply(
        &mut self,
        tx: &Transaction,
        timestamp: i64,
    ) -> ContractResult<Vec<RegistryEvent>> {
        match &tx.call {
            RegistryCall::Register {
                owner,
                identity,
                encrypted_key_ref,
                privacy_mode,
            } => self.register(*owner, *identity, *encrypted_key_ref, *privacy_mode, timestamp),
            RegistryCall::RegisterAlias { identity, alias } => {
                self.register_alias(&tx.sender, identity, alias, tx.value)
            }
            RegistryCall::ReleaseAlias { identity } => self.release_alias(&tx.sender, identity),
            RegistryCall::SetActive { identity, active } => {
                self.set_active(&tx.sender, identity, *active)
            }
            RegistryCall::RotateKeyRef { identity, new_ref } => {
                self.rotate_key_ref(&tx.sender, identity, *new_ref)
            }
            RegistryCall::SubmitRecord {
                identity,
                content_ref,
                submitter,
                verified,
                kind,
            } => self.submit_record(
                identity,
                *content_ref,
                *submitter,
                *verified,
                kind,
                timestamp,
            ),
        }
    }

    fn register(
        &mut self,
        owner: Address,
        identity: Identity,
        encrypted_key_ref: Option<ContentPointer>,
        privacy_mode: PrivacyMode,
        timestamp: i64,
    ) -> ContractResult<Vec<RegistryEvent>> {
        if owner.is_zero() {
            return Err(ContractError::ZeroOwner);
        }
        if self.records.contains_key(&identity) {
            return Err(ContractError::AlreadyRegistered { identity });
        }

        self.records.insert(
            identity,
            RegistryRecord {
                identity,
                owner,
                encrypted_key_ref,
                privacy_mode,
                active: true,
                alias: None,
                created_at: timestamp,
                submission_count: 0,
            },
        );
        self.by_owner.entry(owner).or_default().push(identity);

        Ok(vec![RegistryEvent::Created {
            identity,
            owner,
            privacy_mode,
        }])
    }

    fn register_alias(
        &mut self,
        sender: &Address,
        identity: &Identity,
        alias: &str,
        payment: u64,
    ) -> ContractResult<Vec<RegistryEvent>> {
        let record = self.owned_record(sender, identity)?;
        if !record.active {
            return Err(ContractError::Inactive {
                identity: *identity,
            });
        }
        validate_alias(alias)?;
        if let Some(existing) = self.aliases.get(alias) {
            if existing.identity != *identity {
                return Err(ContractError::AliasTaken {
                    alias: alias.to_string(),
                });
            }
        }
        if payment < self.alias_price {
            return Err(ContractError::InsufficientPayment {
                required: self.alias_price,
                paid: payment,
            });
        }

        let owner = record.owner;
        let previous = record.alias.clone();
        let mut events = Vec::with_capacity(2);

        if let Some(previous) = previous {
            self.aliases.remove(&previous);
            events.push(RegistryEvent::AliasReleased {
                identity: *identity,
                alias: previous,
            });
        }

        self.aliases.insert(
            alias.to_string(),
            AliasRecord {
                alias: alias.to_string(),
                identity: *identity,
                owner,
                price_paid: payment,
            },
        );
        if let Some(record) = self.records.get_mut(identity) {
            record.alias = Some(alias.to_string());
        }
        events.push(RegistryEvent::AliasRegistered {
            identity: *identity,
            alias: alias.to_string(),
            price_paid: payment,
        });

        Ok(events)
    }

    fn release_alias(
        &mut self,
        sender: &Address,
        identity: &Identity,
    ) -> ContractResult<Vec<RegistryEvent>> {
        let record = self.owned_record(sender, identity)?;
        let alias = record.alias.clone().ok_or(ContractError::NoAlias {
            identity: *identity,
        })?;

        self.aliases.remove(&alias);
        if let Some(record) = self.records.get_mut(identity) {
            record.alias = None;
        }

        Ok(vec![RegistryEvent::AliasReleased {
            identity: *identity,
            alias,
        }])
    }

    fn set_active(
        &mut self,
        sender: &Address,
        identity: &Identity,
        active: bool,
    ) -> ContractResult<Vec<RegistryEvent>> {
        self.owned_record(sender, identity)?;
        if let Some(record) = self.records.get_mut(identity) {
            record.active = active;
        }
        Ok(vec![RegistryEvent::StatusChanged {
            identity: *identity,
            active,
        }])
    }

    fn rotate_key_ref(
        &mut self,
        sender: &Address,
        identity: &Identity,
        new_ref: ContentPointer,
    ) -> ContractResult<Vec<RegistryEvent>> {
        self.owned_record(sender, identity)?;
        if let Some(record) = self.records.get_mut(identity) {
            record.encrypted_key_ref = Some(new_ref);
        }
        Ok(vec![RegistryEvent::KeyRotated {
            identity: *identity,
            new_ref,
        }])
    }

    fn submit_record(
        &mut self,
        identity: &Identity,
        content_ref: ContentPointer,
        submitter: Address,
        verified: bool,
        kind: &str,
        timestamp: i64,
    ) -> ContractResult<Vec<RegistryEvent>> {
        let record = self.existing_record(identity)?;
        if !record.active {
            return Err(ContractError::Inactive {
                identity: *identity,
            });
        }
        if record.privacy_mode == PrivacyMode::Anonymous && !submitter.is_zero() {
            return Err(ContractError::AnonymousSubmitter {
                identity: *identity,
            });
        }

        let index = record.submission_count;
        self.submissions
            .entry(*identity)
            .or_default()
            .push(SubmissionRecord {
                identity: *identity,
                content_ref,
                submitter,
                verified,
                kind: kind.to_string(),
                timestamp,
            });
        if let Some(record) = self.records.get_mut(identity) {
            record.submission_count += 1;
        }

        Ok(vec![RegistryEvent::RecordSubmitted {
            identity: *identity,
            index,
            submitter,
        }])
    }

    fn existing_record(&self, identity: &Identity) -> ContractResult<&RegistryRecord> {
        self.records
            .get(identity)
            .ok_or(ContractError::UnknownIdentity {
                identity: *identity,
            })
    }

    fn owned_record(
        &self,
        sender: &Address,
        identity: &Identity,
    ) -> ContractResult<&RegistryRecord> {
        let record = self.existing_record(identity)?;
        if record.owner != *sender {
            return Err(ContractError::NotOwner {
                identity: *identity,
                sender: *sender,
            });
        }
        Ok(record)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    pub fn record(&self, identity: &Identity) -> Option<&RegistryRecord> {
        self.records.get(identity)
    }

    pub fn alias(&self, alias: &str) -> Option<&AliasRecord> {
        self.aliases.get(alias)
    }

    /// Resolve a registered identity (hex) or an alias to an identity.
    ///
    /// Direct identities win over aliases.
    pub fn resolve_alias(&self, alias_or_identity: &str) -> ContractResult<Identity> {
        if let Ok(identity) = Identity::from_hex(alias_or_identity) {
            if self.records.contains_key(&identity) {
                return Ok(identity);
            }
        }
        self.aliases
            .get(alias_or_identity)
            .map(|a| a.identity)
            .ok_or_else(|| ContractError::UnknownAlias {
                alias: alias_or_identity.to_string(),
            })
    }

    pub fn record_count(&self, identity: &Identity) -> ContractResult<u64> {
        self.existing_record(identity).map(|r| r.submission_count)
    }

    /// Every record owned by `owner`, in registration order.
    pub fn list_owned(&self, owner: &Address) -> Vec<RegistryRecord> {
        self.by_owner
            .get(owner)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.records.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn submissions(
        &self,
        identity: &Identity,
        offset: u64,
        limit: u64,
    ) -> ContractResult<Vec<SubmissionRecord>> {
        self.existing_record(identity)?;
        Ok(self
            .submissions
            .get(identity)
            .map(|log| {
                log.iter()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
