//! Revision: a signed, sequence-numbered pointer update for an identity.
//!
//! A revision is immutable once signed. Moving a mutable name means signing a
//! new revision with a strictly higher sequence.

use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_bytes, signed_message};
use crate::crypto::{Blake3Hash, Ed25519Signature, Keypair};
use crate::error::CoreError;
use crate::types::{ContentPointer, Identity};

/// The current revision schema version.
pub const REVISION_VERSION: u8 = 1;

/// Everything a revision signature covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionHeader {
    /// Schema version.
    pub version: u8,

    /// The identity whose pointer this revision moves.
    pub identity: Identity,

    /// Strictly increasing per identity. The first published revision is 0.
    pub sequence: u64,

    /// The content this name points to after this revision.
    pub value: ContentPointer,

    /// Author-claimed timestamp (Unix milliseconds). Untrusted.
    pub timestamp: i64,
}

/// A header plus the identity's signature over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub header: RevisionHeader,
    pub signature: Ed25519Signature,
}

impl Revision {
    pub fn identity(&self) -> &Identity {
        &self.header.identity
    }

    pub fn sequence(&self) -> u64 {
        self.header.sequence
    }

    pub fn value(&self) -> &ContentPointer {
        &self.header.value
    }

    /// Blake3 of the canonical encoding. Distinguishes two different
    /// revisions that claim the same sequence.
    pub fn digest(&self) -> Result<Blake3Hash, CoreError> {
        Ok(Blake3Hash::hash(&canonical_bytes(self)?))
    }

    /// Check the signature against the embedded identity.
    pub fn verify_signature(&self) -> Result<(), CoreError> {
        let message = signed_message(&self.header)?;
        self.header.identity.verify(&message, &self.signature)
    }
}

/// Builder for creating revisions.
pub struct RevisionBuilder {
    sequence: u64,
    value: ContentPointer,
    timestamp: i64,
}

impl RevisionBuilder {
    pub fn new(sequence: u64, value: ContentPointer) -> Self {
        Self {
            sequence,
            value,
            timestamp: 0,
        }
    }

    pub fn timestamp(mut self, ts: i64) -> Self {
        self.timestamp = ts;
        self
    }

    /// Build and sign. The identity is the keypair's public key.
    pub fn sign(self, keypair: &Keypair) -> Result<Revision, CoreError> {
        let header = RevisionHeader {
            version: REVISION_VERSION,
            identity: keypair.identity(),
            sequence: self.sequence,
            value: self.value,
            timestamp: self.timestamp,
        };
        let signature = keypair.sign(&signed_message(&header)?);
        Ok(Revision { header, signature })
    }
}
