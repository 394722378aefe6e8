//! Deterministic revision vectors.
//!
//! Each vector fixes the signing seed, sequence, content and timestamp, so
//! its canonical encoding and signature are the same on every run and every
//! platform. Ed25519 signing is deterministic.

use tether_core::{canonical_bytes, ContentPointer, CoreError, Keypair, Revision, RevisionBuilder};

/// A deterministic revision.
#[derive(Debug, Clone)]
pub struct RevisionVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Seed for deterministic key generation.
    pub seed: [u8; 32],
    pub sequence: u64,
    /// Document bytes; the revision points at their content pointer.
    pub content: &'static [u8],
    pub timestamp: i64,
}

pub fn all_vectors() -> Vec<RevisionVector> {
    vec![
        RevisionVector {
            name: "first revision of a survey",
            seed: [0x42; 32],
            sequence: 0,
            content: b"{\"title\":\"Survey\"}",
            timestamp: 1_736_870_400_000,
        },
        RevisionVector {
            name: "second revision of a survey",
            seed: [0x42; 32],
            sequence: 1,
            content: b"{\"title\":\"Survey v2\"}",
            timestamp: 1_736_870_401_000,
        },
        RevisionVector {
            name: "empty document at epoch",
            seed: [0x00; 32],
            sequence: 0,
            content: b"",
            timestamp: 0,
        },
        RevisionVector {
            name: "large sequence",
            seed: [0xff; 32],
            sequence: u64::MAX,
            content: b"tail",
            timestamp: 1_900_000_000_000,
        },
    ]
}

pub fn revision_from_vector(vector: &RevisionVector) -> Result<Revision, CoreError> {
    let keypair = Keypair::from_seed(&vector.seed);
    RevisionBuilder::new(vector.sequence, ContentPointer::of(vector.content))
        .timestamp(vector.timestamp)
        .sign(&keypair)
}

/// `(name, canonical bytes hex, digest hex)` for every vector.
pub fn vector_report() -> Result<Vec<(String, String, String)>, CoreError> {
    all_vectors()
        .iter()
        .map(|v| {
            let revision = revision_from_vector(v)?;
            Ok((
                v.name.to_string(),
                hex::encode(canonical_bytes(&revision)?),
                revision.digest()?.to_hex(),
            ))
        })
        .collect()
}
