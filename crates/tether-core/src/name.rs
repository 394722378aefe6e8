//! Name state: the highest revision a client has observed for an identity.
//!
//! Naming resolution is eventually consistent, so a resolver may hand back an
//! older revision than one we have already seen. `NameState` is the local
//! high-water mark that keeps reads from going backwards.

use serde::{Deserialize, Serialize};

use crate::revision::Revision;
use crate::types::{ContentPointer, Identity};

/// Lifecycle of a mutable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NameStatus {
    /// Identity exists, nothing published yet.
    Unpublished,
    /// Revision 0 is the head.
    Published,
    /// Some revision after 0 is the head.
    Updated { sequence: u64 },
}

/// Result of observing a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveResult {
    /// The revision is newer than the head and became the new head.
    Advanced,
    /// Same revision as the head.
    Duplicate,
    /// Older than the head. The head is kept.
    Stale { observed: u64 },
    /// A different revision with the head's sequence. The head is kept.
    Conflicting { sequence: u64 },
}

/// Observed head of a mutable name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameState {
    pub identity: Identity,
    pub head: Option<Revision>,
    /// Local time of the last advance (Unix ms).
    pub observed_at: i64,
}

impl NameState {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            head: None,
            observed_at: 0,
        }
    }

    pub fn status(&self) -> NameStatus {
        match &self.head {
            None => NameStatus::Unpublished,
            Some(r) if r.sequence() == 0 => NameStatus::Published,
            Some(r) => NameStatus::Updated {
                sequence: r.sequence(),
            },
        }
    }

    pub fn head_sequence(&self) -> Option<u64> {
        self.head.as_ref().map(Revision::sequence)
    }

    pub fn current_value(&self) -> Option<&ContentPointer> {
        self.head.as_ref().map(Revision::value)
    }

    /// Record a revision for this identity.
    ///
    /// The caller is expected to have validated the revision. Revisions for
    /// another identity are treated as stale and never touch the head.
    pub fn observe(&mut self, revision: &Revision, now: i64) -> ObserveResult {
        if revision.identity() != &self.identity {
            return ObserveResult::Stale {
                observed: self.head_sequence().unwrap_or(0),
            };
        }

        match &self.head {
            None => {}
            Some(head) if revision.sequence() > head.sequence() => {}
            Some(head) if revision.sequence() < head.sequence() => {
                return ObserveResult::Stale {
                    observed: head.sequence(),
                };
            }
            Some(head) => {
                return if head == revision {
                    ObserveResult::Duplicate
                } else {
                    ObserveResult::Conflicting {
                        sequence: head.sequence(),
                    }
                };
            }
        }

        self.head = Some(revision.clone());
        self.observed_at = now;
        ObserveResult::Advanced
    }
}
