//! Revision validation: signature verification and ordering checks.

use crate::error::ValidationError;
use crate::revision::{Revision, REVISION_VERSION};

/// Validate a revision on its own: version and signature.
pub fn validate_revision(revision: &Revision) -> Result<(), ValidationError> {
    if revision.header.version != REVISION_VERSION {
        return Err(ValidationError::UnsupportedVersion(revision.header.version));
    }

    revision
        .verify_signature()
        .map_err(|_| ValidationError::SignatureFailed)
}

/// Validate `next` as the successor of `current`.
///
/// With no current revision the name is unpublished and `next` must be
/// revision 0. Otherwise `next` must belong to the same identity and carry a
/// strictly higher sequence. Sequence gaps are allowed.
pub fn validate_successor(
    current: Option<&Revision>,
    next: &Revision,
) -> Result<(), ValidationError> {
    validate_revision(next)?;

    match current {
        None => {
            if next.sequence() != 0 {
                return Err(ValidationError::InvalidInitialSequence {
                    got: next.sequence(),
                });
            }
        }
        Some(current) => {
            if current.identity() != next.identity() {
                return Err(ValidationError::IdentityMismatch {
                    expected: current.identity().to_hex(),
                    got: next.identity().to_hex(),
                });
            }
            if next.sequence() <= current.sequence() {
                return Err(ValidationError::StaleSequence {
                    current: current.sequence(),
                    got: next.sequence(),
                });
            }
        }
    }

    Ok(())
}
