//! Mutable-name client: create, publish, update, resolve.
//!
//! Wraps a [`NamingService`] with a per-identity high-water mark so reads
//! from this client never go backwards, even when the service lags.

use std::collections::HashMap;
use std::sync::Arc;

use tether_core::{
    now_millis, validate_revision, ContentPointer, Identity, Keypair, NameState, NameStatus,
    ObserveResult, Revision, RevisionBuilder,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{NamingError, Result};
use crate::service::NamingService;

/// Client for keypair-addressed, monotonically versioned pointers.
///
/// # Concurrency
///
/// One logical writer per identity. Two writers that sign on the same
/// resolved head race; the loser gets `NamingError::StaleRevision` at
/// publish time and must re-resolve. Nothing here prevents the loser from
/// then overwriting the winner's value.
pub struct MutableNames {
    service: Arc<dyn NamingService>,
    observed: RwLock<HashMap<Identity, NameState>>,
}

impl MutableNames {
    pub fn new(service: Arc<dyn NamingService>) -> Self {
        Self {
            service,
            observed: RwLock::new(HashMap::new()),
        }
    }

    pub fn service(&self) -> &Arc<dyn NamingService> {
        &self.service
    }

    /// Generate a fresh identity and its signing key. Nothing is published.
    pub fn create(&self) -> (Identity, Keypair) {
        let keypair = Keypair::generate();
        (keypair.identity(), keypair)
    }

    /// Publish revision 0 pointing at `value`.
    pub async fn publish(&self, key: &Keypair, value: ContentPointer) -> Result<Revision> {
        let revision = RevisionBuilder::new(0, value)
            .timestamp(now_millis())
            .sign(key)?;
        self.service.publish(&revision).await?;
        self.observe(&revision).await;

        info!(identity = %revision.identity(), pointer = %value, "published name");
        Ok(revision)
    }

    /// Move the name to `value` with the next sequence number.
    ///
    /// Resolves first. If the name was never published, or resolution
    /// fails, the error is returned and nothing is signed.
    pub async fn update(&self, key: &Keypair, value: ContentPointer) -> Result<Revision> {
        let identity = key.identity();
        let current = self.resolve(&identity).await?;
        let sequence = current
            .sequence()
            .checked_add(1)
            .ok_or_else(|| NamingError::SequenceExhausted(identity.to_hex()))?;

        let revision = RevisionBuilder::new(sequence, value)
            .timestamp(now_millis())
            .sign(key)?;
        self.service.publish(&revision).await?;
        self.observe(&revision).await;

        info!(
            identity = %identity,
            sequence = revision.sequence(),
            pointer = %value,
            "updated name"
        );
        Ok(revision)
    }

    /// The latest revision known for `identity`.
    ///
    /// Returns the service's answer unless this client has already observed
    /// a higher sequence, in which case the observed revision is returned.
    /// `NotFound` if nothing has ever been published or observed.
    pub async fn resolve(&self, identity: &Identity) -> Result<Revision> {
        if let Some(revision) = self.service.resolve(identity).await? {
            if revision.identity() != identity {
                return Err(NamingError::InvalidRevision(
                    tether_core::ValidationError::IdentityMismatch {
                        expected: identity.to_hex(),
                        got: revision.identity().to_hex(),
                    },
                ));
            }
            validate_revision(&revision)?;
            self.observe(&revision).await;
        }

        self.observed
            .read()
            .await
            .get(identity)
            .and_then(|state| state.head.clone())
            .ok_or_else(|| NamingError::NotFound(identity.to_hex()))
    }

    /// Lifecycle state as seen by this client.
    pub async fn status(&self, identity: &Identity) -> NameStatus {
        self.observed
            .read()
            .await
            .get(identity)
            .map(NameState::status)
            .unwrap_or(NameStatus::Unpublished)
    }

    /// Snapshot of what this client has observed for `identity`.
    pub async fn observed(&self, identity: &Identity) -> Option<NameState> {
        self.observed.read().await.get(identity).cloned()
    }

    async fn observe(&self, revision: &Revision) {
        let mut observed = self.observed.write().await;
        let state = observed
            .entry(*revision.identity())
            .or_insert_with(|| NameState::new(*revision.identity()));

        match state.observe(revision, now_millis()) {
            ObserveResult::Advanced => {
                debug!(
                    identity = %revision.identity(),
                    sequence = revision.sequence(),
                    "observed new head"
                );
            }
            ObserveResult::Duplicate => {}
            ObserveResult::Stale { observed } => {
                debug!(
                    identity = %revision.identity(),
                    resolved = revision.sequence(),
                    observed,
                    "resolver is behind, keeping observed head"
                );
            }
            ObserveResult::Conflicting { sequence } => {
                warn!(
                    identity = %revision.identity(),
                    sequence,
                    "conflicting revisions at the same sequence"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::memory::MemoryNamingService;
    use std::time::Duration;

    fn names_with(service: MemoryNamingService) -> (Arc<MemoryNamingService>, MutableNames) {
        let service = Arc::new(service);
        let names = MutableNames::new(service.clone());
        (service, names)
    }

    #[tokio::test]
    async fn test_create_publish_update_resolve() {
        let (_, names) = names_with(MemoryNamingService::new());
        let (identity, key) = names.create();
        assert_eq!(names.status(&identity).await, NameStatus::Unpublished);

        let v0 = ContentPointer::of(b"v0");
        let r0 = names.publish(&key, v0).await.unwrap();
        assert_eq!(r0.sequence(), 0);
        assert_eq!(names.status(&identity).await, NameStatus::Published);

        let v1 = ContentPointer::of(b"v1");
        let v2 = ContentPointer::of(b"v2");
        names.update(&key, v1).await.unwrap();
        let r2 = names.update(&key, v2).await.unwrap();
        assert_eq!(r2.sequence(), 2);

        let resolved = names.resolve(&identity).await.unwrap();
        assert_eq!(resolved.value(), &v2);
        assert_eq!(
            names.status(&identity).await,
            NameStatus::Updated { sequence: 2 }
        );
    }

    #[tokio::test]
    async fn test_update_unpublished_is_not_found() {
        let (service, names) = names_with(MemoryNamingService::new());
        let (_, key) = names.create();

        let err = names
            .update(&key, ContentPointer::of(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, NamingError::NotFound(_)));
        assert_eq!(service.publish_count(), 0);
    }

    #[tokio::test]
    async fn test_update_surfaces_resolve_failure() {
        let (service, names) = names_with(MemoryNamingService::new());
        let (_, key) = names.create();
        names.publish(&key, ContentPointer::of(b"v0")).await.unwrap();

        service.set_offline(true);
        let err = names
            .update(&key, ContentPointer::of(b"v1"))
            .await
            .unwrap_err();
        assert!(matches!(err, NamingError::Network(_)));

        service.set_offline(false);
        assert_eq!(service.publish_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_never_goes_backwards() {
        let (service, names) =
            names_with(MemoryNamingService::with_propagation_delay(Duration::from_secs(60)));
        let (identity, key) = names.create();

        names.publish(&key, ContentPointer::of(b"v0")).await.unwrap();
        names.update(&key, ContentPointer::of(b"v1")).await.unwrap();
        let r2 = names.update(&key, ContentPointer::of(b"v2")).await.unwrap();

        // Service still shows nothing; the client serves what it has seen.
        assert!(service.resolve(&identity).await.unwrap().is_none());
        assert_eq!(names.resolve(&identity).await.unwrap(), r2);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(names.resolve(&identity).await.unwrap(), r2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_client_sees_update_eventually() {
        let service = Arc::new(MemoryNamingService::with_propagation_delay(
            Duration::from_secs(30),
        ));
        let writer = MutableNames::new(service.clone());
        let reader = MutableNames::new(service.clone());
        let (identity, key) = writer.create();

        writer.publish(&key, ContentPointer::of(b"v0")).await.unwrap();
        assert!(matches!(
            reader.resolve(&identity).await,
            Err(NamingError::NotFound(_))
        ));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(reader.resolve(&identity).await.unwrap().sequence(), 0);
    }

    #[tokio::test]
    async fn test_racing_writers_get_stale_revision() {
        let service = Arc::new(MemoryNamingService::new());
        let device_a = MutableNames::new(service.clone());
        let device_b = MutableNames::new(service.clone());
        let (identity, key) = device_a.create();

        device_a.publish(&key, ContentPointer::of(b"v0")).await.unwrap();
        device_b.resolve(&identity).await.unwrap();

        // Device B signs seq 1 from its resolve, but A wins the race first.
        let stale = RevisionBuilder::new(1, ContentPointer::of(b"from-b"))
            .sign(&key)
            .unwrap();
        device_a.update(&key, ContentPointer::of(b"from-a")).await.unwrap();

        let err = service.publish(&stale).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, NamingError::StaleRevision { .. }));

        // Re-resolve and retry succeeds.
        let r = device_b
            .update(&key, ContentPointer::of(b"from-b"))
            .await
            .unwrap();
        assert_eq!(r.sequence(), 2);
    }

    #[tokio::test]
    async fn test_update_at_max_sequence_signs_nothing() {
        let (service, names) = names_with(MemoryNamingService::new());
        let (identity, key) = names.create();
        names.publish(&key, ContentPointer::of(b"v0")).await.unwrap();

        let last = RevisionBuilder::new(u64::MAX, ContentPointer::of(b"last"))
            .sign(&key)
            .unwrap();
        service.publish(&last).await.unwrap();

        let err = names
            .update(&key, ContentPointer::of(b"after"))
            .await
            .unwrap_err();
        assert!(matches!(err, NamingError::SequenceExhausted(_)));
        assert!(!err.is_retryable());
        assert_eq!(service.publish_count(), 2);
        assert_eq!(names.resolve(&identity).await.unwrap(), last);
    }

    #[tokio::test]
    async fn test_publish_twice_is_stale() {
        let (_, names) = names_with(MemoryNamingService::new());
        let (_, key) = names.create();
        names.publish(&key, ContentPointer::of(b"a")).await.unwrap();
        let err = names
            .publish(&key, ContentPointer::of(b"b"))
            .await
            .unwrap_err();
        assert!(matches!(err, NamingError::StaleRevision { .. }));
    }
}
