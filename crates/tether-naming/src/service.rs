//! Naming service abstraction.
//!
//! A naming service stores, per identity, the highest-sequence revision it
//! has accepted and answers resolves, possibly with some lag.

use async_trait::async_trait;
use tether_core::{Identity, Revision};

use crate::error::Result;

/// Publish/resolve interface to a naming service.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait NamingService: Send + Sync {
    /// Submit a signed revision.
    ///
    /// Fails with `StaleRevision` if the service already holds this sequence
    /// or a later one for the identity.
    async fn publish(&self, revision: &Revision) -> Result<()>;

    /// The latest revision visible to this caller, or `None` if nothing has
    /// been published yet. May lag behind the latest accepted revision.
    async fn resolve(&self, identity: &Identity) -> Result<Option<Revision>>;
}

/// An in-memory naming service for tests.
///
/// Simulates eventual consistency: an accepted revision becomes visible to
/// `resolve` only after a propagation delay, measured on the tokio clock.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use tether_core::{validate_successor, ValidationError};
    use tokio::sync::RwLock;
    use tokio::time::Instant;

    use crate::error::NamingError;

    struct Published {
        visible_at: Instant,
        revision: Revision,
    }

    /// In-memory naming service.
    pub struct MemoryNamingService {
        names: RwLock<HashMap<Identity, Vec<Published>>>,
        propagation_delay: Duration,
        offline: AtomicBool,
        publish_count: AtomicUsize,
    }

    impl MemoryNamingService {
        /// A service where revisions are visible immediately.
        pub fn new() -> Self {
            Self::with_propagation_delay(Duration::ZERO)
        }

        pub fn with_propagation_delay(delay: Duration) -> Self {
            Self {
                names: RwLock::new(HashMap::new()),
                propagation_delay: delay,
                offline: AtomicBool::new(false),
                publish_count: AtomicUsize::new(0),
            }
        }

        /// Make every call fail with a network error until reset.
        pub fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }

        /// Number of accepted publishes.
        pub fn publish_count(&self) -> usize {
            self.publish_count.load(Ordering::SeqCst)
        }

        fn check_online(&self) -> Result<()> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(NamingError::Network("naming service unreachable".into()));
            }
            Ok(())
        }
    }

    impl Default for MemoryNamingService {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl NamingService for MemoryNamingService {
        async fn publish(&self, revision: &Revision) -> Result<()> {
            self.check_online()?;

            let mut names = self.names.write().await;
            let history = names.entry(*revision.identity()).or_default();
            let latest = history.last().map(|p| &p.revision);

            match validate_successor(latest, revision) {
                Ok(()) => {}
                Err(ValidationError::StaleSequence { current, got }) => {
                    return Err(NamingError::StaleRevision {
                        current,
                        attempted: got,
                    });
                }
                Err(e) => return Err(e.into()),
            }

            history.push(Published {
                visible_at: Instant::now() + self.propagation_delay,
                revision: revision.clone(),
            });
            self.publish_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn resolve(&self, identity: &Identity) -> Result<Option<Revision>> {
            self.check_online()?;

            let now = Instant::now();
            let names = self.names.read().await;
            Ok(names.get(identity).and_then(|history| {
                history
                    .iter()
                    .rev()
                    .find(|p| p.visible_at <= now)
                    .map(|p| p.revision.clone())
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryNamingService;
    use super::*;
    use crate::error::NamingError;
    use std::time::Duration;
    use tether_core::{ContentPointer, Keypair, RevisionBuilder};

    fn rev(kp: &Keypair, seq: u64) -> Revision {
        RevisionBuilder::new(seq, ContentPointer::of(&seq.to_be_bytes()))
            .sign(kp)
            .unwrap()
    }

    #[tokio::test]
    async fn test_publish_and_resolve() {
        let service = MemoryNamingService::new();
        let kp = Keypair::generate();

        assert!(service.resolve(&kp.identity()).await.unwrap().is_none());
        service.publish(&rev(&kp, 0)).await.unwrap();
        service.publish(&rev(&kp, 1)).await.unwrap();

        let resolved = service.resolve(&kp.identity()).await.unwrap().unwrap();
        assert_eq!(resolved.sequence(), 1);
        assert_eq!(service.publish_count(), 2);
    }

    #[tokio::test]
    async fn test_stale_publish_rejected() {
        let service = MemoryNamingService::new();
        let kp = Keypair::generate();
        service.publish(&rev(&kp, 0)).await.unwrap();
        service.publish(&rev(&kp, 1)).await.unwrap();

        let err = service.publish(&rev(&kp, 1)).await.unwrap_err();
        assert!(matches!(
            err,
            NamingError::StaleRevision { current: 1, attempted: 1 }
        ));
    }

    #[tokio::test]
    async fn test_first_publish_must_be_zero() {
        let service = MemoryNamingService::new();
        let kp = Keypair::generate();
        let err = service.publish(&rev(&kp, 3)).await.unwrap_err();
        assert!(matches!(err, NamingError::InvalidRevision(_)));
    }

    #[tokio::test]
    async fn test_forged_revision_rejected() {
        let service = MemoryNamingService::new();
        let kp = Keypair::generate();
        let mut forged = rev(&kp, 0);
        forged.header.value = ContentPointer::of(b"evil");
        let err = service.publish(&forged).await.unwrap_err();
        assert!(matches!(err, NamingError::InvalidRevision(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_propagation_delay() {
        let service = MemoryNamingService::with_propagation_delay(Duration::from_secs(30));
        let kp = Keypair::generate();

        service.publish(&rev(&kp, 0)).await.unwrap();
        assert!(service.resolve(&kp.identity()).await.unwrap().is_none());

        tokio::time::advance(Duration::from_secs(31)).await;
        service.publish(&rev(&kp, 1)).await.unwrap();

        // Revision 1 is accepted but not visible yet; resolve lags at 0.
        let lagging = service.resolve(&kp.identity()).await.unwrap().unwrap();
        assert_eq!(lagging.sequence(), 0);

        tokio::time::advance(Duration::from_secs(31)).await;
        let caught_up = service.resolve(&kp.identity()).await.unwrap().unwrap();
        assert_eq!(caught_up.sequence(), 1);
    }

    #[tokio::test]
    async fn test_offline() {
        let service = MemoryNamingService::new();
        service.set_offline(true);
        let err = service.resolve(&Keypair::generate().identity()).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
