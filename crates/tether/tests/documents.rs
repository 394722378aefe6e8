//! Document lifecycle across devices: create, update, resolve, aliases,
//! submissions.

use std::time::Duration;

use tether::custody::WalletSigner;
use tether::registry::{PrivacyMode, DEFAULT_ALIAS_PRICE};
use tether::{Backends, ErrorKind, Tether, TetherConfig};
use tether_testkit::{wallets, TestBackends};

fn tether_for(backends: &TestBackends) -> Tether {
    Tether::new(
        Backends {
            content: backends.content.clone(),
            naming: backends.naming.clone(),
            registry: backends.registry.clone(),
            keys: backends.keys.clone(),
        },
        TetherConfig::default(),
    )
}

#[tokio::test]
async fn test_update_then_resolve_returns_latest() {
    let laptop = TestBackends::new();
    let phone = laptop.device();
    let (a, b) = (tether_for(&laptop), tether_for(&phone));
    let wallet = &wallets(1)[0];

    let doc = a
        .create_document(wallet, b"v1", PrivacyMode::Identified)
        .await
        .unwrap();
    a.update_document(&doc.identity, b"v2").await.unwrap();
    a.update_document(&doc.identity, b"v3").await.unwrap();

    let id = doc.identity.to_hex();
    for t in [&a, &b] {
        let resolved = t.resolve_document(&id).await.unwrap();
        assert_eq!(&resolved.content[..], b"v3");
        assert_eq!(resolved.revision.sequence(), 2);
    }
}

#[tokio::test(start_paused = true)]
async fn test_lagging_naming_never_goes_backwards() {
    let laptop = TestBackends::with_propagation_delay(Duration::from_secs(5));
    let phone = laptop.device();
    let (a, b) = (tether_for(&laptop), tether_for(&phone));
    let wallet = &wallets(1)[0];

    let doc = a
        .create_document(wallet, b"v1", PrivacyMode::Identified)
        .await
        .unwrap();
    let id = doc.identity.to_hex();

    // Not yet propagated.
    let err = b.resolve_document(&id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    tokio::time::advance(Duration::from_secs(6)).await;
    assert_eq!(&b.resolve_document(&id).await.unwrap().content[..], b"v1");

    a.update_document(&doc.identity, b"v2").await.unwrap();
    // The writer sees its own update at once; the reader keeps v1.
    assert_eq!(&a.resolve_document(&id).await.unwrap().content[..], b"v2");
    assert_eq!(&b.resolve_document(&id).await.unwrap().content[..], b"v1");

    tokio::time::advance(Duration::from_secs(6)).await;
    for _ in 0..3 {
        let resolved = b.resolve_document(&id).await.unwrap();
        assert_eq!(&resolved.content[..], b"v2");
        assert_eq!(resolved.revision.sequence(), 1);
    }
}

#[tokio::test]
async fn test_update_needs_local_key() {
    let laptop = TestBackends::new();
    let phone = laptop.device();
    let wallet = &wallets(1)[0];

    let doc = tether_for(&laptop)
        .create_document(wallet, b"v1", PrivacyMode::Identified)
        .await
        .unwrap();

    let err = tether_for(&phone)
        .update_document(&doc.identity, b"v2")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_alias_is_exclusive_until_released() {
    let backends = TestBackends::new();
    let t = tether_for(&backends);
    let ws = wallets(2);

    let first = t
        .create_document(&ws[0], b"first", PrivacyMode::Identified)
        .await
        .unwrap();
    let second = t
        .create_document(&ws[1], b"second", PrivacyMode::Identified)
        .await
        .unwrap();

    t.register_alias(&ws[0], &first.identity, "team-survey", DEFAULT_ALIAS_PRICE)
        .await
        .unwrap();
    assert_eq!(
        t.resolve_document("team-survey").await.unwrap().identity,
        first.identity
    );

    let err = t
        .register_alias(&ws[1], &second.identity, "team-survey", DEFAULT_ALIAS_PRICE)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    t.release_alias(&ws[0], &first.identity).await.unwrap();
    t.register_alias(&ws[1], &second.identity, "team-survey", DEFAULT_ALIAS_PRICE)
        .await
        .unwrap();
    assert_eq!(
        t.resolve_document("team-survey").await.unwrap().identity,
        second.identity
    );
}

#[tokio::test]
async fn test_alias_requires_payment_and_ownership() {
    let backends = TestBackends::new();
    let t = tether_for(&backends);
    let ws = wallets(2);
    let doc = t
        .create_document(&ws[0], b"doc", PrivacyMode::Identified)
        .await
        .unwrap();

    let err = t
        .register_alias(&ws[0], &doc.identity, "cheap", DEFAULT_ALIAS_PRICE - 1)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

    let err = t
        .register_alias(&ws[1], &doc.identity, "stolen", DEFAULT_ALIAS_PRICE)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
}

#[tokio::test]
async fn test_register_twice_is_conflict() {
    let backends = TestBackends::new();
    let t = tether_for(&backends);
    let wallet = &wallets(1)[0];
    let doc = t
        .create_document(wallet, b"doc", PrivacyMode::Identified)
        .await
        .unwrap();
    let before = t.record(&doc.identity).await.unwrap();

    let err = t
        .registry()
        .register(
            wallet.address(),
            wallet.address(),
            doc.identity,
            None,
            PrivacyMode::Anonymous,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(t.record(&doc.identity).await.unwrap(), before);
}

#[tokio::test]
async fn test_inactive_document_rejects_submissions() {
    let backends = TestBackends::new();
    let t = tether_for(&backends);
    let wallet = &wallets(1)[0];
    let doc = t
        .create_document(wallet, b"form", PrivacyMode::Identified)
        .await
        .unwrap();

    t.submit(&doc.identity, b"a1", wallet.address(), true, "response")
        .await
        .unwrap();
    t.set_active(wallet, &doc.identity, false).await.unwrap();

    let err = t
        .submit(&doc.identity, b"a2", wallet.address(), true, "response")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    assert_eq!(
        t.submission_counts(&[doc.identity]).await.unwrap(),
        vec![(doc.identity, 1)]
    );
}
