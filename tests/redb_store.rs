// tests/redb_store.rs
//! Engine state on the redb backend survives a restart.

mod common;
use common::config_with;
use shadowchat::clock::ManualClock;
use shadowchat::engine::Engine;
use shadowchat::matching::{Pool, SearchOutcome};
use shadowchat::state::UserId;
use shadowchat::store::{RedbStore, SharedStore, Store};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn open(path: &Path, clock: &Arc<ManualClock>) -> (SharedStore, Engine) {
    let store: SharedStore = Arc::new(RedbStore::open(path, clock.clone()).expect("open redb"));
    let engine = Engine::new(store.clone(), clock.clone(), &config_with(""));
    (store, engine)
}

#[tokio::test]
async fn state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shadowchat.redb");
    let clock = Arc::new(ManualClock::default());

    {
        let (_store, engine) = open(&path, &clock);
        engine.search(UserId(1), None).await.unwrap();
        engine.search(UserId(2), None).await.unwrap();
        engine.search(UserId(3), None).await.unwrap();
        engine.report(UserId(2)).await.unwrap();
        engine.admin().ban(UserId(9), "spam").await.unwrap();
        engine.set_interests(UserId(3), &["music"]).await.unwrap();
    }

    let (_store, engine) = open(&path, &clock);
    assert_eq!(
        engine.sessions().partner_of(UserId(1)).await.unwrap(),
        Some(UserId(2))
    );
    assert_eq!(engine.trust().score(UserId(1)).await.unwrap(), 40);
    assert_eq!(engine.moderation().report_count(UserId(1)).await.unwrap(), 1);
    assert_eq!(
        engine.appeal(UserId(9)).await.unwrap().as_deref(),
        Some("spam")
    );
    assert_eq!(
        engine.matcher().pools().waiting(Pool::General).await.unwrap(),
        1
    );

    // The waiting user is still there to be matched.
    clock.advance(Duration::from_secs(3));
    match engine.search(UserId(4), None).await.unwrap() {
        SearchOutcome::Matched { partner, .. } => assert_eq!(partner, UserId(3)),
        other => panic!("expected a match, got {other:?}"),
    }
}

#[tokio::test]
async fn expired_keys_are_invisible_and_swept() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ttl.redb");
    let clock = Arc::new(ManualClock::default());
    let (store, engine) = open(&path, &clock);

    store
        .set("scratch", "1", Some(Duration::from_secs(10)))
        .await
        .unwrap();
    engine.search(UserId(1), None).await.unwrap();

    clock.advance(Duration::from_secs(10));
    assert_eq!(store.get("scratch").await.unwrap(), None);

    // Queue pool (300s) and cooldown (3s) keys are still counted until swept.
    clock.advance(Duration::from_secs(300));
    let removed = engine.sweep().await.unwrap();
    assert!(removed >= 2, "swept {removed}");
    assert_eq!(
        engine.matcher().pools().waiting(Pool::General).await.unwrap(),
        0
    );
}
