// tests/concurrency.rs
//! Concurrent searches must never pair anyone twice.

mod common;
use common::TestEngine;
use shadowchat::matching::SearchOutcome;
use shadowchat::state::UserId;
use std::collections::HashMap;
use std::sync::Arc;

const USERS: i64 = 64;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_searches_pair_each_user_at_most_once() {
    let t = TestEngine::new();

    let mut handles = Vec::new();
    for id in 1..=USERS {
        let engine = Arc::clone(&t.engine);
        handles.push(tokio::spawn(async move {
            (UserId(id), engine.search(UserId(id), None).await)
        }));
    }

    let mut matched_by = HashMap::new();
    for handle in handles {
        let (user, outcome) = handle.await.expect("search task");
        if let SearchOutcome::Matched { partner, .. } = outcome.expect("search") {
            assert!(
                matched_by.insert(partner, user).is_none(),
                "{partner} was popped twice"
            );
        }
    }

    let sessions = t.engine.sessions();
    let pools = t.engine.matcher().pools();
    let mut in_session = 0;
    for id in 1..=USERS {
        let user = UserId(id);
        match sessions.partner_of(user).await.unwrap() {
            Some(partner) => {
                in_session += 1;
                assert_ne!(partner, user);
                assert_eq!(sessions.partner_of(partner).await.unwrap(), Some(user));
                assert!(pools.position_of(user).await.unwrap().is_none());
            }
            None => assert!(pools.position_of(user).await.unwrap().is_some()),
        }
    }

    let waiting = pools.total_waiting().await.unwrap();
    assert_eq!(in_session + waiting, USERS as usize);
    assert_eq!(in_session, matched_by.len() * 2);
    assert_eq!(sessions.count().await.unwrap(), matched_by.len());
}
