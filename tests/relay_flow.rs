// tests/relay_flow.rs
//! Integration tests for message relay between partners.

mod common;
use common::{RecordingCourier, TestEngine, UnreachableCourier};
use shadowchat::error::Rejection;
use shadowchat::relay::{Content, RelayOutcome};
use shadowchat::state::UserId;
use std::time::Duration;

#[tokio::test]
async fn text_is_censored_and_typing_shown() {
    let t = TestEngine::new();
    t.pair(UserId(1), UserId(2)).await;
    let courier = RecordingCourier::default();

    let outcome = t
        .engine
        .forward(&courier, UserId(1), Content::Text("halo b4bi kamu".into()))
        .await
        .unwrap();
    assert_eq!(outcome, RelayOutcome::Delivered { partner: UserId(2) });

    let delivered = courier.delivered.lock();
    assert_eq!(
        delivered.as_slice(),
        &[(UserId(2), Content::Text("halo **** kamu".into()))]
    );
    assert_eq!(courier.typing.lock().as_slice(), &[UserId(2)]);
}

#[tokio::test]
async fn media_passes_through_with_captions_masked() {
    let t = TestEngine::new();
    t.pair(UserId(1), UserId(2)).await;
    let courier = RecordingCourier::default();

    t.engine
        .forward(
            &courier,
            UserId(2),
            Content::Photo {
                file_id: "AgAD".into(),
                caption: Some("lihat setan".into()),
            },
        )
        .await
        .unwrap();
    t.engine
        .forward(
            &courier,
            UserId(2),
            Content::Voice {
                file_id: "AwAD".into(),
            },
        )
        .await
        .unwrap();

    let delivered = courier.delivered.lock();
    assert_eq!(delivered.len(), 2);
    assert_eq!(
        delivered[0],
        (
            UserId(1),
            Content::Photo {
                file_id: "AgAD".into(),
                caption: Some("lihat *****".into()),
            }
        )
    );
    assert_eq!(delivered[1].1.kind(), "voice");
}

#[tokio::test]
async fn dangerous_documents_are_refused() {
    let t = TestEngine::new();
    t.pair(UserId(1), UserId(2)).await;
    let courier = RecordingCourier::default();

    let err = t
        .engine
        .forward(
            &courier,
            UserId(1),
            Content::Document {
                file_id: "BQAD".into(),
                file_name: "invoice.EXE.pdf".into(),
                caption: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        err.rejection(),
        Some(&Rejection::DangerousFile("invoice.EXE.pdf".into()))
    );
    assert!(courier.delivered.lock().is_empty());

    let ok = t
        .engine
        .forward(
            &courier,
            UserId(1),
            Content::Document {
                file_id: "BQAD".into(),
                file_name: "notes.pdf".into(),
                caption: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(ok, RelayOutcome::Delivered { partner: UserId(2) });
}

async fn send_text(
    t: &TestEngine,
    courier: &RecordingCourier,
    text: &str,
) -> shadowchat::error::EngineResult<RelayOutcome> {
    t.engine
        .forward(courier, UserId(1), Content::Text(text.into()))
        .await
}

#[tokio::test]
async fn senders_are_rate_limited_per_window() {
    let t = TestEngine::new();
    t.pair(UserId(1), UserId(2)).await;
    let courier = RecordingCourier::default();

    for _ in 0..3 {
        send_text(&t, &courier, "hi").await.unwrap();
    }
    let err = send_text(&t, &courier, "hi").await.unwrap_err();
    assert_eq!(err.rejection(), Some(&Rejection::RateLimited));

    t.clock.advance(Duration::from_secs(5));
    send_text(&t, &courier, "again").await.unwrap();
    assert_eq!(courier.delivered.lock().len(), 4);
}

#[tokio::test]
async fn messages_outside_a_chat_are_dropped() {
    let t = TestEngine::new();
    let courier = RecordingCourier::default();
    let outcome = t
        .engine
        .forward(&courier, UserId(1), Content::Text("anyone?".into()))
        .await
        .unwrap();
    assert_eq!(outcome, RelayOutcome::NoPartner);
    assert!(courier.typing.lock().is_empty());
}

#[tokio::test]
async fn banned_senders_are_blocked() {
    let t = TestEngine::new();
    t.pair(UserId(1), UserId(2)).await;
    t.engine.moderation().ban(UserId(1), "spam").await.unwrap();

    let err = t
        .engine
        .forward(
            &RecordingCourier::default(),
            UserId(1),
            Content::Text("hello".into()),
        )
        .await
        .unwrap_err();
    assert_eq!(err.rejection(), Some(&Rejection::Blocked));
}

#[tokio::test]
async fn unreachable_partner_detaches_sender() {
    let t = TestEngine::new();
    t.pair(UserId(1), UserId(2)).await;

    let outcome = t
        .engine
        .forward(&UnreachableCourier, UserId(1), Content::Text("hello".into()))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        RelayOutcome::PartnerUnreachable { partner: UserId(2) }
    );

    let sessions = t.engine.sessions();
    assert!(!sessions.is_in_session(UserId(1)).await.unwrap());
    assert_eq!(sessions.partner_of(UserId(2)).await.unwrap(), None);

    t.clock.advance(Duration::from_secs(3));
    t.engine.search(UserId(1), None).await.unwrap();
}
