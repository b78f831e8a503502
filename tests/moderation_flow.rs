// tests/moderation_flow.rs
//! Integration tests for reports, trust decay, auto-bans and appeals.

mod common;
use common::{TestEngine, config_with};
use shadowchat::error::Rejection;
use shadowchat::security::TrustLevel;
use shadowchat::state::UserId;
use std::time::Duration;

/// Pair `target` with `reporter` and have the reporter file a report.
async fn report_from(t: &TestEngine, target: UserId, reporter: UserId) -> shadowchat::engine::FiledReport {
    t.clock.advance(Duration::from_secs(5));
    t.pair(target, reporter).await;
    let filed = t.engine.report(reporter).await.expect("report");
    t.engine.stop(reporter).await.expect("stop");
    filed
}

#[tokio::test]
async fn distinct_reporters_drain_trust_until_auto_ban() {
    let t = TestEngine::new();
    let target = UserId(1);

    let mut last = None;
    for (i, reporter) in (100..104).map(UserId).enumerate() {
        let filed = report_from(&t, target, reporter).await;
        assert_eq!(filed.reported, target);
        assert!(filed.outcome.counted);
        assert_eq!(filed.outcome.count, i + 1);
        assert_eq!(filed.outcome.score, 50 - 10 * (i as i64 + 1));
        last = Some(filed.outcome);
    }

    let last = last.unwrap();
    assert_eq!(last.level, TrustLevel::Hell);
    assert_eq!(last.auto_ban, Some("Auto-ban: multiple reports"));
    assert!(t.engine.moderation().is_banned(target).await.unwrap());

    let err = t.engine.search(target, None).await.unwrap_err();
    assert_eq!(err.rejection(), Some(&Rejection::Blocked));
}

#[tokio::test]
async fn repeat_reporter_counts_once() {
    let t = TestEngine::new();
    let (target, reporter) = (UserId(1), UserId(2));
    t.pair(target, reporter).await;

    let first = t.engine.report(reporter).await.unwrap().outcome;
    let second = t.engine.report(reporter).await.unwrap().outcome;
    assert!(first.counted);
    assert!(!second.counted);
    assert_eq!(second.count, 1);
    assert_eq!(second.score, 40);

    // Reporting does not end the chat.
    assert_eq!(
        t.engine.sessions().partner_of(reporter).await.unwrap(),
        Some(target)
    );
}

#[tokio::test]
async fn reports_age_out_of_the_window() {
    let t = TestEngine::new();
    let target = UserId(1);
    report_from(&t, target, UserId(2)).await;
    report_from(&t, target, UserId(3)).await;
    assert_eq!(t.engine.moderation().report_count(target).await.unwrap(), 2);

    t.clock.advance(Duration::from_secs(86_400));
    assert_eq!(t.engine.moderation().report_count(target).await.unwrap(), 0);
    // Trust does not recover on its own.
    assert_eq!(t.engine.trust().score(target).await.unwrap(), 30);
}

#[tokio::test]
async fn exhausted_trust_bans_regardless_of_count() {
    let t = TestEngine::with_config(&config_with(
        "[trust]\npenalty_per_report = 25\n\n[moderation]\nauto_ban_reports = 10\n",
    ));
    let target = UserId(1);
    report_from(&t, target, UserId(2)).await;
    let outcome = report_from(&t, target, UserId(3)).await.outcome;
    assert_eq!(outcome.score, 0);
    assert_eq!(outcome.auto_ban, Some("Auto-ban: trust exhausted"));
}

#[tokio::test]
async fn unban_clears_reports_but_keeps_trust() {
    let t = TestEngine::new();
    let target = UserId(1);
    t.engine.moderation().ban(target, "spam").await.unwrap();
    t.engine.moderation().report(target, UserId(3)).await.unwrap();
    t.engine.trust().adjust(target, -20).await.unwrap();

    assert_eq!(t.engine.appeal(target).await.unwrap().as_deref(), Some("spam"));
    assert!(t.engine.admin().unban(target).await.unwrap());
    assert_eq!(t.engine.appeal(target).await.unwrap(), None);
    assert_eq!(t.engine.moderation().report_count(target).await.unwrap(), 0);
    assert_eq!(t.engine.trust().score(target).await.unwrap(), 20);
}

#[tokio::test]
async fn unban_can_reset_trust_when_configured() {
    let t = TestEngine::with_config(&config_with(
        "[moderation]\nreset_trust_on_unban = true\n",
    ));
    let target = UserId(1);
    t.engine.trust().adjust(target, -45).await.unwrap();
    t.engine.admin().ban(target, "x").await.unwrap();
    t.engine.admin().unban(target).await.unwrap();
    assert_eq!(t.engine.trust().score(target).await.unwrap(), 50);
}

#[tokio::test]
async fn manual_ban_reason_survives_later_auto_ban() {
    let t = TestEngine::new();
    let target = UserId(1);
    t.pair(target, UserId(2)).await;
    t.engine.trust().adjust(target, -45).await.unwrap();
    t.engine.admin().ban(target, "manual").await.unwrap();

    // The reporter's chat ended with the ban; the report needs a live chat.
    let err = t.engine.report(UserId(2)).await.unwrap_err();
    assert_eq!(err.rejection(), Some(&Rejection::NotInChat));

    let outcome = t.engine.moderation().report(target, UserId(2)).await.unwrap();
    assert_eq!(outcome.score, 0);
    assert_eq!(outcome.auto_ban, None);
    assert_eq!(
        t.engine.moderation().ban_reason(target).await.unwrap().as_deref(),
        Some("manual")
    );
}
