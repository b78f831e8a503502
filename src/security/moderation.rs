//! Reports, ban escalation and ban records.
//!
//! Reports against a user live in the scored set `reports:{id}`, keyed by
//! reporter id and scored by report time (ms). Because membership is keyed
//! by reporter, a second report from the same reporter inside the window
//! only refreshes the timestamp: it neither raises the count nor costs the
//! reported user more trust.
//!
//! # Auto-ban
//!
//! Evaluated after every report. A user is banned when their score reaches
//! zero, or when they are at the `hell` level with at least
//! `auto_ban_reports` distinct reporters in the window.
//!
//! The ban record is `banned:{id}` holding the reason. Unban clears it along
//! with the report history; trust is kept unless `reset_trust_on_unban` is
//! set.

use super::trust::{TrustLedger, TrustLevel};
use crate::clock::{SharedClock, millis};
use crate::config::ModerationConfig;
use crate::error::EngineResult;
use crate::state::UserId;
use crate::store::{SharedStore, WriteBatch, keys};
use std::sync::Arc;
use tracing::{info, warn};

pub const REASON_TRUST_EXHAUSTED: &str = "Auto-ban: trust exhausted";
pub const REASON_MULTIPLE_REPORTS: &str = "Auto-ban: multiple reports";

/// Result of filing one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutcome {
    /// Distinct reporters currently inside the window.
    pub count: usize,
    /// Whether this reporter was new inside the window (and so cost trust).
    pub counted: bool,
    /// Reported user's score after the report.
    pub score: i64,
    pub level: TrustLevel,
    /// Set when this report triggered a ban.
    pub auto_ban: Option<&'static str>,
}

pub struct ModerationEngine {
    store: SharedStore,
    clock: SharedClock,
    trust: Arc<TrustLedger>,
    config: ModerationConfig,
}

impl ModerationEngine {
    pub fn new(
        store: SharedStore,
        clock: SharedClock,
        trust: Arc<TrustLedger>,
        config: ModerationConfig,
    ) -> Self {
        Self {
            store,
            clock,
            trust,
            config,
        }
    }

    /// File a report from `reporter` against `reported`.
    pub async fn report(&self, reported: UserId, reporter: UserId) -> EngineResult<ReportOutcome> {
        let key = keys::reports(reported);
        let now = self.clock.now_ms();
        let window = self.config.report_window();

        self.store
            .sorted_trim_by_score(&key, i64::MIN, now - millis(window))
            .await?;
        let counted = self
            .store
            .sorted_add(&key, &reporter.to_string(), now)
            .await?;
        self.store.expire(&key, window).await?;
        let count = self.store.sorted_len(&key).await?;

        let score = if counted {
            self.trust
                .adjust(reported, -self.trust.penalty_per_report())
                .await?
        } else {
            self.trust.score(reported).await?
        };
        let level = self.trust.level_for(score);

        let reason = if score <= 0 {
            Some(REASON_TRUST_EXHAUSTED)
        } else if level == TrustLevel::Hell && count >= self.config.auto_ban_reports {
            Some(REASON_MULTIPLE_REPORTS)
        } else {
            None
        };

        // Already-banned users keep their original reason.
        let auto_ban = match reason {
            Some(reason) if !self.is_banned(reported).await? => {
                self.ban(reported, reason).await?;
                warn!(user = %reported, count, score, reason, "Auto-ban triggered");
                Some(reason)
            }
            _ => None,
        };

        info!(
            reported = %reported,
            reporter = %reporter,
            count,
            counted,
            score,
            level = %level,
            "Report filed"
        );

        Ok(ReportOutcome {
            count,
            counted,
            score,
            level,
            auto_ban,
        })
    }

    pub async fn ban(&self, user: UserId, reason: &str) -> EngineResult<()> {
        self.store.set(&keys::banned(user), reason, None).await?;
        info!(user = %user, reason, "User banned");
        Ok(())
    }

    /// Lift a ban. Returns whether the user was banned.
    pub async fn unban(&self, user: UserId) -> EngineResult<bool> {
        let was_banned = self.is_banned(user).await?;
        self.store
            .apply(
                WriteBatch::new()
                    .del(keys::banned(user))
                    .del(keys::reports(user)),
            )
            .await?;
        if self.config.reset_trust_on_unban {
            self.trust.reset(user).await?;
        }
        info!(user = %user, was_banned, "User unbanned");
        Ok(was_banned)
    }

    pub async fn is_banned(&self, user: UserId) -> EngineResult<bool> {
        Ok(self.store.exists(&keys::banned(user)).await?)
    }

    pub async fn ban_reason(&self, user: UserId) -> EngineResult<Option<String>> {
        Ok(self.store.get(&keys::banned(user)).await?)
    }

    /// Distinct reporters currently inside the window.
    pub async fn report_count(&self, user: UserId) -> EngineResult<usize> {
        let key = keys::reports(user);
        let cutoff = self.clock.now_ms() - millis(self.config.report_window());
        Ok(self
            .store
            .sorted_range_by_score(&key, cutoff + 1, i64::MAX)
            .await?
            .len())
    }

    /// Every banned user id, ascending.
    pub async fn list_banned(&self) -> EngineResult<Vec<UserId>> {
        let mut ids: Vec<UserId> = self
            .store
            .scan_prefix(keys::BANNED_PREFIX)
            .await?
            .iter()
            .filter_map(|key| keys::id_after(key, keys::BANNED_PREFIX))
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::TrustConfig;
    use crate::store::MemoryStore;
    use std::time::Duration;

    struct Fixture {
        clock: Arc<ManualClock>,
        trust: Arc<TrustLedger>,
        moderation: ModerationEngine,
    }

    fn fixture(config: ModerationConfig) -> Fixture {
        let clock = Arc::new(ManualClock::default());
        let store: SharedStore = Arc::new(MemoryStore::new(clock.clone()));
        let trust = Arc::new(TrustLedger::new(store.clone(), TrustConfig::default()));
        let moderation = ModerationEngine::new(store, clock.clone(), trust.clone(), config);
        Fixture {
            clock,
            trust,
            moderation,
        }
    }

    #[tokio::test]
    async fn same_reporter_counts_once() {
        let f = fixture(ModerationConfig::default());
        let first = f.moderation.report(UserId(1), UserId(2)).await.unwrap();
        let second = f.moderation.report(UserId(1), UserId(2)).await.unwrap();

        assert_eq!(first.count, 1);
        assert!(first.counted);
        assert_eq!(second.count, 1);
        assert!(!second.counted);
        assert_eq!(f.trust.score(UserId(1)).await.unwrap(), 40);
    }

    #[tokio::test]
    async fn six_distinct_reports_floor_at_zero() {
        let f = fixture(ModerationConfig::default());
        let mut last = None;
        for reporter in 10..16 {
            last = Some(f.moderation.report(UserId(1), UserId(reporter)).await.unwrap());
        }
        let last = last.unwrap();
        assert_eq!(last.score, 0);
        assert_eq!(last.count, 6);
        assert_eq!(f.trust.score(UserId(1)).await.unwrap(), 0);
        assert!(f.moderation.is_banned(UserId(1)).await.unwrap());
    }

    #[tokio::test]
    async fn hell_level_with_enough_reports_bans() {
        let f = fixture(ModerationConfig::default());
        // 50 -> 40 -> 30 -> 20: low, not yet hell.
        for reporter in 10..13 {
            let outcome = f.moderation.report(UserId(1), UserId(reporter)).await.unwrap();
            assert_eq!(outcome.auto_ban, None);
        }
        let outcome = f.moderation.report(UserId(1), UserId(13)).await.unwrap();
        assert_eq!(outcome.score, 10);
        assert_eq!(outcome.level, TrustLevel::Hell);
        assert_eq!(outcome.auto_ban, Some(REASON_MULTIPLE_REPORTS));
        assert_eq!(
            f.moderation.ban_reason(UserId(1)).await.unwrap().as_deref(),
            Some(REASON_MULTIPLE_REPORTS)
        );
    }

    #[tokio::test]
    async fn exhausted_trust_bans_regardless_of_count() {
        let f = fixture(ModerationConfig::default());
        f.trust.adjust(UserId(1), -40).await.unwrap();
        let outcome = f.moderation.report(UserId(1), UserId(2)).await.unwrap();
        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.score, 0);
        assert_eq!(outcome.auto_ban, Some(REASON_TRUST_EXHAUSTED));
    }

    #[tokio::test]
    async fn reports_age_out_of_the_window() {
        let f = fixture(ModerationConfig::default());
        f.moderation.report(UserId(1), UserId(2)).await.unwrap();
        f.clock.advance(Duration::from_secs(86_400));
        assert_eq!(f.moderation.report_count(UserId(1)).await.unwrap(), 0);

        let outcome = f.moderation.report(UserId(1), UserId(2)).await.unwrap();
        assert_eq!(outcome.count, 1);
        assert!(outcome.counted);
        assert_eq!(outcome.score, 30);
    }

    #[tokio::test]
    async fn unban_clears_reports_but_keeps_trust() {
        let f = fixture(ModerationConfig::default());
        for reporter in 10..14 {
            f.moderation.report(UserId(1), UserId(reporter)).await.unwrap();
        }
        assert!(f.moderation.is_banned(UserId(1)).await.unwrap());

        assert!(f.moderation.unban(UserId(1)).await.unwrap());
        assert!(!f.moderation.is_banned(UserId(1)).await.unwrap());
        assert_eq!(f.moderation.report_count(UserId(1)).await.unwrap(), 0);
        assert_eq!(f.trust.score(UserId(1)).await.unwrap(), 10);

        assert!(!f.moderation.unban(UserId(1)).await.unwrap());
    }

    #[tokio::test]
    async fn unban_hook_can_reset_trust() {
        let f = fixture(ModerationConfig {
            reset_trust_on_unban: true,
            ..ModerationConfig::default()
        });
        f.moderation.ban(UserId(1), "manual").await.unwrap();
        f.trust.adjust(UserId(1), -30).await.unwrap();
        f.moderation.unban(UserId(1)).await.unwrap();
        assert_eq!(f.trust.score(UserId(1)).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn list_banned_is_sorted() {
        let f = fixture(ModerationConfig::default());
        for id in [30, 4, 12] {
            f.moderation.ban(UserId(id), "manual").await.unwrap();
        }
        assert_eq!(
            f.moderation.list_banned().await.unwrap(),
            vec![UserId(4), UserId(12), UserId(30)]
        );
    }
}
