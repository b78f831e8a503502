//! Engine facade.
//!
//! Wires every component over one injected store and clock and exposes the
//! user-facing operations. The transport calls nothing else.
//!
//! ```text
//!   gateway ──► Engine ──┬──► Matcher ──► QueuePools
//!                        │        └─────► SessionRegistry
//!                        ├──► Relay ───► RateLimiter, ContentFilter
//!                        ├──► ModerationEngine ──► TrustLedger
//!                        ├──► ProfileDirectory
//!                        └──► AdminConsole
//!                                  │
//!                          SharedStore (memory | redb)
//! ```
//!
//! Every operation marks the caller active, then refuses banned callers
//! (except `appeal` and `set_language`). Failures are counted under
//! their `error_code()`.

use crate::activity::ActivityTracker;
use crate::admin::AdminConsole;
use crate::clock::SharedClock;
use crate::config::Config;
use crate::error::{EngineError, EngineResult, Rejection};
use crate::matching::{Matcher, Pool, QueuePools, SearchOutcome};
use crate::metrics;
use crate::relay::{Content, Courier, Relay, RelayOutcome};
use crate::security::{ContentFilter, ModerationEngine, RateLimiter, ReportOutcome, TrustLedger};
use crate::state::{
    Gender, Interest, Language, ProfileDirectory, SessionRegistry, UserId, UserStats,
};
use crate::store::SharedStore;
use std::sync::Arc;
use tracing::{info, warn};

/// What `stop`/`next` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// A chat ended; `partner` should be told.
    ChatEnded { partner: UserId },
    /// The caller was waiting and has left `pool`.
    SearchCancelled { pool: Pool },
}

/// A report filed against the caller's current partner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiledReport {
    pub reported: UserId,
    pub outcome: ReportOutcome,
}

pub struct Engine {
    store: SharedStore,
    activity: Arc<ActivityTracker>,
    trust: Arc<TrustLedger>,
    moderation: Arc<ModerationEngine>,
    sessions: Arc<SessionRegistry>,
    profiles: Arc<ProfileDirectory>,
    matcher: Arc<Matcher>,
    relay: Relay,
    admin: AdminConsole,
}

impl Engine {
    pub fn new(store: SharedStore, clock: SharedClock, config: &Config) -> Self {
        let activity = Arc::new(ActivityTracker::new(store.clone(), clock.clone()));
        let trust = Arc::new(TrustLedger::new(store.clone(), config.trust.clone()));
        let moderation = Arc::new(ModerationEngine::new(
            store.clone(),
            clock.clone(),
            trust.clone(),
            config.moderation.clone(),
        ));
        let sessions = Arc::new(SessionRegistry::new(
            store.clone(),
            clock.clone(),
            config.matching.session_ttl(),
        ));
        let profiles = Arc::new(ProfileDirectory::new(store.clone()));
        let matcher = Arc::new(Matcher::new(
            store.clone(),
            QueuePools::new(store.clone(), config.matching.queue_ttl()),
            sessions.clone(),
            trust.clone(),
            moderation.clone(),
            profiles.clone(),
            config.matching.search_cooldown(),
        ));
        let relay = Relay::new(
            activity.clone(),
            moderation.clone(),
            Arc::new(RateLimiter::new(
                store.clone(),
                clock,
                &config.rate_limits,
            )),
            sessions.clone(),
            Arc::new(ContentFilter::new(&config.filter)),
        );
        let admin = AdminConsole::new(
            store.clone(),
            activity.clone(),
            moderation.clone(),
            sessions.clone(),
            profiles.clone(),
            matcher.clone(),
        );

        Self {
            store,
            activity,
            trust,
            moderation,
            sessions,
            profiles,
            matcher,
            relay,
            admin,
        }
    }

    pub fn admin(&self) -> &AdminConsole {
        &self.admin
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn moderation(&self) -> &ModerationEngine {
        &self.moderation
    }

    pub fn trust(&self) -> &TrustLedger {
        &self.trust
    }

    pub fn profiles(&self) -> &ProfileDirectory {
        &self.profiles
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Mark `user` active and refuse them if banned.
    async fn gate(&self, user: UserId) -> EngineResult<()> {
        self.activity.touch(user).await?;
        if self.moderation.is_banned(user).await? {
            return Err(Rejection::Blocked.into());
        }
        Ok(())
    }

    pub async fn search(&self, user: UserId, filter: Option<&str>) -> EngineResult<SearchOutcome> {
        let result: EngineResult<_> = async {
            self.gate(user).await?;
            self.matcher.search(user, filter).await
        }
        .await;

        match &result {
            Ok(SearchOutcome::Matched { pool, .. }) => {
                metrics::record_search("matched");
                metrics::record_match(pool.name());
            }
            Ok(SearchOutcome::Queued { .. }) => metrics::record_search("queued"),
            Err(_) => metrics::record_search("rejected"),
        }
        observed("search", result)
    }

    /// End the caller's chat, or cancel their pending search.
    pub async fn stop(&self, user: UserId) -> EngineResult<StopOutcome> {
        let result: EngineResult<_> = async {
            self.gate(user).await?;
            // Withdraw before terminate: an in-flight pop is either revoked
            // here or is already a session.
            if let Some(pool) = self.matcher.cancel(user).await? {
                return Ok(StopOutcome::SearchCancelled { pool });
            }
            match self.sessions.terminate(user).await? {
                Some(partner) => Ok(StopOutcome::ChatEnded { partner }),
                None => Err(Rejection::NotInChat.into()),
            }
        }
        .await;
        observed("stop", result)
    }

    /// Skip the current partner. Same state change as [`Engine::stop`].
    pub async fn next(&self, user: UserId) -> EngineResult<StopOutcome> {
        self.stop(user).await
    }

    /// Report the caller's current partner. The chat keeps going.
    pub async fn report(&self, reporter: UserId) -> EngineResult<FiledReport> {
        let result: EngineResult<_> = async {
            self.gate(reporter).await?;
            let reported = self
                .sessions
                .partner_of(reporter)
                .await?
                .ok_or(Rejection::NotInChat)?;
            let outcome = self.moderation.report(reported, reporter).await?;
            metrics::record_report(outcome.auto_ban.is_some());
            Ok(FiledReport { reported, outcome })
        }
        .await;
        observed("report", result)
    }

    /// Appeal a ban. Returns the ban reason when the caller is banned.
    pub async fn appeal(&self, user: UserId) -> EngineResult<Option<String>> {
        let reason = self.moderation.ban_reason(user).await;
        if let Ok(Some(reason)) = &reason {
            info!(user = %user, reason = %reason, "Ban appeal");
        }
        observed("appeal", reason)
    }

    /// The caller's partner, for sharing the caller's identity with them.
    pub async fn show_id(&self, user: UserId) -> EngineResult<UserId> {
        let result: EngineResult<_> = async {
            self.gate(user).await?;
            Ok(self
                .sessions
                .partner_of(user)
                .await?
                .ok_or(Rejection::NotInChat)?)
        }
        .await;
        observed("showid", result)
    }

    /// `male`, `female`, or `skip` to clear.
    pub async fn set_gender(&self, user: UserId, arg: &str) -> EngineResult<Option<Gender>> {
        let result: EngineResult<_> = async {
            self.gate(user).await?;
            let gender = if arg.eq_ignore_ascii_case("skip") {
                None
            } else {
                Some(arg.parse::<Gender>()?)
            };
            self.profiles.set_gender(user, gender).await?;
            Ok(gender)
        }
        .await;
        observed("setgender", result)
    }

    pub async fn set_interests(&self, user: UserId, tokens: &[&str]) -> EngineResult<Vec<Interest>> {
        let result: EngineResult<_> = async {
            self.gate(user).await?;
            let interests = Interest::parse_selection(tokens.iter().copied())?;
            self.profiles.set_interests(user, interests.clone()).await?;
            Ok(interests)
        }
        .await;
        observed("setinterest", result)
    }

    pub async fn set_language(&self, user: UserId, arg: &str) -> EngineResult<Language> {
        let result: EngineResult<_> = async {
            self.activity.touch(user).await?;
            let language: Language = arg.parse()?;
            self.profiles.set_language(user, language).await?;
            Ok(language)
        }
        .await;
        observed("lang", result)
    }

    pub async fn language(&self, user: UserId) -> EngineResult<Language> {
        self.profiles.language(user).await
    }

    pub async fn user_stats(&self, user: UserId) -> EngineResult<UserStats> {
        let result: EngineResult<_> = async {
            self.gate(user).await?;
            let profile = self.profiles.get(user).await?;
            let premium_days_left = self.profiles.premium_days_left(user).await?;
            let trust_score = self.trust.score(user).await?;
            Ok(UserStats {
                total_chats: self.profiles.total_chats(user).await?,
                premium: premium_days_left.is_some(),
                premium_days_left,
                gender: profile.gender,
                interests: profile.interests,
                trust_score,
                trust_level: self.trust.level_for(trust_score),
            })
        }
        .await;
        observed("stats", result)
    }

    /// Relay `content` from `sender` to their partner through `courier`.
    pub async fn forward(
        &self,
        courier: &dyn Courier,
        sender: UserId,
        content: Content,
    ) -> EngineResult<RelayOutcome> {
        let kind = content.kind();
        let result = self.relay.forward(courier, sender, content).await;
        match &result {
            Ok(RelayOutcome::Delivered { .. }) => metrics::record_relay(kind),
            Ok(RelayOutcome::PartnerUnreachable { .. }) => metrics::record_delivery_failure(),
            _ => {}
        }
        observed("relay", result)
    }

    /// Drop every expired key. Returns how many were removed.
    pub async fn sweep(&self) -> EngineResult<usize> {
        observed("sweep", self.store.purge_expired().await.map_err(EngineError::from))
    }
}

/// Count a failed operation and log anything that is not a policy rejection.
fn observed<T>(operation: &'static str, result: EngineResult<T>) -> EngineResult<T> {
    if let Err(e) = &result {
        metrics::record_rejection(operation, e.error_code());
        if e.rejection().is_none() {
            warn!(operation, error = %e, "Engine operation failed");
        }
    }
    result
}
