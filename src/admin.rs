//! Operator actions.
//!
//! Nothing here checks who is calling; the transport only routes admin
//! commands for ids listed in `server.admin_ids`.

use crate::activity::ActivityTracker;
use crate::error::EngineResult;
use crate::matching::Matcher;
use crate::security::ModerationEngine;
use crate::state::{ProfileDirectory, SessionRegistry, UserId};
use crate::store::{SharedStore, keys};
use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::info;

/// Hours of inactivity after which a user drops out of broadcasts and gifts.
pub const AUDIENCE_HOURS: u64 = 24;

/// Longest banned list shown in one reply.
pub const BANNED_PAGE: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalStats {
    pub total_users: usize,
    pub active_sessions: usize,
    pub queue_waiting: usize,
    pub total_premium: usize,
    pub total_banned: usize,
}

/// The first [`BANNED_PAGE`] banned ids and how many were left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BannedPage {
    pub shown: Vec<UserId>,
    pub more: usize,
}

pub struct AdminConsole {
    store: SharedStore,
    activity: Arc<ActivityTracker>,
    moderation: Arc<ModerationEngine>,
    sessions: Arc<SessionRegistry>,
    profiles: Arc<ProfileDirectory>,
    matcher: Arc<Matcher>,
}

impl AdminConsole {
    pub fn new(
        store: SharedStore,
        activity: Arc<ActivityTracker>,
        moderation: Arc<ModerationEngine>,
        sessions: Arc<SessionRegistry>,
        profiles: Arc<ProfileDirectory>,
        matcher: Arc<Matcher>,
    ) -> Self {
        Self {
            store,
            activity,
            moderation,
            sessions,
            profiles,
            matcher,
        }
    }

    pub async fn grant_premium(&self, user: UserId, days: u64) -> EngineResult<()> {
        self.profiles.grant_premium(user, days).await?;
        info!(user = %user, days, "Premium granted");
        Ok(())
    }

    /// Grant premium to up to `count` random free users active in the
    /// last day. Returns who received it.
    pub async fn gift_premium(&self, count: usize, days: u64) -> EngineResult<Vec<UserId>> {
        let mut candidates = Vec::new();
        for user in self.activity.free_active_since(AUDIENCE_HOURS).await? {
            if !self.moderation.is_banned(user).await? {
                candidates.push(user);
            }
        }

        let chosen: Vec<UserId> = {
            let mut rng = rand::thread_rng();
            candidates
                .choose_multiple(&mut rng, count)
                .copied()
                .collect()
        };

        for &user in &chosen {
            self.profiles.grant_premium(user, days).await?;
        }
        info!(
            requested = count,
            gifted = chosen.len(),
            eligible = candidates.len(),
            days,
            "Premium gifted"
        );
        Ok(chosen)
    }

    /// Ban `user` and end their chat. Returns the partner left behind.
    pub async fn ban(&self, user: UserId, reason: &str) -> EngineResult<Option<UserId>> {
        self.moderation.ban(user, reason).await?;
        self.matcher.cancel(user).await?;
        Ok(self.sessions.terminate(user).await?)
    }

    /// Returns whether the user was banned.
    pub async fn unban(&self, user: UserId) -> EngineResult<bool> {
        self.moderation.unban(user).await
    }

    pub async fn list_banned(&self) -> EngineResult<BannedPage> {
        let mut shown = self.moderation.list_banned().await?;
        let more = shown.len().saturating_sub(BANNED_PAGE);
        shown.truncate(BANNED_PAGE);
        Ok(BannedPage { shown, more })
    }

    pub async fn global_stats(&self) -> EngineResult<GlobalStats> {
        Ok(GlobalStats {
            total_users: self.activity.count().await?,
            active_sessions: self.sessions.count().await?,
            queue_waiting: self.matcher.pools().total_waiting().await?,
            total_premium: self.store.scan_prefix(keys::PREMIUM_PREFIX).await?.len(),
            total_banned: self.store.scan_prefix(keys::BANNED_PREFIX).await?.len(),
        })
    }

    /// Users a broadcast goes to.
    pub async fn broadcast_audience(&self) -> EngineResult<Vec<UserId>> {
        self.activity.active_since(AUDIENCE_HOURS).await
    }
}
