//! Pool routing and pairing.
//!
//! # Routing
//!
//! Evaluated in order:
//!
//! 1. `hell` trust level: `degraded` only, both to find a partner and to
//!    wait. Premium and any filter argument are ignored.
//! 2. Premium with a filter: `any` routes to `general`; `male`/`female`
//!    need the requester's own gender and route to the premium pools.
//! 3. Premium with a profile gender and no filter: the opposite gender.
//! 4. Everyone else waits in `general`; free users may not pass a filter.
//!
//! Premium pool `premium:{D}` holds searchers looking for gender D, of any
//! gender. A searcher of gender G looking for D waits in `premium:{D}` and
//! picks partners from `premium:{G}`, taking only waiters whose own gender
//! is D. That way both sides get the gender they asked for.
//!
//! # Pairing
//!
//! Policy checks run first and touch nothing. The search cooldown is armed
//! once they pass. Then waiters are claimed from the head one at a time:
//!
//! - stale heads (self, banned, already in a session) are dropped;
//! - heads of the wrong gender are passed over and later put back at the
//!   head in their original order;
//! - the first fitting head is linked through the [`SessionRegistry`],
//!   guarded by the claim, so a waiter who cancelled meanwhile is skipped.
//!
//! If linking fails the claimed head goes back too before the error is
//! surfaced. With no fitting head the requester joins their pool.

use super::pools::{Claim, Pool, QueuePools};
use crate::error::{EngineResult, Rejection};
use crate::security::{ModerationEngine, TrustLedger, TrustLevel};
use crate::state::{Gender, Interest, ProfileDirectory, SessionRegistry, UserId};
use crate::store::{SharedStore, keys};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// What the matcher knows about a requester when routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eligibility {
    pub level: TrustLevel,
    pub premium: bool,
    pub gender: Option<Gender>,
}

/// Where a requester looks for a partner and where they wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub dequeue_from: Pool,
    pub enqueue_into: Pool,
    /// Gender a partner must have, for gender-filtered searches.
    pub partner_gender: Option<Gender>,
}

impl Route {
    fn same(pool: Pool) -> Self {
        Self {
            dequeue_from: pool,
            enqueue_into: pool,
            partner_gender: None,
        }
    }

    fn premium(own: Gender, seeking: Gender) -> Self {
        Self {
            dequeue_from: Pool::premium(own),
            enqueue_into: Pool::premium(seeking),
            partner_gender: Some(seeking),
        }
    }
}

/// Pick the pools for a requester. Pure; touches no state.
pub fn route(eligibility: &Eligibility, filter: Option<&str>) -> Result<Route, Rejection> {
    if eligibility.level == TrustLevel::Hell {
        return Ok(Route::same(Pool::Degraded));
    }

    match (eligibility.premium, filter) {
        (true, Some(arg)) => match arg.to_ascii_lowercase().as_str() {
            "any" => Ok(Route::same(Pool::General)),
            "male" | "female" => {
                let seeking: Gender = arg.parse()?;
                let own = eligibility.gender.ok_or(Rejection::GenderRequired)?;
                Ok(Route::premium(own, seeking))
            }
            _ => Err(Rejection::InvalidGenderFilter(arg.to_string())),
        },
        (true, None) => Ok(match eligibility.gender {
            Some(own) => Route::premium(own, own.opposite()),
            None => Route::same(Pool::General),
        }),
        (false, Some(_)) => Err(Rejection::PremiumOnly),
        (false, None) => Ok(Route::same(Pool::General)),
    }
}

/// Result of a successful search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Paired immediately with the oldest eligible waiter.
    Matched {
        partner: UserId,
        pool: Pool,
        common_interests: Vec<Interest>,
    },
    /// Nobody waiting; the requester now waits in `pool`.
    Queued { pool: Pool },
}

pub struct Matcher {
    store: SharedStore,
    pools: QueuePools,
    sessions: Arc<SessionRegistry>,
    trust: Arc<TrustLedger>,
    moderation: Arc<ModerationEngine>,
    profiles: Arc<ProfileDirectory>,
    cooldown: Duration,
}

impl Matcher {
    pub fn new(
        store: SharedStore,
        pools: QueuePools,
        sessions: Arc<SessionRegistry>,
        trust: Arc<TrustLedger>,
        moderation: Arc<ModerationEngine>,
        profiles: Arc<ProfileDirectory>,
        cooldown: Duration,
    ) -> Self {
        Self {
            store,
            pools,
            sessions,
            trust,
            moderation,
            profiles,
            cooldown,
        }
    }

    pub fn pools(&self) -> &QueuePools {
        &self.pools
    }

    pub async fn eligibility(&self, user: UserId) -> EngineResult<Eligibility> {
        Ok(Eligibility {
            level: self.trust.level(user).await?,
            premium: self.profiles.is_premium(user).await?,
            gender: self.profiles.get(user).await?.gender,
        })
    }

    /// Find a partner for `user` or queue them.
    ///
    /// The caller has already checked that `user` is not banned.
    pub async fn search(&self, user: UserId, filter: Option<&str>) -> EngineResult<SearchOutcome> {
        if self.sessions.is_in_session(user).await? {
            return Err(Rejection::AlreadyInChat.into());
        }
        if self.pools.position_of(user).await?.is_some() {
            return Err(Rejection::AlreadySearching.into());
        }

        let eligibility = self.eligibility(user).await?;
        let route = route(&eligibility, filter)?;

        let armed = self
            .store
            .set_nx(&keys::search_cooldown(user), "1", Some(self.cooldown))
            .await?;
        if !armed {
            return Err(Rejection::CooldownActive.into());
        }

        let mut passed_over = Vec::new();
        let mut paired = None;
        while let Some(claim) = self.pools.claim(route.dequeue_from, user).await? {
            if !self.is_valid_partner(user, claim.user).await? {
                debug!(pool = %claim.pool, candidate = %claim.user, "Discarding stale queue head");
                self.pools.release(&claim).await?;
                continue;
            }
            if !self.fits(&route, claim.user).await? {
                debug!(pool = %claim.pool, candidate = %claim.user, "Passing over queue head");
                passed_over.push(claim);
                continue;
            }

            match self
                .sessions
                .create_guarded(user, claim.user, &claim.key(), claim.mark())
                .await
            {
                Ok(Some(_)) => {
                    paired = Some(claim.user);
                    break;
                }
                Ok(None) => {
                    debug!(pool = %claim.pool, candidate = %claim.user, "Queue head withdrew before pairing");
                }
                Err(e) => {
                    passed_over.push(claim);
                    self.put_back(&passed_over).await?;
                    return Err(e);
                }
            }
        }
        self.put_back(&passed_over).await?;

        if let Some(partner) = paired {
            self.profiles.increment_total_chats(user).await?;
            self.profiles.increment_total_chats(partner).await?;
            let common_interests = self.profiles.common_interests(user, partner).await?;

            info!(user = %user, partner = %partner, pool = %route.dequeue_from, "Matched");
            return Ok(SearchOutcome::Matched {
                partner,
                pool: route.dequeue_from,
                common_interests,
            });
        }

        self.pools.enqueue(route.enqueue_into, user).await?;
        info!(user = %user, pool = %route.enqueue_into, level = %eligibility.level, "Waiting for partner");
        Ok(SearchOutcome::Queued {
            pool: route.enqueue_into,
        })
    }

    async fn is_valid_partner(&self, user: UserId, candidate: UserId) -> EngineResult<bool> {
        Ok(candidate != user
            && !self.moderation.is_banned(candidate).await?
            && !self.sessions.is_in_session(candidate).await?)
    }

    async fn fits(&self, route: &Route, candidate: UserId) -> EngineResult<bool> {
        match route.partner_gender {
            Some(wanted) => Ok(self.profiles.get(candidate).await?.gender == Some(wanted)),
            None => Ok(true),
        }
    }

    /// Return passed-over waiters to the head, oldest ending up first.
    async fn put_back(&self, claims: &[Claim]) -> EngineResult<()> {
        for claim in claims.iter().rev() {
            self.pools.unclaim(claim).await?;
        }
        Ok(())
    }

    /// Leave whichever pool `user` waits in, including a pop that has not
    /// been paired yet.
    pub async fn cancel(&self, user: UserId) -> EngineResult<Option<Pool>> {
        let pool = self.pools.withdraw(user).await?;
        if let Some(pool) = pool {
            info!(user = %user, pool = %pool, "Search cancelled");
        }
        Ok(pool)
    }
}
