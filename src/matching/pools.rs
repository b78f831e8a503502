//! Named FIFO waiting pools.
//!
//! Each pool is a store list `queue:{name}` of user ids, oldest first. The
//! head pop is a single store command, which is what keeps two concurrent
//! searchers from ever receiving the same partner. Every join re-arms the
//! pool's idle TTL; an expired pool simply disappears and its waiters notice
//! on their next search.
//!
//! # Claims
//!
//! The pop also writes `claim:{id}` for the popped waiter in the same
//! step. Until the searcher pairs, releases or puts back that waiter, the
//! waiter sits in neither a pool nor a session. Every follow-up write is
//! guarded by the claim, and [`QueuePools::withdraw`] deletes it, so a
//! waiter who cancels mid-pop can never end up paired or queued again.

use crate::error::EngineResult;
use crate::state::{Gender, UserId};
use crate::store::{SharedStore, WriteBatch, keys};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on how long a searcher may hold a popped waiter.
const CLAIM_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pool {
    General,
    PremiumMale,
    PremiumFemale,
    /// Isolation pool for the `hell` trust level.
    Degraded,
}

impl Pool {
    pub const ALL: [Pool; 4] = [
        Self::General,
        Self::PremiumMale,
        Self::PremiumFemale,
        Self::Degraded,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::PremiumMale => "premium:male",
            Self::PremiumFemale => "premium:female",
            Self::Degraded => "degraded",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|pool| pool.name() == name)
    }

    pub fn key(self) -> String {
        keys::queue(self.name())
    }

    /// Premium pool for searchers looking for `gender`.
    pub fn premium(gender: Gender) -> Self {
        match gender {
            Gender::Male => Self::PremiumMale,
            Gender::Female => Self::PremiumFemale,
        }
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A waiter popped by a searcher and not yet paired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub user: UserId,
    pub pool: Pool,
    mark: String,
}

impl Claim {
    fn new(user: UserId, pool: Pool, mark: String) -> Self {
        Self { user, pool, mark }
    }

    pub fn key(&self) -> String {
        keys::claim(self.user)
    }

    /// Value held under [`Claim::key`] while the claim is live.
    pub fn mark(&self) -> &str {
        &self.mark
    }
}

pub struct QueuePools {
    store: SharedStore,
    ttl: Duration,
}

impl QueuePools {
    pub fn new(store: SharedStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Append `user` to the tail and re-arm the pool TTL.
    pub async fn enqueue(&self, pool: Pool, user: UserId) -> EngineResult<usize> {
        let key = pool.key();
        let len = self.store.list_push_back(&key, &user.to_string()).await?;
        self.store.expire(&key, self.ttl).await?;
        debug!(pool = %pool, user = %user, len, "Enqueued");
        Ok(len)
    }

    /// Atomically pop the oldest waiter and claim them for `claimant`.
    pub async fn claim(&self, pool: Pool, claimant: UserId) -> EngineResult<Option<Claim>> {
        let key = pool.key();
        let mark = format!("{} {claimant}", pool.name());
        loop {
            let Some(raw) = self
                .store
                .list_pop_front_marked(&key, keys::CLAIM_PREFIX, &mark, Some(CLAIM_TTL))
                .await?
            else {
                return Ok(None);
            };
            match raw.parse() {
                Ok(user) => return Ok(Some(Claim::new(user, pool, mark))),
                Err(_) => {
                    warn!(pool = %pool, entry = %raw, "Discarding malformed queue entry");
                    self.store
                        .del(&format!("{}{raw}", keys::CLAIM_PREFIX))
                        .await?;
                }
            }
        }
    }

    /// Put a claimed waiter back at the head of their pool.
    ///
    /// Returns `false` when the waiter withdrew in the meantime.
    pub async fn unclaim(&self, claim: &Claim) -> EngineResult<bool> {
        let batch = WriteBatch::new()
            .list_push_front(claim.pool.key(), claim.user.to_string(), Some(self.ttl))
            .del(claim.key());
        let restored = self
            .store
            .apply_if_eq(&claim.key(), claim.mark(), batch)
            .await?;
        debug!(pool = %claim.pool, user = %claim.user, restored, "Unclaimed");
        Ok(restored)
    }

    /// Drop a claim without putting the waiter back.
    pub async fn release(&self, claim: &Claim) -> EngineResult<()> {
        self.store
            .apply(WriteBatch::new().del_if_eq(claim.key(), claim.mark()))
            .await?;
        Ok(())
    }

    /// Take `user` out of every pool and revoke any claim on them, in one
    /// atomic batch. Returns the pool they were waiting in or popped from.
    pub async fn withdraw(&self, user: UserId) -> EngineResult<Option<Pool>> {
        let claim_key = keys::claim(user);
        let claimed_from = self
            .store
            .get(&claim_key)
            .await?
            .and_then(|mark| mark.split_once(' ').and_then(|(name, _)| Pool::from_name(name)));

        let member = user.to_string();
        let batch = Pool::ALL
            .into_iter()
            .fold(WriteBatch::new().del(&claim_key), |batch, pool| {
                batch.list_remove(pool.key(), &member)
            });
        let changed = self.store.apply(batch).await?;

        let revoked = changed.first().copied().unwrap_or(false);
        let queued_in = Pool::ALL
            .into_iter()
            .zip(changed.into_iter().skip(1))
            .find_map(|(pool, removed)| removed.then_some(pool));
        // A claim taken between the read and the batch carries no pool we saw.
        Ok(queued_in.or_else(|| revoked.then(|| claimed_from.unwrap_or(Pool::General))))
    }

    /// The pool `user` is currently waiting in.
    pub async fn position_of(&self, user: UserId) -> EngineResult<Option<Pool>> {
        let member = user.to_string();
        for pool in Pool::ALL {
            if self.store.list_range(&pool.key()).await?.contains(&member) {
                return Ok(Some(pool));
            }
        }
        Ok(None)
    }

    pub async fn waiting(&self, pool: Pool) -> EngineResult<usize> {
        Ok(self.store.list_len(&pool.key()).await?)
    }

    pub async fn total_waiting(&self) -> EngineResult<usize> {
        let mut total = 0;
        for pool in Pool::ALL {
            total += self.waiting(pool).await?;
        }
        Ok(total)
    }
}
