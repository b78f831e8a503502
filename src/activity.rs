//! Last-seen tracking.
//!
//! One global scored set, `active_users`, maps user id to the last time (ms)
//! the user did anything. Read-only with respect to matching; used for
//! occupancy stats, broadcasts and premium promotions.

use crate::clock::{SharedClock, millis};
use crate::error::EngineResult;
use crate::state::UserId;
use crate::store::{SharedStore, keys};
use std::time::Duration;

pub struct ActivityTracker {
    store: SharedStore,
    clock: SharedClock,
}

impl ActivityTracker {
    pub fn new(store: SharedStore, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Record that `user` is active now.
    pub async fn touch(&self, user: UserId) -> EngineResult<()> {
        self.store
            .sorted_add(keys::ACTIVE_USERS, &user.to_string(), self.clock.now_ms())
            .await?;
        Ok(())
    }

    /// Users seen within the last `hours` hours, least recent first.
    pub async fn active_since(&self, hours: u64) -> EngineResult<Vec<UserId>> {
        let span = Duration::from_secs(hours.saturating_mul(3600));
        let now = self.clock.now_ms();
        let cutoff = now - millis(span);
        Ok(self
            .store
            .sorted_range_by_score(keys::ACTIVE_USERS, cutoff, now)
            .await?
            .into_iter()
            .filter_map(|(member, _)| member.parse().ok())
            .collect())
    }

    /// Users seen within the last `hours` hours who hold no premium flag.
    pub async fn free_active_since(&self, hours: u64) -> EngineResult<Vec<UserId>> {
        let mut free = Vec::new();
        for user in self.active_since(hours).await? {
            if !self.store.exists(&keys::premium(user)).await? {
                free.push(user);
            }
        }
        Ok(free)
    }

    /// Everyone ever seen.
    pub async fn count(&self) -> EngineResult<usize> {
        Ok(self.store.sorted_len(keys::ACTIVE_USERS).await?)
    }
}
