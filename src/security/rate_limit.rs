//! Sliding-window message rate limiting.
//!
//! Each user owns a scored set `rate:{id}` of send attempts, scored by
//! attempt time in milliseconds. Members are random UUIDs so two sends in
//! the same millisecond are still counted twice.
//!
//! # Algorithm
//!
//! 1. Drop attempts at or before `now - window`.
//! 2. If `max` attempts remain, reject without recording anything.
//! 3. Otherwise record this attempt and re-arm the key TTL to `window`.

use crate::clock::{SharedClock, millis};
use crate::config::RateLimitConfig;
use crate::error::EngineResult;
use crate::state::UserId;
use crate::store::{SharedStore, keys};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

pub struct RateLimiter {
    store: SharedStore,
    clock: SharedClock,
    window: Duration,
    max_messages: usize,
}

impl RateLimiter {
    pub fn new(store: SharedStore, clock: SharedClock, config: &RateLimitConfig) -> Self {
        Self {
            store,
            clock,
            window: config.window(),
            max_messages: config.max_messages,
        }
    }

    /// Check if `user` may send now, recording the attempt when allowed.
    ///
    /// Returns `true` if allowed, `false` if rate limited.
    pub async fn check_and_record(&self, user: UserId) -> EngineResult<bool> {
        let key = keys::rate(user);
        let now = self.clock.now_ms();

        self.store
            .sorted_trim_by_score(&key, i64::MIN, now - millis(self.window))
            .await?;
        let count = self.store.sorted_len(&key).await?;
        if count >= self.max_messages {
            debug!(user = %user, count, "message rate limit exceeded");
            return Ok(false);
        }

        self.store
            .sorted_add(&key, &Uuid::new_v4().to_string(), now)
            .await?;
        self.store.expire(&key, self.window).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn limiter() -> (Arc<ManualClock>, RateLimiter) {
        let clock = Arc::new(ManualClock::default());
        let store: SharedStore = Arc::new(MemoryStore::new(clock.clone()));
        let limiter = RateLimiter::new(store, clock.clone(), &RateLimitConfig::default());
        (clock, limiter)
    }

    #[tokio::test]
    async fn fourth_send_in_window_is_rejected() {
        let (clock, limiter) = limiter();
        let user = UserId(1);

        // Same millisecond: still three distinct attempts.
        for _ in 0..3 {
            assert!(limiter.check_and_record(user).await.unwrap());
        }
        clock.advance(Duration::from_secs(1));
        assert!(!limiter.check_and_record(user).await.unwrap());

        clock.advance(Duration::from_secs(4));
        assert!(limiter.check_and_record(user).await.unwrap());
    }

    #[tokio::test]
    async fn users_are_limited_independently() {
        let (_clock, limiter) = limiter();
        for _ in 0..3 {
            assert!(limiter.check_and_record(UserId(1)).await.unwrap());
        }
        assert!(!limiter.check_and_record(UserId(1)).await.unwrap());
        assert!(limiter.check_and_record(UserId(2)).await.unwrap());
    }

    #[tokio::test]
    async fn rejected_attempts_do_not_extend_the_window() {
        let (clock, limiter) = limiter();
        let user = UserId(1);
        for _ in 0..3 {
            limiter.check_and_record(user).await.unwrap();
        }
        for _ in 0..10 {
            clock.advance(Duration::from_millis(400));
            assert!(!limiter.check_and_record(user).await.unwrap());
        }
        clock.advance(Duration::from_secs(1));
        assert!(limiter.check_and_record(user).await.unwrap());
    }
}
