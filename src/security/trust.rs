//! Trust ledger.
//!
//! Tracks a trust score (0-100) per user under `trust:{id}`. Unknown users
//! sit at the configured initial score. The discrete [`TrustLevel`] derived
//! from the score drives pool routing and ban escalation.
//!
//! Scores only move through [`TrustLedger::adjust`], which is one atomic
//! clamped increment at the store. There is no decay.

use crate::config::TrustConfig;
use crate::error::{EngineError, EngineResult};
use crate::state::UserId;
use crate::store::{SharedStore, keys};
use std::fmt;
use tracing::debug;

pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TrustLevel {
    /// Lowest tier, isolated in the degraded pool.
    Hell,
    Low,
    Normal,
    High,
}

impl TrustLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hell => "hell",
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct TrustLedger {
    store: SharedStore,
    config: TrustConfig,
}

impl TrustLedger {
    pub fn new(store: SharedStore, config: TrustConfig) -> Self {
        Self { store, config }
    }

    /// Bucket a score using the configured thresholds.
    pub fn level_for(&self, score: i64) -> TrustLevel {
        if score >= self.config.high {
            TrustLevel::High
        } else if score >= self.config.normal {
            TrustLevel::Normal
        } else if score >= self.config.low {
            TrustLevel::Low
        } else {
            TrustLevel::Hell
        }
    }

    /// Current score, the initial score if never adjusted.
    pub async fn score(&self, user: UserId) -> EngineResult<i64> {
        let key = keys::trust(user);
        match self.store.get(&key).await? {
            Some(raw) => raw
                .parse::<i64>()
                .map(|s| s.clamp(MIN_SCORE, MAX_SCORE))
                .map_err(|e| EngineError::corrupt(key, e)),
            None => Ok(self.config.initial),
        }
    }

    /// Add `delta`, clamp to `[0, 100]` and persist. Returns the new score.
    pub async fn adjust(&self, user: UserId, delta: i64) -> EngineResult<i64> {
        let score = self
            .store
            .incr_clamped(&keys::trust(user), delta, self.config.initial, MIN_SCORE, MAX_SCORE)
            .await?;
        debug!(user = %user, delta, score, "Trust adjusted");
        Ok(score)
    }

    pub async fn level(&self, user: UserId) -> EngineResult<TrustLevel> {
        Ok(self.level_for(self.score(user).await?))
    }

    /// Forget the stored score; the user falls back to the initial score.
    pub async fn reset(&self, user: UserId) -> EngineResult<()> {
        self.store.del(&keys::trust(user)).await?;
        Ok(())
    }

    /// Points removed per distinct reporter.
    pub fn penalty_per_report(&self) -> i64 {
        self.config.penalty_per_report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn ledger() -> TrustLedger {
        let store: SharedStore = Arc::new(MemoryStore::new(Arc::new(ManualClock::default())));
        TrustLedger::new(store, TrustConfig::default())
    }

    #[test]
    fn levels_follow_thresholds() {
        let ledger = ledger();
        assert_eq!(ledger.level_for(100), TrustLevel::High);
        assert_eq!(ledger.level_for(70), TrustLevel::High);
        assert_eq!(ledger.level_for(69), TrustLevel::Normal);
        assert_eq!(ledger.level_for(40), TrustLevel::Normal);
        assert_eq!(ledger.level_for(39), TrustLevel::Low);
        assert_eq!(ledger.level_for(20), TrustLevel::Low);
        assert_eq!(ledger.level_for(19), TrustLevel::Hell);
        assert_eq!(ledger.level_for(0), TrustLevel::Hell);
    }

    #[tokio::test]
    async fn unknown_user_has_initial_score() {
        let ledger = ledger();
        assert_eq!(ledger.score(UserId(1)).await.unwrap(), 50);
        assert_eq!(ledger.level(UserId(1)).await.unwrap(), TrustLevel::Normal);
    }

    #[tokio::test]
    async fn adjust_clamps_both_ends() {
        let ledger = ledger();
        let user = UserId(1);
        assert_eq!(ledger.adjust(user, -10).await.unwrap(), 40);
        assert_eq!(ledger.adjust(user, -1000).await.unwrap(), 0);
        assert_eq!(ledger.score(user).await.unwrap(), 0);
        assert_eq!(ledger.adjust(user, 1000).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn reset_returns_to_initial() {
        let ledger = ledger();
        ledger.adjust(UserId(1), -45).await.unwrap();
        assert_eq!(ledger.level(UserId(1)).await.unwrap(), TrustLevel::Hell);
        ledger.reset(UserId(1)).await.unwrap();
        assert_eq!(ledger.score(UserId(1)).await.unwrap(), 50);
    }
}
