//! Symmetric session registry.
//!
//! A session is one record under `session:{lo}:{hi}` plus a back-reference
//! `user:{id}` for each participant pointing at that key. Every write that
//! touches more than one of those keys goes through a single
//! [`WriteBatch`], so no reader ever observes half a session.
//!
//! ## Invariants
//!
//! - If `user:{a}` resolves to session S, S lists `a`, and `user:{b}` for the
//!   other member of S resolves to S as well, or is absent after a one-sided
//!   teardown.
//! - A back-reference whose session is gone is dangling; it resolves to no
//!   partner and is removed on first read.

use super::UserId;
use crate::clock::SharedClock;
use crate::error::{EngineError, EngineResult};
use crate::store::{SharedStore, WriteBatch, keys};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Stored session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_a: UserId,
    pub user_b: UserId,
    /// Unix ms.
    pub created_at: i64,
}

impl SessionRecord {
    /// The member that is not `user`, if `user` is a member at all.
    pub fn other(&self, user: UserId) -> Option<UserId> {
        if self.user_a == user {
            Some(self.user_b)
        } else if self.user_b == user {
            Some(self.user_a)
        } else {
            None
        }
    }
}

pub struct SessionRegistry {
    store: SharedStore,
    clock: SharedClock,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(store: SharedStore, clock: SharedClock, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    fn link(&self, a: UserId, b: UserId) -> EngineResult<(SessionRecord, WriteBatch)> {
        let key = keys::session(a, b);
        let record = SessionRecord {
            user_a: a,
            user_b: b,
            created_at: self.clock.now_ms(),
        };
        let raw = serde_json::to_string(&record).map_err(|e| EngineError::corrupt(&key, e))?;
        let ttl = Some(self.ttl);

        let batch = WriteBatch::new()
            .set(&key, raw, ttl)
            .set(keys::user(a), &key, ttl)
            .set(keys::user(b), &key, ttl);
        Ok((record, batch))
    }

    /// Link `a` and `b` in one atomic batch.
    pub async fn create(&self, a: UserId, b: UserId) -> EngineResult<SessionRecord> {
        let (record, batch) = self.link(a, b)?;
        self.store.apply(batch).await?;

        info!(user_a = %a, user_b = %b, "Session created");
        Ok(record)
    }

    /// Link `a` and `b` only while `guard` still holds `expected`, consuming
    /// the guard in the same batch. `None` when the guard was gone.
    pub async fn create_guarded(
        &self,
        a: UserId,
        b: UserId,
        guard: &str,
        expected: &str,
    ) -> EngineResult<Option<SessionRecord>> {
        let (record, batch) = self.link(a, b)?;
        if !self
            .store
            .apply_if_eq(guard, expected, batch.del(guard))
            .await?
        {
            debug!(user_a = %a, user_b = %b, guard, "Session guard no longer held");
            return Ok(None);
        }

        info!(user_a = %a, user_b = %b, "Session created");
        Ok(Some(record))
    }

    /// Resolve `user`'s back-reference to its session key and record.
    ///
    /// Dangling back-references are cleaned up and resolve to `None`.
    async fn resolve(&self, user: UserId) -> EngineResult<Option<(String, SessionRecord)>> {
        let user_key = keys::user(user);
        let Some(session_key) = self.store.get(&user_key).await? else {
            return Ok(None);
        };

        let record = match self.store.get(&session_key).await? {
            Some(raw) => serde_json::from_str::<SessionRecord>(&raw)
                .map_err(|e| EngineError::corrupt(&session_key, e))?,
            None => {
                self.drop_back_reference(user, &session_key).await?;
                return Ok(None);
            }
        };

        if record.other(user).is_none() {
            self.drop_back_reference(user, &session_key).await?;
            return Ok(None);
        }
        Ok(Some((session_key, record)))
    }

    async fn drop_back_reference(&self, user: UserId, session_key: &str) -> EngineResult<()> {
        debug!(user = %user, session = %session_key, "Dropping dangling back-reference");
        self.store
            .apply(WriteBatch::new().del_if_eq(keys::user(user), session_key))
            .await?;
        Ok(())
    }

    pub async fn partner_of(&self, user: UserId) -> EngineResult<Option<UserId>> {
        Ok(self
            .resolve(user)
            .await?
            .and_then(|(_, record)| record.other(user)))
    }

    pub async fn is_in_session(&self, user: UserId) -> EngineResult<bool> {
        Ok(self.resolve(user).await?.is_some())
    }

    /// End `user`'s session for both sides.
    ///
    /// Returns the former partner, or `None` when `user` was not in a chat.
    /// The partner's back-reference is only removed while it still points at
    /// this session.
    pub async fn terminate(&self, user: UserId) -> EngineResult<Option<UserId>> {
        let Some((session_key, record)) = self.resolve(user).await? else {
            return Ok(None);
        };
        let partner = record.other(user);

        let mut batch = WriteBatch::new()
            .del(&session_key)
            .del(keys::user(user));
        if let Some(partner) = partner {
            batch = batch.del_if_eq(keys::user(partner), &session_key);
        }
        self.store.apply(batch).await?;

        info!(user = %user, partner = ?partner.map(|p| p.0), session = %session_key, "Session terminated");
        Ok(partner)
    }

    /// Sender-side teardown after the partner became unreachable.
    ///
    /// Removes the session and `user`'s back-reference only; the partner's
    /// back-reference is left to dangle and is cleaned up on their next read.
    pub async fn detach(&self, user: UserId) -> EngineResult<Option<UserId>> {
        let user_key = keys::user(user);
        let Some(session_key) = self.store.get(&user_key).await? else {
            return Ok(None);
        };
        let partner = self
            .store
            .get(&session_key)
            .await?
            .and_then(|raw| serde_json::from_str::<SessionRecord>(&raw).ok())
            .and_then(|record| record.other(user));

        self.store
            .apply(WriteBatch::new().del(&session_key).del(user_key))
            .await?;

        info!(user = %user, session = %session_key, "Session detached by sender");
        Ok(partner)
    }

    /// Number of live sessions.
    pub async fn count(&self) -> EngineResult<usize> {
        Ok(self.store.scan_prefix(keys::SESSION_PREFIX).await?.len())
    }
}
