//! Shared key-value store abstraction.
//!
//! The engine has no in-process locks: every piece of cross-request
//! coordination is one atomic command against a [`Store`]. Commands cover
//! strings with TTL, FIFO lists, scored sets, counters and an all-or-nothing
//! write batch.
//!
//! # Backends
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     Store (trait)                    │
//! ├──────────────────────────────────────────────────────┤
//! │  blanket impl for every `Transactional` backend      │
//! │     └─ Tx: command semantics + lazy TTL expiry       │
//! ├──────────────────────────┬───────────────────────────┤
//! │ MemoryStore              │ RedbStore                 │
//! │ one mutex per command    │ one write txn per command │
//! └──────────────────────────┴───────────────────────────┘
//! ```

use crate::clock::SharedClock;
use crate::config::{StoreBackend, StoreConfig};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod keys;
pub mod keyspace;
pub mod memory;
pub mod redb;

pub use keyspace::{Entry, Keyspace, Transactional, Tx, Value};
pub use memory::MemoryStore;
pub use self::redb::RedbStore;

/// Shared store handle injected into every component.
pub type SharedStore = Arc<dyn Store>;

/// Open the backend named in `config`.
pub fn open(config: &StoreConfig, clock: SharedClock) -> Result<SharedStore, StoreError> {
    Ok(match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new(clock)),
        StoreBackend::Redb => Arc::new(RedbStore::open(&config.path, clock)?),
    })
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("wrong value type at key {0}")]
    WrongType(String),
    #[error("value at key {0} is not an integer")]
    NotAnInteger(String),
}

/// One write inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Set {
        key: String,
        value: String,
        ttl: Option<Duration>,
    },
    Del {
        key: String,
    },
    /// Delete `key` only while it still holds `expected`.
    DelIfEq {
        key: String,
        expected: String,
    },
    /// Prepend to a list, re-arming its TTL when one is given.
    ListPushFront {
        key: String,
        member: String,
        ttl: Option<Duration>,
    },
    /// Remove every occurrence of `member` from a list.
    ListRemove {
        key: String,
        member: String,
    },
}

/// Multi-key write applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>, ttl: Option<Duration>) -> Self {
        self.ops.push(WriteOp::Set {
            key: key.into(),
            value: value.into(),
            ttl,
        });
        self
    }

    pub fn del(mut self, key: impl Into<String>) -> Self {
        self.ops.push(WriteOp::Del { key: key.into() });
        self
    }

    pub fn del_if_eq(mut self, key: impl Into<String>, expected: impl Into<String>) -> Self {
        self.ops.push(WriteOp::DelIfEq {
            key: key.into(),
            expected: expected.into(),
        });
        self
    }

    pub fn list_push_front(
        mut self,
        key: impl Into<String>,
        member: impl Into<String>,
        ttl: Option<Duration>,
    ) -> Self {
        self.ops.push(WriteOp::ListPushFront {
            key: key.into(),
            member: member.into(),
            ttl,
        });
        self
    }

    pub fn list_remove(mut self, key: impl Into<String>, member: impl Into<String>) -> Self {
        self.ops.push(WriteOp::ListRemove {
            key: key.into(),
            member: member.into(),
        });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    // Strings

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Set only if the key is absent. Returns `true` when the write happened.
    async fn set_nx(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool, StoreError>;

    async fn del(&self, key: &str) -> Result<bool, StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// (Re)arm a key's TTL. Returns `false` when the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Remaining TTL, `None` when the key is absent or has no expiry.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError>;

    /// Atomic integer add; a missing key counts as zero.
    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, StoreError>;

    /// Atomic add clamped to `[min, max]`; a missing key starts at `initial`.
    async fn incr_clamped(
        &self,
        key: &str,
        delta: i64,
        initial: i64,
        min: i64,
        max: i64,
    ) -> Result<i64, StoreError>;

    // FIFO lists

    /// Append to the tail. Returns the new length.
    async fn list_push_back(&self, key: &str, member: &str) -> Result<usize, StoreError>;

    /// Prepend to the head. Returns the new length.
    async fn list_push_front(&self, key: &str, member: &str) -> Result<usize, StoreError>;

    /// Atomically remove and return the head.
    async fn list_pop_front(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Pop the head and, in the same step, set `{mark_prefix}{head}` to
    /// `mark`.
    async fn list_pop_front_marked(
        &self,
        key: &str,
        mark_prefix: &str,
        mark: &str,
        ttl: Option<Duration>,
    ) -> Result<Option<String>, StoreError>;

    /// Remove every occurrence of `member`. Returns how many were removed.
    async fn list_remove(&self, key: &str, member: &str) -> Result<usize, StoreError>;

    async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError>;

    async fn list_len(&self, key: &str) -> Result<usize, StoreError>;

    // Scored sets (member -> integer score)

    /// Upsert a member's score. Returns `true` when the member is new.
    async fn sorted_add(&self, key: &str, member: &str, score: i64) -> Result<bool, StoreError>;

    /// Remove members with `min <= score <= max`. Returns how many were removed.
    async fn sorted_trim_by_score(&self, key: &str, min: i64, max: i64) -> Result<usize, StoreError>;

    async fn sorted_len(&self, key: &str) -> Result<usize, StoreError>;

    /// Members with `min <= score <= max`, ascending by score.
    async fn sorted_range_by_score(
        &self,
        key: &str,
        min: i64,
        max: i64,
    ) -> Result<Vec<(String, i64)>, StoreError>;

    // Keyspace

    /// Live keys starting with `prefix`.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Apply every op in `batch` atomically, or none of them.
    ///
    /// Returns one flag per op telling whether it changed anything.
    async fn apply(&self, batch: WriteBatch) -> Result<Vec<bool>, StoreError>;

    /// Apply `batch` only while `guard` holds `expected`, all in one step.
    /// Returns `false` and writes nothing when the guard does not hold.
    async fn apply_if_eq(&self, guard: &str, expected: &str, batch: WriteBatch) -> Result<bool, StoreError>;

    /// Drop expired keys. Returns how many were removed.
    async fn purge_expired(&self) -> Result<usize, StoreError>;
}

#[async_trait]
impl<B: Transactional> Store for B {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.transact(|tx| tx.get(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.transact(|tx| tx.set(key, value, ttl))
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool, StoreError> {
        self.transact(|tx| tx.set_nx(key, value, ttl))
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        self.transact(|tx| tx.del(key))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.transact(|tx| tx.exists(key))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.transact(|tx| tx.expire(key, ttl))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        self.transact(|tx| tx.ttl(key))
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        self.transact(|tx| tx.incr_by(key, delta))
    }

    async fn incr_clamped(
        &self,
        key: &str,
        delta: i64,
        initial: i64,
        min: i64,
        max: i64,
    ) -> Result<i64, StoreError> {
        self.transact(|tx| tx.incr_clamped(key, delta, initial, min, max))
    }

    async fn list_push_back(&self, key: &str, member: &str) -> Result<usize, StoreError> {
        self.transact(|tx| tx.list_push_back(key, member))
    }

    async fn list_push_front(&self, key: &str, member: &str) -> Result<usize, StoreError> {
        self.transact(|tx| tx.list_push_front(key, member))
    }

    async fn list_pop_front(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.transact(|tx| tx.list_pop_front(key))
    }

    async fn list_pop_front_marked(
        &self,
        key: &str,
        mark_prefix: &str,
        mark: &str,
        ttl: Option<Duration>,
    ) -> Result<Option<String>, StoreError> {
        self.transact(|tx| tx.list_pop_front_marked(key, mark_prefix, mark, ttl))
    }

    async fn list_remove(&self, key: &str, member: &str) -> Result<usize, StoreError> {
        self.transact(|tx| tx.list_remove(key, member))
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.transact(|tx| tx.list_range(key))
    }

    async fn list_len(&self, key: &str) -> Result<usize, StoreError> {
        self.transact(|tx| tx.list_len(key))
    }

    async fn sorted_add(&self, key: &str, member: &str, score: i64) -> Result<bool, StoreError> {
        self.transact(|tx| tx.sorted_add(key, member, score))
    }

    async fn sorted_trim_by_score(&self, key: &str, min: i64, max: i64) -> Result<usize, StoreError> {
        self.transact(|tx| tx.sorted_trim_by_score(key, min, max))
    }

    async fn sorted_len(&self, key: &str) -> Result<usize, StoreError> {
        self.transact(|tx| tx.sorted_len(key))
    }

    async fn sorted_range_by_score(
        &self,
        key: &str,
        min: i64,
        max: i64,
    ) -> Result<Vec<(String, i64)>, StoreError> {
        self.transact(|tx| tx.sorted_range_by_score(key, min, max))
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.transact(|tx| tx.scan_prefix(prefix))
    }

    async fn apply(&self, batch: WriteBatch) -> Result<Vec<bool>, StoreError> {
        self.transact(|tx| tx.apply(&batch))
    }

    async fn apply_if_eq(&self, guard: &str, expected: &str, batch: WriteBatch) -> Result<bool, StoreError> {
        self.transact(|tx| tx.apply_if_eq(guard, expected, &batch))
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        self.transact(|tx| tx.purge_expired())
    }
}
