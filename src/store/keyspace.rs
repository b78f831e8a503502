//! Command semantics shared by every backend.
//!
//! A backend only has to expose raw entry load/save/remove over its keyspace
//! ([`Keyspace`]) and run a closure with exclusive access to it
//! ([`Transactional`]). [`Tx`] implements the full command set on top,
//! including lazy TTL expiry: an expired entry is removed the first time a
//! command reads it.

use super::{StoreError, WriteBatch, WriteOp};
use crate::clock::millis;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

/// A stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Str(String),
    List(VecDeque<String>),
    Sorted(BTreeMap<String, i64>),
}

/// A value plus its absolute expiry (Unix ms).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub value: Value,
    pub expires_at: Option<i64>,
}

impl Entry {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now_ms)
    }
}

/// Raw entry access for one backend transaction.
pub trait Keyspace {
    fn load(&mut self, key: &str) -> Result<Option<Entry>, StoreError>;
    fn save(&mut self, key: &str, entry: &Entry) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
    /// Every stored key starting with `prefix`, expired or not.
    fn keys_with_prefix(&mut self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// A backend able to run a closure atomically against its keyspace.
///
/// The closure's writes must become visible all at once when it returns `Ok`
/// and not at all when it returns `Err`.
pub trait Transactional: Send + Sync {
    fn transact<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Tx<'_>) -> Result<T, StoreError>;
}

/// One atomic unit of work.
pub struct Tx<'a> {
    space: &'a mut dyn Keyspace,
    now_ms: i64,
}

impl<'a> Tx<'a> {
    pub fn new(space: &'a mut dyn Keyspace, now_ms: i64) -> Self {
        Self { space, now_ms }
    }

    fn expiry(&self, ttl: Option<Duration>) -> Option<i64> {
        ttl.map(|ttl| self.now_ms + millis(ttl))
    }

    fn live(&mut self, key: &str) -> Result<Option<Entry>, StoreError> {
        match self.space.load(key)? {
            Some(entry) if entry.is_expired(self.now_ms) => {
                self.space.remove(key)?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    fn live_list(&mut self, key: &str) -> Result<Option<(VecDeque<String>, Option<i64>)>, StoreError> {
        match self.live(key)? {
            None => Ok(None),
            Some(Entry {
                value: Value::List(list),
                expires_at,
            }) => Ok(Some((list, expires_at))),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn live_sorted(
        &mut self,
        key: &str,
    ) -> Result<Option<(BTreeMap<String, i64>, Option<i64>)>, StoreError> {
        match self.live(key)? {
            None => Ok(None),
            Some(Entry {
                value: Value::Sorted(set),
                expires_at,
            }) => Ok(Some((set, expires_at))),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    /// Save a collection, or drop the key once it is empty.
    fn save_or_remove(&mut self, key: &str, entry: Entry) -> Result<(), StoreError> {
        let empty = match &entry.value {
            Value::Str(_) => false,
            Value::List(list) => list.is_empty(),
            Value::Sorted(set) => set.is_empty(),
        };
        if empty {
            self.space.remove(key)
        } else {
            self.space.save(key, &entry)
        }
    }

    pub fn get(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        match self.live(key)? {
            None => Ok(None),
            Some(Entry {
                value: Value::Str(s),
                ..
            }) => Ok(Some(s)),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    pub fn set(&mut self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let entry = Entry {
            value: Value::Str(value.to_string()),
            expires_at: self.expiry(ttl),
        };
        self.space.save(key, &entry)
    }

    pub fn set_nx(&mut self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool, StoreError> {
        if self.live(key)?.is_some() {
            return Ok(false);
        }
        self.set(key, value, ttl)?;
        Ok(true)
    }

    pub fn del(&mut self, key: &str) -> Result<bool, StoreError> {
        let existed = self.live(key)?.is_some();
        if existed {
            self.space.remove(key)?;
        }
        Ok(existed)
    }

    pub fn exists(&mut self, key: &str) -> Result<bool, StoreError> {
        Ok(self.live(key)?.is_some())
    }

    pub fn expire(&mut self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let Some(mut entry) = self.live(key)? else {
            return Ok(false);
        };
        entry.expires_at = self.expiry(Some(ttl));
        self.space.save(key, &entry)?;
        Ok(true)
    }

    pub fn ttl(&mut self, key: &str) -> Result<Option<Duration>, StoreError> {
        let now = self.now_ms;
        Ok(self
            .live(key)?
            .and_then(|entry| entry.expires_at)
            .map(|at| Duration::from_millis((at - now).max(0) as u64)))
    }

    fn read_int(&mut self, key: &str) -> Result<Option<(i64, Option<i64>)>, StoreError> {
        match self.live(key)? {
            None => Ok(None),
            Some(Entry {
                value: Value::Str(s),
                expires_at,
            }) => s
                .parse::<i64>()
                .map(|n| Some((n, expires_at)))
                .map_err(|_| StoreError::NotAnInteger(key.to_string())),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    pub fn incr_by(&mut self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let (current, expires_at) = self.read_int(key)?.unwrap_or((0, None));
        let next = current.saturating_add(delta);
        self.space.save(
            key,
            &Entry {
                value: Value::Str(next.to_string()),
                expires_at,
            },
        )?;
        Ok(next)
    }

    pub fn incr_clamped(
        &mut self,
        key: &str,
        delta: i64,
        initial: i64,
        min: i64,
        max: i64,
    ) -> Result<i64, StoreError> {
        let (current, expires_at) = self.read_int(key)?.unwrap_or((initial, None));
        let next = current.saturating_add(delta).clamp(min, max);
        self.space.save(
            key,
            &Entry {
                value: Value::Str(next.to_string()),
                expires_at,
            },
        )?;
        Ok(next)
    }

    pub fn list_push_back(&mut self, key: &str, member: &str) -> Result<usize, StoreError> {
        let (mut list, expires_at) = self.live_list(key)?.unwrap_or_default();
        list.push_back(member.to_string());
        let len = list.len();
        self.space.save(
            key,
            &Entry {
                value: Value::List(list),
                expires_at,
            },
        )?;
        Ok(len)
    }

    pub fn list_push_front(&mut self, key: &str, member: &str) -> Result<usize, StoreError> {
        let (mut list, expires_at) = self.live_list(key)?.unwrap_or_default();
        list.push_front(member.to_string());
        let len = list.len();
        self.space.save(
            key,
            &Entry {
                value: Value::List(list),
                expires_at,
            },
        )?;
        Ok(len)
    }

    pub fn list_pop_front(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        let Some((mut list, expires_at)) = self.live_list(key)? else {
            return Ok(None);
        };
        let head = list.pop_front();
        self.save_or_remove(
            key,
            Entry {
                value: Value::List(list),
                expires_at,
            },
        )?;
        Ok(head)
    }

    pub fn list_pop_front_marked(
        &mut self,
        key: &str,
        mark_prefix: &str,
        mark: &str,
        ttl: Option<Duration>,
    ) -> Result<Option<String>, StoreError> {
        let head = self.list_pop_front(key)?;
        if let Some(member) = &head {
            self.set(&format!("{mark_prefix}{member}"), mark, ttl)?;
        }
        Ok(head)
    }

    pub fn list_remove(&mut self, key: &str, member: &str) -> Result<usize, StoreError> {
        let Some((mut list, expires_at)) = self.live_list(key)? else {
            return Ok(0);
        };
        let before = list.len();
        list.retain(|m| m != member);
        let removed = before - list.len();
        if removed > 0 {
            self.save_or_remove(
                key,
                Entry {
                    value: Value::List(list),
                    expires_at,
                },
            )?;
        }
        Ok(removed)
    }

    pub fn list_range(&mut self, key: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .live_list(key)?
            .map(|(list, _)| list.into_iter().collect())
            .unwrap_or_default())
    }

    pub fn list_len(&mut self, key: &str) -> Result<usize, StoreError> {
        Ok(self.live_list(key)?.map_or(0, |(list, _)| list.len()))
    }

    pub fn sorted_add(&mut self, key: &str, member: &str, score: i64) -> Result<bool, StoreError> {
        let (mut set, expires_at) = self.live_sorted(key)?.unwrap_or_default();
        let is_new = set.insert(member.to_string(), score).is_none();
        self.space.save(
            key,
            &Entry {
                value: Value::Sorted(set),
                expires_at,
            },
        )?;
        Ok(is_new)
    }

    pub fn sorted_trim_by_score(&mut self, key: &str, min: i64, max: i64) -> Result<usize, StoreError> {
        let Some((mut set, expires_at)) = self.live_sorted(key)? else {
            return Ok(0);
        };
        let before = set.len();
        set.retain(|_, score| *score < min || *score > max);
        let removed = before - set.len();
        if removed > 0 {
            self.save_or_remove(
                key,
                Entry {
                    value: Value::Sorted(set),
                    expires_at,
                },
            )?;
        }
        Ok(removed)
    }

    pub fn sorted_len(&mut self, key: &str) -> Result<usize, StoreError> {
        Ok(self.live_sorted(key)?.map_or(0, |(set, _)| set.len()))
    }

    pub fn sorted_range_by_score(
        &mut self,
        key: &str,
        min: i64,
        max: i64,
    ) -> Result<Vec<(String, i64)>, StoreError> {
        let Some((set, _)) = self.live_sorted(key)? else {
            return Ok(Vec::new());
        };
        let mut members: Vec<(String, i64)> = set
            .into_iter()
            .filter(|(_, score)| (min..=max).contains(score))
            .collect();
        members.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        Ok(members)
    }

    pub fn scan_prefix(&mut self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut live = Vec::new();
        for key in self.space.keys_with_prefix(prefix)? {
            if self.live(&key)?.is_some() {
                live.push(key);
            }
        }
        Ok(live)
    }

    pub fn apply(&mut self, batch: &WriteBatch) -> Result<Vec<bool>, StoreError> {
        let mut changed = Vec::with_capacity(batch.ops().len());
        for op in batch.ops() {
            let effect = match op {
                WriteOp::Set { key, value, ttl } => {
                    self.set(key, value, *ttl)?;
                    true
                }
                WriteOp::Del { key } => self.del(key)?,
                WriteOp::DelIfEq { key, expected } => {
                    let matches = self.get(key)?.as_deref() == Some(expected.as_str());
                    if matches {
                        self.space.remove(key)?;
                    }
                    matches
                }
                WriteOp::ListPushFront { key, member, ttl } => {
                    self.list_push_front(key, member)?;
                    if let Some(ttl) = ttl {
                        self.expire(key, *ttl)?;
                    }
                    true
                }
                WriteOp::ListRemove { key, member } => self.list_remove(key, member)? > 0,
            };
            changed.push(effect);
        }
        Ok(changed)
    }

    pub fn apply_if_eq(
        &mut self,
        guard: &str,
        expected: &str,
        batch: &WriteBatch,
    ) -> Result<bool, StoreError> {
        if self.get(guard)?.as_deref() != Some(expected) {
            return Ok(false);
        }
        self.apply(batch)?;
        Ok(true)
    }

    pub fn purge_expired(&mut self) -> Result<usize, StoreError> {
        let mut purged = 0;
        for key in self.space.keys_with_prefix("")? {
            if let Some(entry) = self.space.load(&key)?
                && entry.is_expired(self.now_ms)
            {
                self.space.remove(&key)?;
                purged += 1;
            }
        }
        Ok(purged)
    }
}
