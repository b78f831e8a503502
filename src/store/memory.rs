//! Process-local store.
//!
//! One mutex guards the whole keyspace and is held for exactly one command
//! or batch. Writes are staged in an overlay and only merged into the map
//! when the command succeeds, so a failing batch leaves nothing behind.

use super::keyspace::{Entry, Keyspace, Transactional, Tx};
use super::StoreError;
use crate::clock::{SharedClock, SystemClock};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: SharedClock,
}

impl MemoryStore {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Number of stored keys, including ones that expired but were not yet
    /// purged.
    pub fn raw_len(&self) -> usize {
        self.entries.lock().len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

/// Uncommitted writes over a borrowed base map. `None` marks a removal.
struct Overlay<'a> {
    base: &'a HashMap<String, Entry>,
    writes: HashMap<String, Option<Entry>>,
}

impl Keyspace for Overlay<'_> {
    fn load(&mut self, key: &str) -> Result<Option<Entry>, StoreError> {
        match self.writes.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => Ok(self.base.get(key).cloned()),
        }
    }

    fn save(&mut self, key: &str, entry: &Entry) -> Result<(), StoreError> {
        self.writes.insert(key.to_string(), Some(entry.clone()));
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.writes.insert(key.to_string(), None);
        Ok(())
    }

    fn keys_with_prefix(&mut self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys: BTreeSet<String> = self
            .base
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for (key, staged) in &self.writes {
            if !key.starts_with(prefix) {
                continue;
            }
            match staged {
                Some(_) => keys.insert(key.clone()),
                None => keys.remove(key),
            };
        }
        Ok(keys.into_iter().collect())
    }
}

impl Transactional for MemoryStore {
    fn transact<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Tx<'_>) -> Result<T, StoreError>,
    {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();
        let mut overlay = Overlay {
            base: &*entries,
            writes: HashMap::new(),
        };
        let result = f(&mut Tx::new(&mut overlay, now))?;
        let writes = overlay.writes;
        for (key, staged) in writes {
            match staged {
                Some(entry) => {
                    entries.insert(key, entry);
                }
                None => {
                    entries.remove(&key);
                }
            }
        }
        Ok(result)
    }
}
