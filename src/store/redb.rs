//! Redb-backed durable store.
//!
//! Every key lives in a single `&str -> &[u8]` table; values are
//! MessagePack-encoded [`Entry`] records so TTLs survive restarts. Each
//! command or batch runs in one write transaction, which redb serializes, so
//! commands are atomic across tasks. A failing command aborts its
//! transaction.

use super::keyspace::{Entry, Keyspace, Transactional, Tx};
use super::StoreError;
use crate::clock::SharedClock;
use redb::{Database, ReadableTable, Table, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("entries");

fn db_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Database(e.to_string())
}

pub struct RedbStore {
    db: Arc<Database>,
    clock: SharedClock,
}

impl RedbStore {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>, clock: SharedClock) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(db_err)?;

        // Create the table up front so read paths never see it missing.
        let write_txn = db.begin_write().map_err(db_err)?;
        write_txn.open_table(ENTRIES).map_err(db_err)?;
        write_txn.commit().map_err(db_err)?;

        Ok(Self {
            db: Arc::new(db),
            clock,
        })
    }
}

struct TableSpace<'t> {
    table: Table<'t, &'static str, &'static [u8]>,
}

impl Keyspace for TableSpace<'_> {
    fn load(&mut self, key: &str) -> Result<Option<Entry>, StoreError> {
        let Some(raw) = self.table.get(key).map_err(db_err)? else {
            return Ok(None);
        };
        rmp_serde::from_slice(raw.value())
            .map(Some)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn save(&mut self, key: &str, entry: &Entry) -> Result<(), StoreError> {
        let bytes =
            rmp_serde::to_vec(entry).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.table
            .insert(key, bytes.as_slice())
            .map_err(db_err)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.table.remove(key).map_err(db_err)?;
        Ok(())
    }

    fn keys_with_prefix(&mut self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for item in self.table.range(prefix..).map_err(db_err)? {
            let (k, _v) = item.map_err(db_err)?;
            let key = k.value();
            if !key.starts_with(prefix) {
                break;
            }
            keys.push(key.to_string());
        }
        Ok(keys)
    }
}

impl Transactional for RedbStore {
    fn transact<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Tx<'_>) -> Result<T, StoreError>,
    {
        let now = self.clock.now_ms();
        let write_txn = self.db.begin_write().map_err(db_err)?;
        let result = {
            let table = write_txn.open_table(ENTRIES).map_err(db_err)?;
            let mut space = TableSpace { table };
            f(&mut Tx::new(&mut space, now))
        };
        match result {
            Ok(value) => {
                write_txn.commit().map_err(db_err)?;
                Ok(value)
            }
            Err(e) => {
                write_txn.abort().map_err(db_err)?;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{Store, WriteBatch};
    use std::time::Duration;

    #[tokio::test]
    async fn entries_and_ttls_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.redb");
        let clock = Arc::new(ManualClock::default());

        {
            let store = RedbStore::open(&path, clock.clone()).unwrap();
            store.set("banned:7", "spam", None).await.unwrap();
            store
                .set("cooldown:search:7", "1", Some(Duration::from_secs(3)))
                .await
                .unwrap();
            store.list_push_back("queue:general", "7").await.unwrap();
        }

        let store = RedbStore::open(&path, clock.clone()).unwrap();
        assert_eq!(store.get("banned:7").await.unwrap().as_deref(), Some("spam"));
        assert_eq!(store.list_range("queue:general").await.unwrap(), vec!["7"]);

        clock.advance(Duration::from_secs(3));
        assert!(!store.exists("cooldown:search:7").await.unwrap());
    }

    #[tokio::test]
    async fn aborted_batch_is_invisible() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(
            dir.path().join("store.redb"),
            Arc::new(ManualClock::default()),
        )
        .unwrap();
        store.list_push_back("queue:general", "1").await.unwrap();

        let batch = WriteBatch::new()
            .set("session:1:2", "{}", None)
            .del_if_eq("queue:general", "1");
        assert!(store.apply(batch).await.is_err());
        assert!(!store.exists("session:1:2").await.unwrap());
    }

    #[tokio::test]
    async fn prefix_scan_stops_at_prefix_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(
            dir.path().join("store.redb"),
            Arc::new(ManualClock::default()),
        )
        .unwrap();
        for key in ["banned:1", "banned:2", "bans", "user:1"] {
            store.set(key, "x", None).await.unwrap();
        }
        assert_eq!(
            store.scan_prefix("banned:").await.unwrap(),
            vec!["banned:1", "banned:2"]
        );
    }
}
