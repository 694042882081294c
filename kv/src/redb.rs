//! Redb-based persistent key-value store implementation.

use std::fmt::Display;
use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};

use crate::{check_prefix, KVError, KVResult, KVStore};

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

fn storage<E: Display>(e: E) -> KVError {
    KVError::Storage(e.to_string())
}

/// A persistent key-value store backed by redb.
///
/// Each mutating call is a single write transaction, so prefix replacement
/// is durable and atomic. The database file is closed when the store drops.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create a redb store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> KVResult<Self> {
        let db = Database::create(path).map_err(storage)?;

        // Create the table if it doesn't exist
        let tx = db.begin_write().map_err(storage)?;
        {
            let _ = tx.open_table(TABLE).map_err(storage)?;
        }
        tx.commit().map_err(storage)?;

        Ok(Self { db })
    }
}

fn keys_under<T>(table: &T, prefix: &str) -> KVResult<Vec<String>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let mut keys = Vec::new();
    for item in table.range(prefix..).map_err(storage)? {
        let (key, _) = item.map_err(storage)?;
        let key = key.value();
        if !key.starts_with(prefix) {
            break;
        }
        keys.push(key.to_string());
    }
    Ok(keys)
}

impl KVStore for RedbStore {
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(TABLE).map_err(storage)?;
        Ok(table
            .get(key)
            .map_err(storage)?
            .map(|value| value.value().to_vec()))
    }

    fn set(&self, key: &str, value: &[u8]) -> KVResult<()> {
        let tx = self.db.begin_write().map_err(storage)?;
        {
            let mut table = tx.open_table(TABLE).map_err(storage)?;
            table.insert(key, value).map_err(storage)?;
        }
        tx.commit().map_err(storage)
    }

    fn scan(&self, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(TABLE).map_err(storage)?;

        let mut results = Vec::new();
        for item in table.range(prefix..).map_err(storage)? {
            let (key, value) = item.map_err(storage)?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_string(), value.value().to_vec()));
        }
        Ok(results)
    }

    fn replace_prefix(&self, prefix: &str, entries: &[(&str, &[u8])]) -> KVResult<usize> {
        check_prefix(prefix, entries)?;
        let tx = self.db.begin_write().map_err(storage)?;
        let removed = {
            let mut table = tx.open_table(TABLE).map_err(storage)?;
            let old = keys_under(&table, prefix)?;
            for key in &old {
                table.remove(key.as_str()).map_err(storage)?;
            }
            for (key, value) in entries {
                table.insert(*key, *value).map_err(storage)?;
            }
            old.len()
        };
        tx.commit().map_err(storage)?;
        Ok(removed)
    }

    fn delete_prefix(&self, prefix: &str) -> KVResult<usize> {
        let tx = self.db.begin_write().map_err(storage)?;
        let removed = {
            let mut table = tx.open_table(TABLE).map_err(storage)?;
            let old = keys_under(&table, prefix)?;
            for key in &old {
                table.remove(key.as_str()).map_err(storage)?;
            }
            old.len()
        };
        tx.commit().map_err(storage)?;
        Ok(removed)
    }
}
