//! In-memory key-value store implementation for testing.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::{check_prefix, KVError, KVResult, KVStore};

/// An in-memory key-value store backed by an ordered map.
///
/// Clones share the same underlying data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn keys_under(data: &BTreeMap<String, Vec<u8>>, prefix: &str) -> Vec<String> {
    data.range(prefix.to_string()..)
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(k, _)| k.clone())
        .collect()
}

impl KVStore for MemoryStore {
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>> {
        let data = self
            .data
            .read()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> KVResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        data.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn scan(&self, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>> {
        let data = self
            .data
            .read()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        Ok(data
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn replace_prefix(&self, prefix: &str, entries: &[(&str, &[u8])]) -> KVResult<usize> {
        check_prefix(prefix, entries)?;
        let mut data = self
            .data
            .write()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        let old = keys_under(&data, prefix);
        for key in &old {
            data.remove(key);
        }
        for (key, value) in entries {
            data.insert(key.to_string(), value.to_vec());
        }
        Ok(old.len())
    }

    fn delete_prefix(&self, prefix: &str) -> KVResult<usize> {
        let mut data = self
            .data
            .write()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        let old = keys_under(&data, prefix);
        for key in &old {
            data.remove(key);
        }
        Ok(old.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set() {
        let store = MemoryStore::new();
        store.set("key1", b"value1").unwrap();
        assert_eq!(store.get("key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(store.get("nonexistent").unwrap(), None);
    }

    #[test]
    fn test_scan_is_prefix_bounded_and_sorted() {
        let store = MemoryStore::new();
        store.set("p:b", b"2").unwrap();
        store.set("p:a", b"1").unwrap();
        store.set("q:c", b"3").unwrap();

        let results = store.scan("p:").unwrap();
        let keys: Vec<&str> = results.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["p:a", "p:b"]);
    }

    #[test]
    fn test_replace_prefix() {
        let store = MemoryStore::new();
        store.set("id:alice:1", b"a1").unwrap();
        store.set("id:alice:2", b"a2").unwrap();
        store.set("id:bob:1", b"b1").unwrap();

        let removed = store
            .replace_prefix("id:alice:", &[("id:alice:3", &b"a3"[..])])
            .unwrap();
        assert_eq!(removed, 2);

        let alice = store.scan("id:alice:").unwrap();
        assert_eq!(alice, vec![("id:alice:3".to_string(), b"a3".to_vec())]);
        assert_eq!(store.scan("id:bob:").unwrap().len(), 1);
    }

    #[test]
    fn test_replace_prefix_rejects_foreign_key() {
        let store = MemoryStore::new();
        store.set("id:alice:1", b"a1").unwrap();

        let err = store
            .replace_prefix("id:alice:", &[("id:bob:1", &b"b1"[..])])
            .unwrap_err();
        assert!(matches!(err, KVError::OutsidePrefix { .. }));
        // Nothing changed.
        assert_eq!(store.scan("id:").unwrap().len(), 1);
    }

    #[test]
    fn test_delete_prefix() {
        let store = MemoryStore::new();
        store.set("id:alice:1", b"a1").unwrap();
        store.set("id:alice:2", b"a2").unwrap();
        store.set("id:alicex:1", b"x").unwrap();

        assert_eq!(store.delete_prefix("id:alice:").unwrap(), 2);
        assert_eq!(store.delete_prefix("id:alice:").unwrap(), 0);
        assert_eq!(store.scan("id:").unwrap().len(), 1);
    }
}
