//! Key-value store interface and implementations.
//!
//! Keys are strings grouped by `:`-separated prefixes; values are opaque
//! bytes. Besides point reads and writes, every store supports replacing or
//! deleting everything under a prefix as one atomic step, which is what the
//! identity gallery uses to swap an identity's records in a single commit.

pub mod memory;
pub mod redb;

use std::fmt;
use thiserror::Error;

/// Errors that can occur in KV store operations.
#[derive(Error, Debug)]
pub enum KVError {
    #[error("kv: storage error: {0}")]
    Storage(String),

    #[error("kv: key {key:?} is outside prefix {prefix:?}")]
    OutsidePrefix { key: String, prefix: String },
}

/// Result type for KV operations.
pub type KVResult<T> = Result<T, KVError>;

/// Key-value store trait.
pub trait KVStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>>;

    /// Set a key-value pair.
    fn set(&self, key: &str, value: &[u8]) -> KVResult<()>;

    /// Return all pairs whose key starts with `prefix`, in ascending key order.
    fn scan(&self, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>>;

    /// Atomically delete every key under `prefix` and insert `entries`.
    ///
    /// Every entry key must itself start with `prefix`. Returns the number of
    /// keys that existed under the prefix before the call. Readers observe
    /// either the old set or the new set, never a mix.
    fn replace_prefix(&self, prefix: &str, entries: &[(&str, &[u8])]) -> KVResult<usize>;

    /// Atomically delete every key under `prefix`. Returns how many were removed.
    fn delete_prefix(&self, prefix: &str) -> KVResult<usize>;
}

impl fmt::Debug for dyn KVStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KVStore {{ ... }}")
    }
}

pub(crate) fn check_prefix(prefix: &str, entries: &[(&str, &[u8])]) -> KVResult<()> {
    match entries.iter().find(|(k, _)| !k.starts_with(prefix)) {
        Some((key, _)) => Err(KVError::OutsidePrefix {
            key: key.to_string(),
            prefix: prefix.to_string(),
        }),
        None => Ok(()),
    }
}

pub use memory::MemoryStore;
pub use redb::RedbStore;
