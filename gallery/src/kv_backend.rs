use std::collections::BTreeMap;
use std::path::Path;

use faceid_kv::{KVStore, RedbStore};

use crate::backend::StoreBackend;
use crate::error::{GalleryError, Result};
use crate::record::{EnrollmentRecord, IdentityEntry};

/// Default key prefix for gallery documents.
pub const DEFAULT_PREFIX: &str = "faceid";

const SCHEMA_VERSION: &str = "1";

/// Document-store [`StoreBackend`] over any [`KVStore`].
///
/// Each record is one msgpack document:
///
/// ```text
/// {prefix}:meta:version        -> "1"
/// {prefix}:rec:{identity}:{n}  -> EnrollmentRecord (n = zero-padded position)
/// ```
///
/// Replacing an identity is a single `replace_prefix` call, which the redb
/// store commits as one write transaction.
pub struct KvBackend {
    kv: Box<dyn KVStore>,
    prefix: String,
}

impl KvBackend {
    pub fn new(kv: Box<dyn KVStore>) -> Result<Self> {
        Self::with_prefix(kv, DEFAULT_PREFIX)
    }

    pub fn with_prefix(kv: Box<dyn KVStore>, prefix: &str) -> Result<Self> {
        let backend = Self {
            kv,
            prefix: prefix.to_string(),
        };
        backend.check_version()?;
        Ok(backend)
    }

    /// Opens (or creates) a redb database file at `path`.
    pub fn open_redb<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(Box::new(RedbStore::open(path)?))
    }

    fn check_version(&self) -> Result<()> {
        let key = format!("{}:meta:version", self.prefix);
        match self.kv.get(&key)? {
            None => Ok(self.kv.set(&key, SCHEMA_VERSION.as_bytes())?),
            Some(v) if v == SCHEMA_VERSION.as_bytes() => Ok(()),
            Some(v) => Err(GalleryError::Storage(format!(
                "unsupported schema version {:?}",
                String::from_utf8_lossy(&v)
            ))),
        }
    }

    fn records_prefix(&self) -> String {
        format!("{}:rec:", self.prefix)
    }

    fn identity_prefix(&self, identity: &str) -> String {
        format!("{}:rec:{identity}:", self.prefix)
    }
}

impl StoreBackend for KvBackend {
    fn load(&self) -> Result<Vec<IdentityEntry>> {
        let mut grouped: BTreeMap<String, Vec<EnrollmentRecord>> = BTreeMap::new();
        for (key, value) in self.kv.scan(&self.records_prefix())? {
            let rec: EnrollmentRecord = rmp_serde::from_slice(&value)
                .map_err(|e| GalleryError::Storage(format!("decode {key}: {e}")))?;
            grouped.entry(rec.identity.clone()).or_default().push(rec);
        }
        grouped
            .into_iter()
            .map(|(identity, records)| {
                IdentityEntry::new(identity, records)
                    .map_err(|e| GalleryError::Storage(e.to_string()))
            })
            .collect()
    }

    fn replace(&self, entry: &IdentityEntry) -> Result<()> {
        let prefix = self.identity_prefix(entry.identity());
        let mut docs = Vec::with_capacity(entry.len());
        for (i, rec) in entry.records().iter().enumerate() {
            let data = rmp_serde::to_vec_named(rec)
                .map_err(|e| GalleryError::Storage(e.to_string()))?;
            docs.push((format!("{prefix}{i:06}"), data));
        }
        let pairs: Vec<(&str, &[u8])> = docs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
            .collect();
        self.kv.replace_prefix(&prefix, &pairs)?;
        Ok(())
    }

    fn remove(&self, identity: &str) -> Result<usize> {
        Ok(self.kv.delete_prefix(&self.identity_prefix(identity))?)
    }
}
