use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::backend::{MemoryBackend, StoreBackend};
use crate::error::{GalleryError, Result};
use crate::locks::KeyedLocks;
use crate::naming::validate_identity;
use crate::record::{EnrollmentRecord, IdentityEntry};

/// Mapping from identity name to its enrolled records.
///
/// Thread-safe: reads run in parallel with each other and with writes;
/// writes to different identities run in parallel; writes to the same
/// identity are serialized. Each identity's entry is an immutable snapshot
/// swapped in whole, so no reader sees a mix of old and new records.
pub struct IdentityStore {
    dim: usize,
    entries: RwLock<BTreeMap<String, Arc<IdentityEntry>>>,
    writers: KeyedLocks,
    backend: Box<dyn StoreBackend>,
}

impl IdentityStore {
    /// Opens a store over `backend`, loading whatever it has persisted.
    ///
    /// Fails if `dim` is 0 or a persisted record has a different dimension.
    pub fn open(dim: usize, backend: Box<dyn StoreBackend>) -> Result<Self> {
        if dim == 0 {
            return Err(GalleryError::invalid("dim must be positive"));
        }

        let mut entries = BTreeMap::new();
        for entry in backend.load()? {
            for rec in entry.records() {
                if rec.vector.dim() != dim {
                    return Err(GalleryError::Storage(format!(
                        "persisted record {:?}/{:?} has dimension {}, store expects {dim}",
                        entry.identity(),
                        rec.source_ref,
                        rec.vector.dim()
                    )));
                }
            }
            entries.insert(entry.identity().to_string(), Arc::new(entry));
        }
        debug!(identities = entries.len(), dim, "identity store opened");

        Ok(Self {
            dim,
            entries: RwLock::new(entries),
            writers: KeyedLocks::default(),
            backend,
        })
    }

    /// Creates an empty store with no persistence.
    pub fn in_memory(dim: usize) -> Result<Self> {
        Self::open(dim, Box::new(MemoryBackend))
    }

    /// Embedding dimension every record must have.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Replaces the entire record set for `identity` with `records`.
    ///
    /// The previous records (if any) are discarded in the same step.
    pub fn put(&self, identity: &str, records: Vec<EnrollmentRecord>) -> Result<Arc<IdentityEntry>> {
        validate_identity(identity)?;
        if let Some(rec) = records.iter().find(|r| r.vector.dim() != self.dim) {
            return Err(GalleryError::DimensionMismatch {
                expected: self.dim,
                got: rec.vector.dim(),
            });
        }
        let entry = Arc::new(IdentityEntry::new(identity, records)?);

        let _guard = self.writers.lock(identity);
        self.backend.replace(&entry)?;
        let previous = self
            .entries
            .write()
            .insert(identity.to_string(), Arc::clone(&entry));

        info!(
            identity,
            records = entry.len(),
            replaced = previous.map_or(0, |p| p.len()),
            "identity stored"
        );
        Ok(entry)
    }

    /// Returns the entry for `identity`.
    pub fn get(&self, identity: &str) -> Result<Arc<IdentityEntry>> {
        self.entries
            .read()
            .get(identity)
            .cloned()
            .ok_or_else(|| GalleryError::NotFound(identity.to_string()))
    }

    /// Deletes `identity`. Returns the number of records removed.
    pub fn remove(&self, identity: &str) -> Result<usize> {
        let _guard = self.writers.lock(identity);
        let count = self.get(identity)?.len();

        let persisted = self.backend.remove(identity)?;
        self.entries.write().remove(identity);

        info!(identity, records = count, persisted, "identity removed");
        Ok(count)
    }

    /// Returns all identity names in ascending order.
    pub fn list_identities(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Returns a snapshot of every record in the store.
    ///
    /// Iteration order is identity name, then enrollment order. Later writes
    /// do not affect an existing snapshot.
    pub fn all_records(&self) -> Snapshot {
        Snapshot {
            entries: self.entries.read().values().cloned().collect(),
        }
    }

    /// Number of identities.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no identity is enrolled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of records across all identities.
    pub fn record_count(&self) -> usize {
        self.entries.read().values().map(|e| e.len()).sum()
    }
}

/// Point-in-time view of the store, produced by [`IdentityStore::all_records`].
#[derive(Debug, Clone)]
pub struct Snapshot {
    entries: Vec<Arc<IdentityEntry>>,
}

impl Snapshot {
    /// Yields `(identity, record)` pairs. Can be called any number of times.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EnrollmentRecord)> + '_ {
        self.entries
            .iter()
            .flat_map(|e| e.records().iter().map(move |r| (e.identity(), r)))
    }

    pub fn entries(&self) -> &[Arc<IdentityEntry>] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
