use crate::error::Result;
use crate::record::IdentityEntry;

/// Durable storage behind an [`IdentityStore`](crate::IdentityStore).
///
/// The store keeps the authoritative in-memory index and calls the backend
/// while holding the identity's write lock, so a backend never sees two
/// concurrent mutations of the same identity. Mutations of different
/// identities may arrive concurrently.
pub trait StoreBackend: Send + Sync {
    /// Reads every persisted entry. Called once when the store opens.
    fn load(&self) -> Result<Vec<IdentityEntry>>;

    /// Durably replaces all records of `entry.identity()` with `entry`'s.
    /// Must be atomic: after a crash either the old or the new set survives.
    fn replace(&self, entry: &IdentityEntry) -> Result<()>;

    /// Durably deletes an identity. Returns the number of records removed.
    fn remove(&self, identity: &str) -> Result<usize>;
}

/// A [`StoreBackend`] that persists nothing.
/// Data is lost on restart. Suitable for testing or ephemeral use.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryBackend;

impl StoreBackend for MemoryBackend {
    fn load(&self) -> Result<Vec<IdentityEntry>> {
        Ok(Vec::new())
    }

    fn replace(&self, _entry: &IdentityEntry) -> Result<()> {
        Ok(())
    }

    fn remove(&self, _identity: &str) -> Result<usize> {
        Ok(0)
    }
}
