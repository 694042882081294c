use std::collections::HashSet;

use parking_lot::{Condvar, Mutex};

/// Per-key exclusive locks.
///
/// Holders of different keys never wait on each other; a second holder of
/// the same key blocks until the first guard drops.
#[derive(Default)]
pub(crate) struct KeyedLocks {
    busy: Mutex<HashSet<String>>,
    released: Condvar,
}

pub(crate) struct KeyGuard<'a> {
    owner: &'a KeyedLocks,
    key: String,
}

impl KeyedLocks {
    pub(crate) fn lock(&self, key: &str) -> KeyGuard<'_> {
        let mut busy = self.busy.lock();
        while busy.contains(key) {
            self.released.wait(&mut busy);
        }
        busy.insert(key.to_string());
        KeyGuard {
            owner: self,
            key: key.to_string(),
        }
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.owner.busy.lock().remove(&self.key);
        self.owner.released.notify_all();
    }
}
