//! in-memory replicated store.
//!
//! writes land on a primary map. stale reads are served from a replica map
//! that is either updated on every write or only when [`MemoryStore::replicate`]
//! is called, which lets tests reproduce replication lag deterministically.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{KvStore, ReadConsistency, Result, Versioned};

/// how writes reach the replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationMode {
    /// every write is applied to the replica immediately.
    Synchronous,
    /// the replica only catches up on [`MemoryStore::replicate`].
    Manual,
}

type Entries = HashMap<String, Versioned>;

struct Inner {
    primary: RwLock<Entries>,
    replica: RwLock<Entries>,
    mode: ReplicationMode,
}

/// in-memory key-value store with a primary and one replica.
///
/// cloning is cheap and clones share state.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// create an empty store.
    pub fn new(mode: ReplicationMode) -> Self {
        Self {
            inner: Arc::new(Inner {
                primary: RwLock::new(HashMap::new()),
                replica: RwLock::new(HashMap::new()),
                mode,
            }),
        }
    }

    /// bring the replica up to date with the primary.
    pub fn replicate(&self) {
        let primary = read(&self.inner.primary).clone();
        *write(&self.inner.replica) = primary;
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(ReplicationMode::Synchronous)
    }
}

impl KvStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn get(&self, key: &str, consistency: ReadConsistency) -> Result<Option<Versioned>> {
        let entries = match consistency {
            ReadConsistency::Stale => read(&self.inner.replica),
            ReadConsistency::Linearizable => read(&self.inner.primary),
        };
        Ok(entries.get(key).cloned())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: Vec<u8>,
    ) -> Result<bool> {
        let mut primary = write(&self.inner.primary);
        let current = primary.get(key).map(|v| v.version);
        if current != expected_version {
            return Ok(false);
        }

        let entry = Versioned {
            value,
            version: current.unwrap_or(0) + 1,
        };
        if self.inner.mode == ReplicationMode::Synchronous {
            write(&self.inner.replica).insert(key.to_string(), entry.clone());
        }
        primary.insert(key.to_string(), entry);
        Ok(true)
    }
}

// a panic while holding one of these locks cannot leave a map half-updated,
// so poisoning is ignored.
fn read(lock: &RwLock<Entries>) -> RwLockReadGuard<'_, Entries> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write(lock: &RwLock<Entries>) -> RwLockWriteGuard<'_, Entries> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
