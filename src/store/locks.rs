use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-key async serialization.
///
/// The store offers no transactions, so the read-then-write sequences in the
/// workflow (cart merge-or-create, status patch + index mirror) are
/// serialized in-process behind a mutex keyed by user or order key. Locks are
/// created on first use and retained for the life of the process; the key
/// space (active users and orders) is small enough that no eviction is done.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `key`, waiting if another holder is active.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }
}
