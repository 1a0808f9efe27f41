//! Per-cluster-name mutual exclusion
//!
//! Create, delete and batch hold the lock for a name while they touch that
//! cluster. Entries are dropped from the table once their last holder is gone.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// In-process locks keyed by cluster name.
#[derive(Clone, Default)]
pub struct NameLocks {
    table: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other holder owns `name`.
    pub async fn lock(&self, name: &str) -> NameGuard {
        // the shard guard must not be held across the await below
        let entry = self
            .table
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        NameGuard {
            name: name.to_string(),
            table: self.table.clone(),
            guard: Some(entry.lock_owned().await),
        }
    }

    /// Number of names currently locked or waited on.
    pub fn held(&self) -> usize {
        self.table.len()
    }
}

pub struct NameGuard {
    name: String,
    table: Arc<DashMap<String, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for NameGuard {
    fn drop(&mut self) {
        self.guard.take();
        // only the table still references the mutex: no holder, no waiter
        self.table
            .remove_if(&self.name, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
