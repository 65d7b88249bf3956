//! Per-table serialization.
//!
//! Hands out one async mutex per fully-qualified table name so a full sync
//! and a statistics refresh of the same table never interleave.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tokio::sync::OwnedMutexGuard;

/// Entries are pruned once the registry grows past this size.
const PRUNE_THRESHOLD: usize = 256;

type LockMap = HashMap<String, Arc<tokio::sync::Mutex<()>>>;

/// Registry of per-table locks. Clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct TableLocks {
    inner: Arc<Mutex<LockMap>>,
}

impl TableLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static TableLocks {
        static GLOBAL: OnceLock<TableLocks> = OnceLock::new();
        GLOBAL.get_or_init(TableLocks::new)
    }

    /// Waits for exclusive access to `full_name`.
    pub async fn lock(&self, full_name: &str) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            if map.len() >= PRUNE_THRESHOLD {
                map.retain(|_, m| Arc::strong_count(m) > 1);
            }
            Arc::clone(map.entry(full_name.to_string()).or_default())
        };
        mutex.lock_owned().await
    }

    /// Number of tracked names.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
