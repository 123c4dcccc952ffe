//! Per-aggregate mutual exclusion.
//!
//! Transitions on one order run one at a time; different orders never wait on
//! each other beyond the registry lookup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use marketplace_core::AggregateId;

/// Registry of one mutex per aggregate id.
#[derive(Debug, Default)]
pub struct OrderLocks {
    locks: Mutex<HashMap<AggregateId, Arc<Mutex<()>>>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, id: AggregateId) -> Result<Arc<Mutex<()>>, String> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| "lock registry poisoned".to_string())?;
        Ok(Arc::clone(locks.entry(id).or_default()))
    }

    /// Run `f` while holding the lock for `id`.
    ///
    /// A panic inside a previous holder does not wedge the order: the poisoned
    /// guard is recovered, since the event store still holds the truth.
    pub fn with_lock<T>(&self, id: AggregateId, f: impl FnOnce() -> T) -> Result<T, String> {
        let lock = self.lock_for(id)?;
        let result = {
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f()
        };
        self.release(id, &lock);
        Ok(result)
    }

    /// Drop the registry entry once nobody else holds or waits on it.
    ///
    /// Handles are only cloned under the registry lock, so a count of two
    /// (the map's and ours) cannot grow while we hold it.
    fn release(&self, id: AggregateId, lock: &Arc<Mutex<()>>) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        let idle = locks
            .get(&id)
            .is_some_and(|entry| Arc::ptr_eq(entry, lock) && Arc::strong_count(lock) == 2);
        if idle {
            locks.remove(&id);
        }
    }

    /// Number of aggregates currently locked or waited on.
    pub fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
