use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::domain::MetricSample;
use crate::ports::{SnapshotLoad, SnapshotStorage, StoreError};

/// In-process snapshot storage for ephemeral deployments
pub struct MemoryStorage {
    snapshot: RwLock<Option<Vec<MetricSample>>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(None),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Start from an already-persisted sequence
    #[cfg(test)]
    pub fn with_samples(samples: Vec<MetricSample>) -> Self {
        let storage = Self::new();
        *storage.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Some(samples);
        storage
    }

    /// Make subsequent saves fail, leaving the last snapshot in place
    #[cfg(test)]
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Copy of the last saved sequence
    pub fn saved(&self) -> Option<Vec<MetricSample>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStorage for MemoryStorage {
    fn load(&self) -> SnapshotLoad {
        match self.saved() {
            Some(samples) => SnapshotLoad::Loaded(samples),
            None => SnapshotLoad::Absent,
        }
    }

    fn save(&self, samples: &[MetricSample]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("memory storage is read-only".to_string()));
        }

        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Some(samples.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory (not persisted)".to_string()
    }
}
