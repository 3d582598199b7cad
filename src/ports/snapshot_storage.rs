use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::MetricSample;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Write rejected: {0}")]
    Rejected(String),

    #[error("Invalid sample at {timestamp}: non-finite percentage")]
    InvalidSample { timestamp: DateTime<Utc> },
}

/// Outcome of reading the persisted snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotLoad {
    Loaded(Vec<MetricSample>),
    /// No snapshot, or a zero-length one
    Absent,
    /// Snapshot exists but cannot be decoded
    Corrupt(String),
}

/// Port for durable storage of the full sample sequence
pub trait SnapshotStorage: Send + Sync {
    /// Read the last persisted sequence
    fn load(&self) -> SnapshotLoad;

    /// Replace the persisted sequence; must never leave a half-written snapshot
    fn save(&self, samples: &[MetricSample]) -> Result<(), StoreError>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}

impl<T: SnapshotStorage + ?Sized> SnapshotStorage for std::sync::Arc<T> {
    fn load(&self) -> SnapshotLoad {
        (**self).load()
    }

    fn save(&self, samples: &[MetricSample]) -> Result<(), StoreError> {
        (**self).save(samples)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
