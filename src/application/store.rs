use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::domain::{MetricSample, SummaryStatistics};
use crate::ports::{SnapshotLoad, SnapshotStorage, StoreError};

/// How long samples are kept, per deployment profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionProfile {
    /// Long-lived analytics window (30 days)
    Analytics,
    /// Short operational window (7 days)
    Operational,
}

impl RetentionProfile {
    pub fn window(&self) -> Duration {
        match self {
            RetentionProfile::Analytics => Duration::days(30),
            RetentionProfile::Operational => Duration::days(7),
        }
    }
}

/// Append-only, retention-bounded, persisted sequence of samples
pub struct MetricsStore {
    samples: Vec<MetricSample>,
    retention: Duration,
    storage: Box<dyn SnapshotStorage>,
}

impl MetricsStore {
    /// Open the store, reconstructing the last persisted state.
    /// An absent or corrupt snapshot yields an empty store which is persisted immediately.
    pub fn open(storage: Box<dyn SnapshotStorage>, retention: Duration) -> Self {
        let samples = match storage.load() {
            SnapshotLoad::Loaded(samples) => {
                info!(samples = samples.len(), location = %storage.describe(), "Loaded metrics snapshot");
                return Self {
                    samples,
                    retention,
                    storage,
                };
            }
            SnapshotLoad::Absent => {
                info!(location = %storage.describe(), "No metrics snapshot, starting empty");
                Vec::new()
            }
            SnapshotLoad::Corrupt(reason) => {
                warn!(location = %storage.describe(), %reason, "Metrics snapshot unreadable, starting empty");
                Vec::new()
            }
        };

        let store = Self {
            samples,
            retention,
            storage,
        };
        if let Err(e) = store.persist() {
            warn!(error = %e, "Failed to persist empty metrics snapshot");
        }
        store
    }

    /// Append a sample, purge expired ones and persist.
    /// The in-memory sequence keeps the append even when persisting fails.
    /// Samples with a non-finite percentage are refused and leave the store untouched.
    pub fn append(&mut self, sample: MetricSample) -> Result<(), StoreError> {
        self.append_at(sample, Utc::now())
    }

    pub fn append_at(&mut self, sample: MetricSample, now: DateTime<Utc>) -> Result<(), StoreError> {
        if !sample.is_finite() {
            return Err(StoreError::InvalidSample {
                timestamp: sample.timestamp,
            });
        }
        self.samples.push(sample);

        let purged = self.purge(now);
        if purged > 0 {
            debug!(purged, remaining = self.samples.len(), "Purged expired samples");
        }

        self.persist()
    }

    /// Drop every sample older than `now - retention`
    fn purge(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.retention;
        let before = self.samples.len();
        self.samples.retain(|s| s.timestamp >= cutoff);
        before - self.samples.len()
    }

    /// Write the full sequence to durable storage
    pub fn persist(&self) -> Result<(), StoreError> {
        self.storage.save(&self.samples)
    }

    pub fn latest(&self) -> Option<&MetricSample> {
        self.samples.last()
    }

    /// Contiguous suffix of samples with `timestamp >= since`, in order
    pub fn window(&self, since: DateTime<Utc>) -> &[MetricSample] {
        let start = self.samples.partition_point(|s| s.timestamp < since);
        &self.samples[start..]
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    pub fn summary_statistics(&self) -> Option<SummaryStatistics> {
        SummaryStatistics::from_samples(&self.samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
