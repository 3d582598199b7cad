use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::MetricSample;
use crate::ports::{SnapshotLoad, SnapshotStorage, StoreError};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    samples: &'a [MetricSample],
}

#[derive(Deserialize)]
struct SnapshotOwned {
    version: u32,
    samples: Vec<MetricSample>,
}

/// Snapshot storage backed by a single JSON file, replaced atomically
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStorage for JsonFileStorage {
    fn load(&self) -> SnapshotLoad {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return SnapshotLoad::Absent,
            Err(e) => return SnapshotLoad::Corrupt(format!("unreadable: {}", e)),
        };

        if data.is_empty() {
            return SnapshotLoad::Absent;
        }

        match serde_json::from_slice::<SnapshotOwned>(&data) {
            Ok(snapshot) if snapshot.version == SNAPSHOT_VERSION => {
                SnapshotLoad::Loaded(snapshot.samples)
            }
            Ok(snapshot) => {
                SnapshotLoad::Corrupt(format!("unsupported version {}", snapshot.version))
            }
            Err(e) => SnapshotLoad::Corrupt(e.to_string()),
        }
    }

    fn save(&self, samples: &[MetricSample]) -> Result<(), StoreError> {
        // JSON has no NaN or infinity; serde_json would write them as null
        if let Some(bad) = samples.iter().find(|s| !s.is_finite()) {
            return Err(StoreError::Encode(serde::ser::Error::custom(format!(
                "non-finite value in sample at {}",
                bad.timestamp
            ))));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_vec(&SnapshotRef {
            version: SNAPSHOT_VERSION,
            samples,
        })?;

        // Write atomically using temp file
        let temp_path = self.temp_path();
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;

        fs::rename(&temp_path, &self.path)?;

        debug!(path = %self.path.display(), samples = samples.len(), "Snapshot written");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample(secs: i64) -> MetricSample {
        let ts = Utc.timestamp_opt(1_714_564_800 + secs, 123_000_000).unwrap();
        MetricSample::new(ts, 12.3, 45.6, 78.9, 9_876_543_210)
    }

    #[test]
    fn test_missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("metrics.json"));
        assert_eq!(storage.load(), SnapshotLoad::Absent);
    }

    #[test]
    fn test_empty_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        fs::write(&path, b"").unwrap();
        assert_eq!(JsonFileStorage::new(path).load(), SnapshotLoad::Absent);
    }

    #[test]
    fn test_truncated_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        fs::write(&path, br#"{"version":1,"samples":[{"timest"#).unwrap();
        assert!(matches!(
            JsonFileStorage::new(path).load(),
            SnapshotLoad::Corrupt(_)
        ));
    }

    #[test]
    fn test_unknown_version_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        fs::write(&path, br#"{"version":7,"samples":[]}"#).unwrap();
        assert!(matches!(
            JsonFileStorage::new(path).load(),
            SnapshotLoad::Corrupt(_)
        ));
    }

    #[test]
    fn test_save_is_lossless_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("metrics.json");
        let storage = JsonFileStorage::new(&path);
        let samples = vec![sample(0), sample(3600)];

        storage.save(&samples).unwrap();

        assert_eq!(storage.load(), SnapshotLoad::Loaded(samples));
        assert!(!storage.temp_path().exists());
    }

    #[test]
    fn test_non_finite_sample_keeps_last_good_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("metrics.json"));
        storage.save(&[sample(0)]).unwrap();

        let mut bad = sample(10);
        bad.ram_pct = f64::INFINITY;
        assert!(matches!(
            storage.save(&[sample(0), bad]),
            Err(StoreError::Encode(_))
        ));

        assert_eq!(storage.load(), SnapshotLoad::Loaded(vec![sample(0)]));
    }

    #[test]
    fn test_save_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("metrics.json"));

        storage.save(&[sample(0), sample(10)]).unwrap();
        storage.save(&[sample(20)]).unwrap();

        assert_eq!(storage.load(), SnapshotLoad::Loaded(vec![sample(20)]));
    }
}
