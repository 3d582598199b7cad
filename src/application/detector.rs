//! Anomaly detection over the recent window of the metrics store.
//!
//! Each sample of the lookback window becomes a `(cpu, ram, network)` feature
//! vector; DBSCAN labels the vectors and the latest noise point is reported.
//! Features are not normalized: with the cumulative network counter that
//! feature dominates the Euclidean distance, so near any traffic at all the
//! network dimension alone decides which points are outliers.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, error};

use crate::domain::MetricSample;

use super::clustering::Dbscan;
use super::MetricsStore;

#[derive(Debug, Error, PartialEq)]
pub enum DetectError {
    #[error("Non-finite feature in sample {index}")]
    NonFiniteFeature { index: usize },

    #[error("Invalid clustering parameters: eps={eps}, min_pts={min_pts}")]
    InvalidParameters { eps: f64, min_pts: usize },
}

/// How the network counter enters the feature vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFeature {
    /// Raw cumulative byte counter
    Cumulative,
    /// Bytes per second between consecutive samples
    Rate,
}

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// How far back from "now" the evaluated window reaches
    pub lookback: Duration,
    /// Minimum samples in the whole store
    pub min_total_samples: usize,
    /// Minimum samples inside the lookback window
    pub min_window_samples: usize,
    pub eps: f64,
    pub min_pts: usize,
    pub network_feature: NetworkFeature,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            lookback: Duration::hours(24),
            min_total_samples: 10,
            min_window_samples: 5,
            eps: 2.5,
            min_pts: 3,
            network_feature: NetworkFeature::Cumulative,
        }
    }
}

/// Stateless detector; never mutates the store
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: DetectorConfig,
}

impl AnomalyDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Most recent outlier of the lookback window, if any
    pub fn detect(&self, store: &MetricsStore) -> Option<MetricSample> {
        self.detect_at(store, Utc::now())
    }

    pub fn detect_at(&self, store: &MetricsStore, now: DateTime<Utc>) -> Option<MetricSample> {
        if store.len() < self.config.min_total_samples {
            debug!(
                samples = store.len(),
                required = self.config.min_total_samples,
                "Not enough history for anomaly detection"
            );
            return None;
        }

        let window = store.window(now - self.config.lookback);
        if window.len() < self.config.min_window_samples {
            debug!(
                samples = window.len(),
                required = self.config.min_window_samples,
                lookback_hours = self.config.lookback.num_hours(),
                "Not enough recent samples for anomaly detection"
            );
            return None;
        }

        match self.scan(window) {
            Ok(anomaly) => anomaly.cloned(),
            Err(e) => {
                error!(error = %e, "Anomaly detection failed");
                None
            }
        }
    }

    /// Cluster a timestamp-ordered window and return its latest noise point
    pub fn scan<'a>(&self, window: &'a [MetricSample]) -> Result<Option<&'a MetricSample>, DetectError> {
        if !(self.config.eps.is_finite() && self.config.eps > 0.0) || self.config.min_pts == 0 {
            return Err(DetectError::InvalidParameters {
                eps: self.config.eps,
                min_pts: self.config.min_pts,
            });
        }

        let features = self.features(window);
        if let Some(index) = features.iter().position(|f| f.iter().any(|v| !v.is_finite())) {
            return Err(DetectError::NonFiniteFeature { index });
        }

        let labels = Dbscan::new(self.config.eps, self.config.min_pts).fit(&features);

        // Window is timestamp-ordered, so the last noise point is the latest
        Ok(window
            .iter()
            .zip(&labels)
            .rev()
            .find(|(_, label)| label.is_noise())
            .map(|(sample, _)| sample))
    }

    fn features(&self, window: &[MetricSample]) -> Vec<[f64; 3]> {
        let network = match self.config.network_feature {
            NetworkFeature::Cumulative => window
                .iter()
                .map(|s| s.network_total_bytes as f64)
                .collect(),
            NetworkFeature::Rate => network_rates(window),
        };

        window
            .iter()
            .zip(network)
            .map(|(s, net)| [s.cpu_pct, s.ram_pct, net])
            .collect()
    }
}

/// Bytes/s between consecutive samples. The first sample reuses the second
/// one's rate; counter resets count as zero traffic.
fn network_rates(window: &[MetricSample]) -> Vec<f64> {
    let mut rates: Vec<f64> = window
        .windows(2)
        .map(|pair| {
            let secs = (pair[1].timestamp - pair[0].timestamp).num_milliseconds() as f64 / 1000.0;
            if secs <= 0.0 {
                return 0.0;
            }
            pair[1]
                .network_total_bytes
                .saturating_sub(pair[0].network_total_bytes) as f64
                / secs
        })
        .collect();

    let first = rates.first().copied().unwrap_or(0.0);
    if !window.is_empty() {
        rates.insert(0, first);
    }
    rates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStorage;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    fn store_with(samples: &[MetricSample]) -> MetricsStore {
        let mut store = MetricsStore::open(Box::new(MemoryStorage::new()), Duration::days(30));
        for s in samples {
            store.append_at(s.clone(), now()).unwrap();
        }
        store
    }

    /// Five samples outside the 24h lookback to satisfy the total-count minimum
    fn old_history() -> Vec<MetricSample> {
        (0..5)
            .map(|i| MetricSample::new(now() - Duration::hours(48 - i), 20.0, 40.0, 70.0, 1_000))
            .collect()
    }

    fn recent(minutes_ago: i64, cpu: f64, ram: f64, net: u64) -> MetricSample {
        MetricSample::new(now() - Duration::minutes(minutes_ago), cpu, ram, 70.0, net)
    }

    #[test]
    fn test_insufficient_total_history() {
        let samples: Vec<_> = (0..9).map(|i| recent(100 - i, 10.0, 40.0, 1_000)).collect();
        let store = store_with(&samples);
        assert_eq!(AnomalyDetector::default().detect_at(&store, now()), None);
    }

    #[test]
    fn test_insufficient_window() {
        let mut samples = old_history();
        samples.push(MetricSample::new(now() - Duration::hours(25), 10.0, 40.0, 70.0, 1_000));
        samples.extend((0..4).map(|i| recent(50 - i, 90.0 * (i % 2) as f64, 40.0, 1_000)));
        let store = store_with(&samples);

        assert_eq!(store.len(), 10);
        assert_eq!(AnomalyDetector::default().detect_at(&store, now()), None);
    }

    #[test]
    fn test_identical_window_has_no_anomaly() {
        let mut samples = old_history();
        samples.extend((0..5).map(|i| recent(50 - i, 33.0, 44.0, 5_000)));
        let store = store_with(&samples);

        assert_eq!(store.len(), 10);
        assert_eq!(AnomalyDetector::default().detect_at(&store, now()), None);
    }

    #[test]
    fn test_single_outlier_is_reported() {
        let mut samples = old_history();
        samples.push(recent(50, 10.0, 40.0, 1_000));
        samples.push(recent(40, 10.5, 40.2, 1_000));
        samples.push(recent(30, 95.0, 88.0, 1_000));
        samples.push(recent(20, 11.0, 39.8, 1_000));
        samples.push(recent(10, 10.2, 40.0, 1_001));
        let store = store_with(&samples);

        let anomaly = AnomalyDetector::default().detect_at(&store, now()).unwrap();
        assert_eq!(anomaly.cpu_pct, 95.0);
        assert_eq!(anomaly.timestamp, now() - Duration::minutes(30));
    }

    #[test]
    fn test_latest_of_several_outliers() {
        let mut samples = old_history();
        samples.push(recent(60, 99.0, 10.0, 1_000));
        samples.push(recent(50, 10.0, 40.0, 1_000));
        samples.push(recent(40, 10.5, 40.0, 1_000));
        samples.push(recent(30, 11.0, 40.0, 1_000));
        samples.push(recent(20, 50.0, 95.0, 1_000));
        samples.push(recent(10, 10.2, 40.0, 1_000));
        let store = store_with(&samples);

        let anomaly = AnomalyDetector::default().detect_at(&store, now()).unwrap();
        assert_eq!(anomaly.ram_pct, 95.0);
    }

    #[test]
    fn test_old_samples_outside_lookback_are_ignored() {
        let mut samples = old_history();
        // An extreme point, but 30 hours old
        samples.push(MetricSample::new(now() - Duration::hours(30), 100.0, 100.0, 70.0, 1_000));
        samples.extend((0..5).map(|i| recent(50 - i, 20.0, 40.0, 1_000)));
        let store = store_with(&samples);

        assert_eq!(AnomalyDetector::default().detect_at(&store, now()), None);
    }

    #[test]
    fn test_non_finite_feature_degrades_to_none() {
        let mut samples = old_history();
        samples.extend((0..4).map(|i| recent(50 - i, 20.0, 40.0, 1_000)));
        samples.push(recent(5, f64::NAN, 40.0, 1_000));
        // Appends refuse non-finite samples, so hand them over as a loaded snapshot
        let store = MetricsStore::open(
            Box::new(MemoryStorage::with_samples(samples)),
            Duration::days(30),
        );
        let detector = AnomalyDetector::default();

        let window = store.window(now() - Duration::hours(24));
        assert_eq!(
            detector.scan(window),
            Err(DetectError::NonFiniteFeature { index: 4 })
        );
        assert_eq!(detector.detect_at(&store, now()), None);
    }

    #[test]
    fn test_invalid_parameters_are_a_fault() {
        let detector = AnomalyDetector::new(DetectorConfig {
            min_pts: 0,
            ..Default::default()
        });
        assert!(matches!(
            detector.scan(&old_history()),
            Err(DetectError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn test_cumulative_network_dominates_distance() {
        // Steady traffic: the counter grows by 6 MB between samples
        let mut samples = old_history();
        samples.extend((0..5).map(|i| recent(50 - 10 * i, 20.0, 40.0, 1_000_000_000 + 6_000_000 * i as u64)));
        let store = store_with(&samples);

        let cumulative = AnomalyDetector::default().detect_at(&store, now());
        assert_eq!(cumulative.unwrap().timestamp, now() - Duration::minutes(10));

        let rate = AnomalyDetector::new(DetectorConfig {
            network_feature: NetworkFeature::Rate,
            ..Default::default()
        });
        assert_eq!(rate.detect_at(&store, now()), None);
    }

    #[test]
    fn test_network_rates() {
        let samples = vec![
            recent(30, 0.0, 0.0, 1_000),
            recent(29, 0.0, 0.0, 7_000),
            recent(28, 0.0, 0.0, 500),
        ];
        assert_eq!(network_rates(&samples), vec![100.0, 100.0, 0.0]);
        assert!(network_rates(&[]).is_empty());
        assert_eq!(network_rates(&samples[..1]), vec![0.0]);
    }
}
