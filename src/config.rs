use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::adapters::ProcfsConfig;
use crate::application::{
    AlertThresholds, DetectorConfig, NetworkFeature, RetentionProfile, SchedulerConfig,
};

const ENV_PREFIX: &str = "HOSTSENTRY_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// A value that must not end up in logs
#[derive(Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"***\"")
    }
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub report_interval_secs: u64,
    pub backoff_secs: u64,
    /// Snapshot file; empty keeps samples in memory only
    pub data_file: String,
    pub retention_profile: String,
    pub lookback_hours: i64,
    pub min_total_samples: usize,
    pub min_window_samples: usize,
    pub eps: f64,
    pub min_pts: usize,
    pub network_feature: String,
    pub proc_path: PathBuf,
    pub sys_path: PathBuf,
    pub disk_mount: PathBuf,
    /// Delay between the two CPU readings of the first sample
    pub cpu_settle_ms: u64,
    pub telegram_token: Option<Secret>,
    pub telegram_chat_id: Option<i64>,
    pub cpu_alert_pct: f64,
    pub ram_alert_pct: f64,
    pub disk_alert_pct: f64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            report_interval_secs: 60 * 60,
            backoff_secs: 60,
            data_file: "metrics.json".to_string(),
            retention_profile: "analytics".to_string(),
            lookback_hours: 24,
            min_total_samples: 10,
            min_window_samples: 5,
            eps: 2.5,
            min_pts: 3,
            network_feature: "cumulative".to_string(),
            proc_path: PathBuf::from("/proc"),
            sys_path: PathBuf::from("/sys"),
            disk_mount: PathBuf::from("/"),
            cpu_settle_ms: 500,
            telegram_token: None,
            telegram_chat_id: None,
            cpu_alert_pct: 90.0,
            ram_alert_pct: 90.0,
            disk_alert_pct: 90.0,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Defaults, then `HOSTSENTRY_CONFIG` (TOML) if set, then `HOSTSENTRY_*` variables
    pub fn load() -> Result<Self, ConfigError> {
        let base = match env::var("HOSTSENTRY_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        Ok(base.with_overrides(|key| env::var(format!("{}{}", ENV_PREFIX, key)).ok()))
    }

    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(format!("{}{}", ENV_PREFIX, key)).ok())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides looked up by unprefixed upper-case key (e.g. `PORT`).
    /// Unparsable values keep the current setting.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, current: T) -> T {
            lookup(key)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(current)
        }

        self.port = parsed(&lookup, "PORT", self.port);
        self.report_interval_secs = parsed(&lookup, "REPORT_INTERVAL_SECS", self.report_interval_secs);
        self.backoff_secs = parsed(&lookup, "BACKOFF_SECS", self.backoff_secs);
        self.data_file = lookup("DATA_FILE").unwrap_or(self.data_file);
        self.retention_profile = lookup("RETENTION_PROFILE").unwrap_or(self.retention_profile);
        self.lookback_hours = parsed(&lookup, "LOOKBACK_HOURS", self.lookback_hours);
        self.min_total_samples = parsed(&lookup, "MIN_TOTAL_SAMPLES", self.min_total_samples);
        self.min_window_samples = parsed(&lookup, "MIN_WINDOW_SAMPLES", self.min_window_samples);
        self.eps = parsed(&lookup, "EPS", self.eps);
        self.min_pts = parsed(&lookup, "MIN_PTS", self.min_pts);
        self.network_feature = lookup("NETWORK_FEATURE").unwrap_or(self.network_feature);
        self.proc_path = lookup("PROC_PATH").map(PathBuf::from).unwrap_or(self.proc_path);
        self.sys_path = lookup("SYS_PATH").map(PathBuf::from).unwrap_or(self.sys_path);
        self.disk_mount = lookup("DISK_MOUNT").map(PathBuf::from).unwrap_or(self.disk_mount);
        self.cpu_settle_ms = parsed(&lookup, "CPU_SETTLE_MS", self.cpu_settle_ms);
        self.telegram_token = lookup("TELEGRAM_TOKEN").map(Secret).or(self.telegram_token);
        self.telegram_chat_id = lookup("TELEGRAM_CHAT_ID")
            .and_then(|s| s.trim().parse().ok())
            .or(self.telegram_chat_id);
        self.cpu_alert_pct = parsed(&lookup, "CPU_ALERT_PCT", self.cpu_alert_pct);
        self.ram_alert_pct = parsed(&lookup, "RAM_ALERT_PCT", self.ram_alert_pct);
        self.disk_alert_pct = parsed(&lookup, "DISK_ALERT_PCT", self.disk_alert_pct);
        self.log_level = lookup("LOG_LEVEL").unwrap_or(self.log_level);
        self
    }

    /// Unknown names fall back to the analytics profile
    pub fn retention(&self) -> RetentionProfile {
        match self.retention_profile.trim().to_ascii_lowercase().as_str() {
            "operational" | "7d" => RetentionProfile::Operational,
            _ => RetentionProfile::Analytics,
        }
    }

    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            lookback: chrono::Duration::hours(self.lookback_hours),
            min_total_samples: self.min_total_samples,
            min_window_samples: self.min_window_samples,
            eps: self.eps,
            min_pts: self.min_pts,
            network_feature: match self.network_feature.trim().to_ascii_lowercase().as_str() {
                "rate" => NetworkFeature::Rate,
                _ => NetworkFeature::Cumulative,
            },
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_secs(self.report_interval_secs.max(1)),
            backoff: Duration::from_secs(self.backoff_secs),
        }
    }

    pub fn procfs_config(&self) -> ProcfsConfig {
        ProcfsConfig::new(self.proc_path.clone(), self.sys_path.clone())
            .with_disk_mount(self.disk_mount.clone())
            .with_cpu_settle(Duration::from_millis(self.cpu_settle_ms))
    }

    pub fn thresholds(&self) -> AlertThresholds {
        AlertThresholds {
            cpu_pct: self.cpu_alert_pct,
            ram_pct: self.ram_alert_pct,
            disk_pct: self.disk_alert_pct,
        }
    }

    /// Token and chat id, when both are configured
    pub fn telegram(&self) -> Option<(&str, i64)> {
        let token = self.telegram_token.as_ref()?.expose();
        if token.is_empty() {
            return None;
        }
        Some((token, self.telegram_chat_id?))
    }
}
