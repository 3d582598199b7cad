use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped reading of host resource metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    pub cpu_pct: f64,
    pub ram_pct: f64,
    pub disk_pct: f64,
    /// Bytes sent + received since boot
    pub network_total_bytes: u64,
}

impl MetricSample {
    pub fn new(
        timestamp: DateTime<Utc>,
        cpu_pct: f64,
        ram_pct: f64,
        disk_pct: f64,
        network_total_bytes: u64,
    ) -> Self {
        Self {
            timestamp,
            cpu_pct,
            ram_pct,
            disk_pct,
            network_total_bytes,
        }
    }

    /// Whether every percentage is a finite number
    pub fn is_finite(&self) -> bool {
        [self.cpu_pct, self.ram_pct, self.disk_pct]
            .iter()
            .all(|v| v.is_finite())
    }

    pub fn value(&self, column: MetricColumn) -> f64 {
        match column {
            MetricColumn::Cpu => self.cpu_pct,
            MetricColumn::Ram => self.ram_pct,
            MetricColumn::Disk => self.disk_pct,
            MetricColumn::Network => self.network_total_bytes as f64,
        }
    }
}

/// A chartable column of the sample table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricColumn {
    Cpu,
    Ram,
    Disk,
    Network,
}

impl MetricColumn {
    pub const ALL: [MetricColumn; 4] = [
        MetricColumn::Cpu,
        MetricColumn::Ram,
        MetricColumn::Disk,
        MetricColumn::Network,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MetricColumn::Cpu => "cpu",
            MetricColumn::Ram => "ram",
            MetricColumn::Disk => "disk",
            MetricColumn::Network => "network",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            MetricColumn::Network => "bytes",
            _ => "%",
        }
    }
}

impl fmt::Display for MetricColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownColumn(pub String);

impl fmt::Display for UnknownColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown metric column: {}", self.0)
    }
}

impl std::error::Error for UnknownColumn {}

impl FromStr for MetricColumn {
    type Err = UnknownColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(MetricColumn::Cpu),
            "ram" | "memory" | "mem" => Ok(MetricColumn::Ram),
            "disk" => Ok(MetricColumn::Disk),
            "network" | "net" => Ok(MetricColumn::Network),
            other => Err(UnknownColumn(other.to_string())),
        }
    }
}
