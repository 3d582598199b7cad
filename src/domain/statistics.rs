use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{MetricColumn, MetricSample};

/// Descriptive statistics for one column of the sample table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1); absent for a single value
    pub std_dev: Option<f64>,
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
}

impl FieldStats {
    /// Returns `None` for an empty series
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;

        // Two-pass variance with Bessel's correction
        let std_dev = if count > 1 {
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                / (count - 1) as f64;
            Some(variance.sqrt())
        } else {
            None
        };

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Some(Self {
            count,
            mean,
            std_dev,
            min: sorted[0],
            p25: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            p75: quantile(&sorted, 0.75),
            max: sorted[count - 1],
        })
    }
}

/// Linear interpolation between the closest ranks of a sorted slice
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Per-field statistics over the full retained sequence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub first_timestamp: DateTime<Utc>,
    pub last_timestamp: DateTime<Utc>,
    pub cpu: FieldStats,
    pub ram: FieldStats,
    pub disk: FieldStats,
    pub network: FieldStats,
}

impl SummaryStatistics {
    /// Returns `None` when there are no samples
    pub fn from_samples(samples: &[MetricSample]) -> Option<Self> {
        let first = samples.first()?;
        let last = samples.last()?;

        let column = |c: MetricColumn| -> Option<FieldStats> {
            let values: Vec<f64> = samples.iter().map(|s| s.value(c)).collect();
            FieldStats::from_values(&values)
        };

        Some(Self {
            first_timestamp: first.timestamp,
            last_timestamp: last.timestamp,
            cpu: column(MetricColumn::Cpu)?,
            ram: column(MetricColumn::Ram)?,
            disk: column(MetricColumn::Disk)?,
            network: column(MetricColumn::Network)?,
        })
    }

    pub fn field(&self, column: MetricColumn) -> &FieldStats {
        match column {
            MetricColumn::Cpu => &self.cpu,
            MetricColumn::Ram => &self.ram,
            MetricColumn::Disk => &self.disk,
            MetricColumn::Network => &self.network,
        }
    }
}

impl fmt::Display for SummaryStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<6} {:>16} {:>16} {:>16} {:>18}",
            "", "cpu", "ram", "disk", "network"
        )?;

        let rows: [(&str, fn(&FieldStats) -> Option<f64>); 8] = [
            ("count", |s| Some(s.count as f64)),
            ("mean", |s| Some(s.mean)),
            ("std", |s| s.std_dev),
            ("min", |s| Some(s.min)),
            ("25%", |s| Some(s.p25)),
            ("50%", |s| Some(s.median)),
            ("75%", |s| Some(s.p75)),
            ("max", |s| Some(s.max)),
        ];

        for (i, (label, pick)) in rows.iter().enumerate() {
            write!(f, "{:<6}", label)?;
            for column in MetricColumn::ALL {
                let width = if column == MetricColumn::Network { 19 } else { 17 };
                match pick(self.field(column)) {
                    Some(v) => write!(f, "{:>width$.2}", v, width = width)?,
                    None => write!(f, "{:>width$}", "NaN", width = width)?,
                }
            }
            if i + 1 < rows.len() {
                writeln!(f)?;
            }
        }

        Ok(())
    }
}
