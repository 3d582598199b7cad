use std::fmt::Write;

use crate::domain::{MetricSample, SummaryStatistics};

pub const REPORT_HEADER: &str = "📊 Server status report:";
pub const ANOMALY_HEADER: &str = "⚠️ Anomaly detected!";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Usage levels above which the live status flags a resource
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    pub cpu_pct: f64,
    pub ram_pct: f64,
    pub disk_pct: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            cpu_pct: 90.0,
            ram_pct: 90.0,
            disk_pct: 90.0,
        }
    }
}

/// Pure formatting of the texts sent to the chat channel
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    thresholds: AlertThresholds,
}

impl ReportBuilder {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    /// Header block for `latest`, then the anomaly block when one was found
    pub fn compose(&self, latest: &MetricSample, anomaly: Option<&MetricSample>) -> String {
        let mut msg = format!(
            "{}\nTime: {}\nCPU: {:.1}%\nRAM: {:.1}%\nDisk: {:.1}%",
            REPORT_HEADER,
            latest.timestamp.format(TIME_FORMAT),
            latest.cpu_pct,
            latest.ram_pct,
            latest.disk_pct
        );

        if let Some(anomaly) = anomaly {
            let _ = write!(
                msg,
                "\n\n{}\nTime: {}\nCPU: {:.1}%\nRAM: {:.1}%",
                ANOMALY_HEADER,
                anomaly.timestamp.format(TIME_FORMAT),
                anomaly.cpu_pct,
                anomaly.ram_pct
            );
        }

        msg
    }

    pub fn no_data(&self) -> String {
        "📊 No metrics collected yet.".to_string()
    }

    pub fn statistics(&self, stats: Option<&SummaryStatistics>) -> String {
        match stats {
            Some(stats) => format!(
                "📈 Overall statistics for {} .. {}:\n{}",
                stats.first_timestamp.format(TIME_FORMAT),
                stats.last_timestamp.format(TIME_FORMAT),
                stats
            ),
            None => "📈 Statistics unavailable: no metrics collected.".to_string(),
        }
    }

    /// Live reading with threshold alerts; the sample is not stored
    pub fn status(&self, sample: &MetricSample) -> String {
        let mut msg = format!(
            "📊 Server status:\nCPU: {:.1}%\nRAM: {:.1}%\nDisk: {:.1}%",
            sample.cpu_pct, sample.ram_pct, sample.disk_pct
        );

        if sample.cpu_pct > self.thresholds.cpu_pct {
            msg.push_str("\n⚠️ CPU overloaded!");
        }
        if sample.ram_pct > self.thresholds.ram_pct {
            msg.push_str("\n⚠️ RAM overloaded!");
        }
        if sample.disk_pct > self.thresholds.disk_pct {
            msg.push_str("\n⚠️ Disk almost full!");
        }

        msg
    }

    pub fn help(&self) -> String {
        [
            "Hi! I watch this server and report on it.",
            "/report - latest report with anomaly check",
            "/stats - summary statistics for the retained period",
            "/status - live CPU/RAM/disk reading",
            "/chart <cpu|ram|disk|network> - chart of one metric",
            "/help - this message",
        ]
        .join("\n")
    }
}
