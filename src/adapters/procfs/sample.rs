use std::fs;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::domain::MetricSample;
use crate::ports::{SampleError, SampleSource};

use super::parser::{self, CpuStat, ParseError};
use super::ProcfsConfig;

impl From<ParseError> for SampleError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Io(e) => SampleError::Io(e),
            other => SampleError::Parse(other.to_string()),
        }
    }
}

/// Sample source implementation using procfs, sysfs and statvfs
pub struct ProcfsSampleSource {
    config: ProcfsConfig,
    last_cpu_stat: Mutex<Option<CpuStat>>,
}

impl ProcfsSampleSource {
    pub fn new(config: ProcfsConfig) -> Self {
        Self {
            config,
            last_cpu_stat: Mutex::new(None),
        }
    }

    fn read_cpu_stat(&self) -> Result<CpuStat, SampleError> {
        let content = fs::read_to_string(self.config.proc_path.join("stat"))?;
        Ok(parser::parse_cpu_stat(&content)?)
    }

    async fn cpu_percent(&self) -> Result<f64, SampleError> {
        let previous = self
            .last_cpu_stat
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let previous = match previous {
            Some(stat) => stat,
            None => {
                // No baseline yet: take one and let the counters move
                let baseline = self.read_cpu_stat()?;
                tokio::time::sleep(self.config.cpu_settle).await;
                baseline
            }
        };

        let current = self.read_cpu_stat()?;
        let usage = current.usage_since(&previous);
        *self.last_cpu_stat.lock().unwrap_or_else(PoisonError::into_inner) = Some(current);

        Ok(usage)
    }

    fn ram_percent(&self) -> Result<f64, SampleError> {
        let content = fs::read_to_string(self.config.proc_path.join("meminfo"))?;
        let meminfo = parser::parse_meminfo(&content)?;
        Ok(parser::memory_usage_percent(&meminfo)?)
    }

    fn disk_percent(&self) -> Result<f64, SampleError> {
        let stat = nix::sys::statvfs::statvfs(self.config.disk_mount.as_path())
            .map_err(|e| SampleError::Unavailable(format!("statvfs {}: {}", self.config.disk_mount.display(), e)))?;

        let block_size = stat.fragment_size() as u64;
        let total_bytes = stat.blocks() as u64 * block_size;
        let free_bytes = stat.blocks_free() as u64 * block_size;
        let available_bytes = stat.blocks_available() as u64 * block_size;
        let used_bytes = total_bytes.saturating_sub(free_bytes);

        // Same basis as `df`: reserved blocks are excluded from the denominator
        let usable = used_bytes + available_bytes;
        if usable == 0 {
            return Ok(0.0);
        }
        Ok((used_bytes as f64 / usable as f64) * 100.0)
    }

    fn network_total_bytes(&self) -> Result<u64, SampleError> {
        let net_class_path = self.config.sys_path.join("class/net");
        let mut total: u64 = 0;

        for entry in fs::read_dir(&net_class_path)? {
            let entry = entry?;
            let interface_name = entry.file_name().to_string_lossy().to_string();

            // Skip loopback
            if interface_name == "lo" {
                continue;
            }

            match parser::parse_net_bytes(&entry.path().join("statistics")) {
                Ok((rx_bytes, tx_bytes)) => {
                    total = total.saturating_add(rx_bytes).saturating_add(tx_bytes);
                }
                Err(e) => debug!(interface = %interface_name, error = %e, "Skipping interface"),
            }
        }

        Ok(total)
    }
}

#[async_trait]
impl SampleSource for ProcfsSampleSource {
    async fn read(&self) -> Result<MetricSample, SampleError> {
        let cpu_pct = self.cpu_percent().await?;
        let ram_pct = self.ram_percent()?;
        let disk_pct = self.disk_percent()?;
        let network_total_bytes = self.network_total_bytes()?;

        Ok(MetricSample::new(
            Utc::now(),
            cpu_pct,
            ram_pct,
            disk_pct,
            network_total_bytes,
        ))
    }
}
