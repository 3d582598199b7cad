use std::collections::HashMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing field: {0}")]
    MissingField(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// CPU stats from /proc/stat
#[derive(Debug, Clone, Default)]
pub struct CpuStat {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuStat {
    pub fn total(&self) -> u64 {
        self.user + self.nice + self.system + self.idle + self.iowait + self.irq + self.softirq + self.steal
    }

    pub fn busy(&self) -> u64 {
        self.total() - self.idle - self.iowait
    }

    /// Busy share of the time elapsed since `previous`, in percent
    pub fn usage_since(&self, previous: &CpuStat) -> f64 {
        let total_delta = self.total().saturating_sub(previous.total());
        if total_delta == 0 {
            return 0.0;
        }
        let busy_delta = self.busy().saturating_sub(previous.busy());
        (busy_delta as f64 / total_delta as f64) * 100.0
    }
}

/// Parse /proc/stat (first line only for aggregate CPU)
pub fn parse_cpu_stat(content: &str) -> ParseResult<CpuStat> {
    let first_line = content
        .lines()
        .next()
        .ok_or_else(|| ParseError::Parse("Empty stat file".to_string()))?;

    if !first_line.starts_with("cpu ") {
        return Err(ParseError::Parse("Missing cpu line".to_string()));
    }

    let parts: Vec<&str> = first_line.split_whitespace().skip(1).collect();
    if parts.len() < 8 {
        return Err(ParseError::Parse("Incomplete cpu stat".to_string()));
    }

    Ok(CpuStat {
        user: parts[0].parse().map_err(|e| ParseError::Parse(format!("user: {}", e)))?,
        nice: parts[1].parse().map_err(|e| ParseError::Parse(format!("nice: {}", e)))?,
        system: parts[2].parse().map_err(|e| ParseError::Parse(format!("system: {}", e)))?,
        idle: parts[3].parse().map_err(|e| ParseError::Parse(format!("idle: {}", e)))?,
        iowait: parts[4].parse().map_err(|e| ParseError::Parse(format!("iowait: {}", e)))?,
        irq: parts[5].parse().map_err(|e| ParseError::Parse(format!("irq: {}", e)))?,
        softirq: parts[6].parse().map_err(|e| ParseError::Parse(format!("softirq: {}", e)))?,
        steal: parts[7].parse().map_err(|e| ParseError::Parse(format!("steal: {}", e)))?,
    })
}

/// Parse /proc/meminfo into a map
pub fn parse_meminfo(content: &str) -> ParseResult<HashMap<String, u64>> {
    let mut map = HashMap::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() != 2 {
            continue;
        }

        let key = parts[0].trim().to_string();
        let value_str = parts[1].trim().trim_end_matches(" kB");

        if let Ok(value) = value_str.parse::<u64>() {
            map.insert(key, value * 1024); // Convert kB to bytes
        }
    }

    Ok(map)
}

/// Used memory share from a parsed meminfo map, in percent
pub fn memory_usage_percent(meminfo: &HashMap<String, u64>) -> ParseResult<f64> {
    let total = *meminfo
        .get("MemTotal")
        .ok_or_else(|| ParseError::MissingField("MemTotal".to_string()))?;
    let available = *meminfo
        .get("MemAvailable")
        .ok_or_else(|| ParseError::MissingField("MemAvailable".to_string()))?;

    if total == 0 {
        return Ok(0.0);
    }

    let used = total.saturating_sub(available);
    Ok((used as f64 / total as f64) * 100.0)
}

/// Parse byte counters from /sys/class/net/{interface}/statistics
pub fn parse_net_bytes(stats_dir: &Path) -> ParseResult<(u64, u64)> {
    let rx_bytes = fs::read_to_string(stats_dir.join("rx_bytes"))?
        .trim()
        .parse::<u64>()
        .map_err(|e| ParseError::Parse(format!("rx_bytes: {}", e)))?;

    let tx_bytes = fs::read_to_string(stats_dir.join("tx_bytes"))?
        .trim()
        .parse::<u64>()
        .map_err(|e| ParseError::Parse(format!("tx_bytes: {}", e)))?;

    Ok((rx_bytes, tx_bytes))
}
