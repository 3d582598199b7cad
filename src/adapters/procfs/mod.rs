mod parser;
mod sample;

use std::path::PathBuf;
use std::time::Duration;

pub use sample::ProcfsSampleSource;

/// Configuration for procfs paths (useful for Docker mounts)
#[derive(Debug, Clone)]
pub struct ProcfsConfig {
    pub proc_path: PathBuf,
    pub sys_path: PathBuf,
    /// Mount point whose usage is reported as disk%
    pub disk_mount: PathBuf,
    /// Gap between the two /proc/stat reads of the very first sample
    pub cpu_settle: Duration,
}

impl ProcfsConfig {
    pub fn new(proc_path: impl Into<PathBuf>, sys_path: impl Into<PathBuf>) -> Self {
        Self {
            proc_path: proc_path.into(),
            sys_path: sys_path.into(),
            disk_mount: PathBuf::from("/"),
            cpu_settle: Duration::from_millis(500),
        }
    }

    pub fn with_disk_mount(mut self, disk_mount: impl Into<PathBuf>) -> Self {
        self.disk_mount = disk_mount.into();
        self
    }

    pub fn with_cpu_settle(mut self, cpu_settle: Duration) -> Self {
        self.cpu_settle = cpu_settle;
        self
    }
}

impl Default for ProcfsConfig {
    fn default() -> Self {
        Self::new("/proc", "/sys")
    }
}
