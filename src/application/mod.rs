mod clustering;
mod detector;
pub(crate) mod monitoring;
mod report;
mod scheduler;
mod store;

pub use detector::{AnomalyDetector, DetectorConfig, NetworkFeature};
pub use monitoring::MonitoringService;
pub use report::{AlertThresholds, ReportBuilder};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use store::{MetricsStore, RetentionProfile};
