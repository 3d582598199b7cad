pub mod sample;
pub mod statistics;

pub use sample::{MetricColumn, MetricSample};
pub use statistics::SummaryStatistics;
