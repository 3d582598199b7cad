use async_trait::async_trait;
use thiserror::Error;

use crate::domain::MetricSample;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),
}

/// Port for reading live host counters
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Read one sample describing "now"
    async fn read(&self) -> Result<MetricSample, SampleError>;
}
