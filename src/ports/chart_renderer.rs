use thiserror::Error;

use crate::domain::{MetricColumn, MetricSample};

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("No data to plot for {0}")]
    NoData(MetricColumn),

    #[error("Render error: {0}")]
    Render(String),
}

/// A rendered chart image
#[derive(Debug, Clone)]
pub struct Chart {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Port for turning one metric column into an image
pub trait ChartRenderer: Send + Sync {
    fn render(&self, column: MetricColumn, samples: &[MetricSample]) -> Result<Chart, ChartError>;
}
