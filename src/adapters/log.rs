use async_trait::async_trait;
use tracing::info;

use crate::ports::{Chart, Command, NotifyError, Notifier};

/// Notifier used when no chat transport is configured: reports go to the log
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str, image: Option<Chart>) -> Result<(), NotifyError> {
        match image {
            Some(chart) => info!(chart = %chart.file_name, bytes = chart.bytes.len(), "\n{}", text),
            None => info!("\n{}", text),
        }
        Ok(())
    }

    async fn next_commands(&self) -> Result<Vec<Command>, NotifyError> {
        // No inbound channel: wait until shutdown cancels us
        std::future::pending().await
    }
}
