use async_trait::async_trait;
use thiserror::Error;

use crate::domain::MetricColumn;

use super::Chart;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),
}

/// Inbound command vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Report,
    Stats,
    Status,
    Chart(MetricColumn),
}

impl Command {
    /// Parse a chat message such as `/chart cpu` or `/report@my_bot`.
    /// Returns `None` for anything outside the vocabulary.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let head = parts.next()?.strip_prefix('/')?;
        let name = head.split('@').next().unwrap_or(head);

        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "report" => Some(Command::Report),
            "stats" => Some(Command::Stats),
            "status" => Some(Command::Status),
            "chart" => parts.next()?.parse().ok().map(Command::Chart),
            _ => None,
        }
    }
}

/// Port for the remote chat channel
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a report, optionally with a rendered chart
    async fn send(&self, text: &str, image: Option<Chart>) -> Result<(), NotifyError>;

    /// Wait for the next batch of inbound commands
    async fn next_commands(&self) -> Result<Vec<Command>, NotifyError>;
}
