use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{MetricColumn, MetricSample, SummaryStatistics};
use crate::ports::{
    Chart, ChartError, ChartRenderer, Command, SampleError, SampleSource, StoreError,
};

use super::{AnomalyDetector, MetricsStore, ReportBuilder};

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Sampling failed: {0}")]
    Sample(#[from] SampleError),
}

/// Text (and optional chart) answering one inbound command
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub image: Option<Chart>,
}

impl Reply {
    fn text(text: String) -> Self {
        Self { text, image: None }
    }
}

/// Main application service. Every operation takes the store lock once for
/// its whole critical section, so cycles and queries never interleave.
pub struct MonitoringService {
    store: Mutex<MetricsStore>,
    source: Arc<dyn SampleSource>,
    detector: AnomalyDetector,
    builder: ReportBuilder,
    charts: Arc<dyn ChartRenderer>,
}

impl MonitoringService {
    pub fn new(
        store: MetricsStore,
        source: Arc<dyn SampleSource>,
        detector: AnomalyDetector,
        builder: ReportBuilder,
        charts: Arc<dyn ChartRenderer>,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            source,
            detector,
            builder,
            charts,
        }
    }

    /// Sample, store, detect and compose one report
    pub async fn run_cycle(&self) -> Result<String, CycleError> {
        let mut store = self.store.lock().await;

        let sample = self.source.read().await?;
        match store.append(sample) {
            Ok(()) => {}
            Err(e @ StoreError::InvalidSample { .. }) => warn!(error = %e, "Discarding sample"),
            Err(e) => warn!(error = %e, "Failed to persist metrics, keeping them in memory"),
        }

        let anomaly = self.detector.detect(&store);
        if let Some(anomaly) = &anomaly {
            info!(timestamp = %anomaly.timestamp, cpu = anomaly.cpu_pct, ram = anomaly.ram_pct, "Anomaly detected");
        }

        let text = match store.latest() {
            Some(latest) => self.builder.compose(latest, anomaly.as_ref()),
            None => self.builder.no_data(),
        };

        info!(samples = store.len(), "Cycle complete\n{}", text);
        Ok(text)
    }

    /// Report from the latest stored sample, `None` when the store is empty
    pub async fn current_report(&self) -> Option<String> {
        let store = self.store.lock().await;
        let latest = store.latest()?;
        let anomaly = self.detector.detect(&store);
        Some(self.builder.compose(latest, anomaly.as_ref()))
    }

    pub async fn latest(&self) -> Option<MetricSample> {
        self.store.lock().await.latest().cloned()
    }

    pub async fn statistics(&self) -> Option<SummaryStatistics> {
        self.store.lock().await.summary_statistics()
    }

    pub async fn statistics_report(&self) -> String {
        let stats = self.statistics().await;
        self.builder.statistics(stats.as_ref())
    }

    /// Live reading with threshold alerts; nothing is stored
    pub async fn live_status(&self) -> Result<String, SampleError> {
        let _store = self.store.lock().await;
        let sample = self.source.read().await?;
        Ok(self.builder.status(&sample))
    }

    pub async fn chart(&self, column: MetricColumn) -> Result<Chart, ChartError> {
        let store = self.store.lock().await;
        self.charts.render(column, store.samples())
    }

    /// Answer one inbound command. `None` means stay silent.
    pub async fn respond(&self, command: Command) -> Option<Reply> {
        debug!(?command, "Handling command");

        match command {
            Command::Start | Command::Help => Some(Reply::text(self.builder.help())),
            Command::Report => Some(Reply::text(
                self.current_report()
                    .await
                    .unwrap_or_else(|| self.builder.no_data()),
            )),
            Command::Stats => Some(Reply::text(self.statistics_report().await)),
            Command::Status => match self.live_status().await {
                Ok(text) => Some(Reply::text(text)),
                Err(e) => {
                    warn!(error = %e, "Live status failed");
                    None
                }
            },
            Command::Chart(column) => match self.chart(column).await {
                Ok(chart) => Some(Reply {
                    text: format!("📈 {} over the retained period", column),
                    image: Some(chart),
                }),
                Err(ChartError::NoData(_)) => Some(Reply::text(self.builder.no_data())),
                Err(e) => {
                    warn!(error = %e, %column, "Chart rendering failed");
                    None
                }
            },
        }
    }
}
