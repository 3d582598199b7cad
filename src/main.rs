mod adapters;
mod application;
mod config;
mod domain;
mod interface;
mod ports;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adapters::{
    JsonFileStorage, LogNotifier, MemoryStorage, ProcfsSampleSource, SvgChartRenderer,
    TelegramNotifier,
};
use application::{AnomalyDetector, MetricsStore, MonitoringService, ReportBuilder, Scheduler};
use config::Config;
use interface::http::create_router;
use ports::{Notifier, SnapshotStorage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load configuration
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::from_env(), Some(e)),
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("hostsentry={},tower_http=info", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting HostSentry v{}", env!("CARGO_PKG_VERSION"));
    if let Some(e) = config_error {
        warn!("⚠ {}. Falling back to defaults and environment.", e);
    }
    info!("Configuration: {:?}", config);

    // Initialize adapters
    let storage: Box<dyn SnapshotStorage> = if config.data_file.is_empty() {
        warn!("⚠ No data file configured, metrics will not survive a restart");
        Box::new(MemoryStorage::new())
    } else {
        Box::new(JsonFileStorage::new(&config.data_file))
    };
    let data_location = storage.describe();
    info!("✓ Metrics storage: {}", data_location);

    let retention = config.retention();
    let store = MetricsStore::open(storage, retention.window());
    if store.is_empty() {
        info!(?retention, "✓ Metrics store opened, no history yet");
    } else {
        info!(samples = store.len(), ?retention, "✓ Metrics store opened");
    }

    let notifier: Arc<dyn Notifier> = match config.telegram() {
        Some((token, chat_id)) => {
            info!(chat_id, "✓ Reporting to Telegram");
            Arc::new(TelegramNotifier::new(token, chat_id)?)
        }
        None => {
            warn!("⚠ Telegram not configured. Reports go to the log only.");
            Arc::new(LogNotifier)
        }
    };

    // Create monitoring service
    let monitoring_service = Arc::new(MonitoringService::new(
        store,
        Arc::new(ProcfsSampleSource::new(config.procfs_config())),
        AnomalyDetector::new(config.detector_config()),
        ReportBuilder::new(config.thresholds()),
        Arc::new(SvgChartRenderer::new()),
    ));

    info!("✓ Monitoring service initialized");

    let scheduler = Arc::new(Scheduler::new(
        monitoring_service.clone(),
        notifier,
        config.scheduler_config(),
    ));
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let timer = {
        let scheduler = scheduler.clone();
        let shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move { scheduler.run_timer(shutdown).await })
    };
    let commands = {
        let scheduler = scheduler.clone();
        let shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move { scheduler.run_commands(shutdown).await })
    };

    // Create HTTP server
    let app = create_router(monitoring_service);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("✓ HostSentry listening on {}", addr);
    info!("  → API: http://localhost:{}/api/report", config.port);

    let server = {
        let mut shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown.recv().await;
                })
                .await
        })
    };

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    let _ = shutdown_tx.send(());

    for (name, handle) in [("scheduler", timer), ("command listener", commands)] {
        if let Err(e) = handle.await {
            error!(error = %e, "{} task failed", name);
        }
    }
    match server.await {
        Ok(Err(e)) => error!(error = %e, "HTTP server failed"),
        Err(e) => error!(error = %e, "HTTP server task failed"),
        Ok(Ok(())) => {}
    }

    info!("👋 HostSentry stopped, metrics kept in {}", data_location);
    Ok(())
}
