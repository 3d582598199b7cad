//! Drives the monitoring cycle.
//!
//! Two independent loops share one `MonitoringService`:
//! - the timer loop samples, detects and reports on a fixed interval
//! - the command loop answers inbound chat commands as they arrive
//!
//! Commands never move the timer's next fire time. A failed cycle is logged
//! and followed by a backoff pause; neither loop ends before shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::ports::Notifier;

use super::MonitoringService;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between two timer-driven cycles
    pub interval: Duration,
    /// Pause after a failed cycle or a failed command poll
    pub backoff: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60 * 60),
            backoff: Duration::from_secs(60),
        }
    }
}

pub struct Scheduler {
    service: Arc<MonitoringService>,
    notifier: Arc<dyn Notifier>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        service: Arc<MonitoringService>,
        notifier: Arc<dyn Notifier>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            service,
            notifier,
            config,
        }
    }

    /// Timer-driven cycle; the first cycle runs immediately
    pub async fn run_timer(&self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting report scheduler"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.tick().await {
                        warn!(backoff_secs = self.config.backoff.as_secs(), "Cycle failed, backing off");
                        tokio::select! {
                            _ = sleep(self.config.backoff) => {}
                            _ = shutdown.recv() => break,
                        }
                    }
                }
                _ = shutdown.recv() => break,
            }
        }

        info!("Shutting down report scheduler");
    }

    /// One cycle, isolated in its own task so that even a panic stays inside
    /// the cycle boundary. Returns whether the cycle completed.
    async fn tick(&self) -> bool {
        let service = self.service.clone();
        let text = match tokio::spawn(async move { service.run_cycle().await }).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                error!(error = %e, "Monitoring cycle failed");
                return false;
            }
            Err(e) => {
                error!(error = %e, "Monitoring cycle aborted");
                return false;
            }
        };

        // Delivery is best-effort: the sample is already stored
        if let Err(e) = self.notifier.send(&text, None).await {
            warn!(error = %e, "Failed to deliver report");
        }
        true
    }

    /// Command intake; runs until shutdown
    pub async fn run_commands(&self, mut shutdown: broadcast::Receiver<()>) {
        info!("Listening for commands");

        loop {
            let polled = tokio::select! {
                polled = self.notifier.next_commands() => polled,
                _ = shutdown.recv() => break,
            };

            let commands = match polled {
                Ok(commands) => commands,
                Err(e) => {
                    warn!(error = %e, backoff_secs = self.config.backoff.as_secs(), "Failed to poll commands");
                    tokio::select! {
                        _ = sleep(self.config.backoff) => continue,
                        _ = shutdown.recv() => break,
                    }
                }
            };

            for command in commands {
                let Some(reply) = self.service.respond(command).await else {
                    debug!(?command, "No reply");
                    continue;
                };
                if let Err(e) = self.notifier.send(&reply.text, reply.image).await {
                    warn!(error = %e, ?command, "Failed to deliver reply");
                }
            }
        }

        info!("Shutting down command listener");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use super::*;
    use crate::adapters::MemoryStorage;
    use crate::application::monitoring::tests::{service_with, ScriptedSource};
    use crate::domain::MetricColumn;
    use crate::ports::{Chart, Command, NotifyError, SampleError};

    #[derive(Default)]
    struct RecordingNotifier {
        sent: StdMutex<Vec<(String, Option<String>)>>,
        inbound: StdMutex<VecDeque<Result<Vec<Command>, NotifyError>>>,
        fail_sends: bool,
    }

    impl RecordingNotifier {
        fn with_inbound(batches: Vec<Result<Vec<Command>, NotifyError>>) -> Self {
            Self {
                inbound: StdMutex::new(batches.into()),
                ..Default::default()
            }
        }

        fn sent(&self) -> Vec<(String, Option<String>)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, text: &str, image: Option<Chart>) -> Result<(), NotifyError> {
            self.sent
                .lock()
                .unwrap()
                .push((text.to_string(), image.map(|c| c.file_name)));
            if self.fail_sends {
                return Err(NotifyError::Api("chat unreachable".to_string()));
            }
            Ok(())
        }

        async fn next_commands(&self) -> Result<Vec<Command>, NotifyError> {
            let next = self.inbound.lock().unwrap().pop_front();
            match next {
                Some(batch) => batch,
                None => std::future::pending().await,
            }
        }
    }

    fn config() -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_secs(3600),
            backoff: Duration::from_secs(60),
        }
    }

    async fn wait_for_sent(notifier: &RecordingNotifier, count: usize) {
        for _ in 0..1000 {
            if notifier.sent().len() >= count {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} messages, got {:?}", count, notifier.sent());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_recovers_from_failed_cycle() {
        let storage = Arc::new(MemoryStorage::new());
        let source = ScriptedSource::new(vec![Err(SampleError::Unavailable("boom".to_string()))]);
        let service = Arc::new(service_with(source, storage.clone()));
        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler = Arc::new(Scheduler::new(service, notifier.clone(), config()));

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.run_timer(shutdown_rx).await })
        };

        // t=0 fails, t=1h and t=2h succeed
        sleep(Duration::from_secs(2 * 3600 + 30)).await;
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|(text, _)| text.starts_with("📊 Server status report:")));
        assert_eq!(storage.saved().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivery_failure_still_stores_sample() {
        let storage = Arc::new(MemoryStorage::new());
        let service = Arc::new(service_with(ScriptedSource::new(vec![]), storage.clone()));
        let notifier = Arc::new(RecordingNotifier {
            fail_sends: true,
            ..Default::default()
        });
        let scheduler = Arc::new(Scheduler::new(service, notifier.clone(), config()));

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.run_timer(shutdown_rx).await })
        };

        sleep(Duration::from_secs(3600 + 30)).await;
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        assert_eq!(notifier.sent().len(), 2);
        assert_eq!(storage.saved().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_are_answered_in_order() {
        let service = Arc::new(service_with(ScriptedSource::new(vec![]), Arc::new(MemoryStorage::new())));
        service.run_cycle().await.unwrap();

        let notifier = Arc::new(RecordingNotifier::with_inbound(vec![
            Ok(vec![Command::Help, Command::Report]),
            Err(NotifyError::Api("Bad Gateway".to_string())),
            Ok(vec![Command::Chart(MetricColumn::Ram)]),
        ]));
        let scheduler = Arc::new(Scheduler::new(service, notifier.clone(), config()));

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.run_commands(shutdown_rx).await })
        };

        wait_for_sent(&notifier, 3).await;
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        let sent = notifier.sent();
        assert!(sent[0].0.contains("/help"));
        assert!(sent[1].0.starts_with("📊 Server status report:"));
        assert_eq!(sent[2].1.as_deref(), Some("ram.svg"));
    }
}
