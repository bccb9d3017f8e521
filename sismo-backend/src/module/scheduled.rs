///! Scheduled task manager
///!
///! Runs the monitoring cycle on a fixed interval. Cycles never overlap: a
///! tick that comes due while a cycle is still running is skipped. Shutdown
///! is only observed between cycles, so an in-flight dispatch always finishes.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::monitor::{CycleReport, Monitor};
use crate::config::SchedulerConfig;

/// Configuration for scheduled tasks
#[derive(Debug, Clone)]
pub struct ScheduledTaskConfig {
    /// Time between monitoring cycles
    pub monitor_interval: Duration,

    /// Run a cycle immediately instead of after the first interval
    pub run_on_startup: bool,
}

impl Default for ScheduledTaskConfig {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

impl From<&SchedulerConfig> for ScheduledTaskConfig {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            monitor_interval: config.interval(),
            run_on_startup: config.run_on_startup,
        }
    }
}

/// Scheduled task manager
pub struct ScheduledTaskManager {
    config: ScheduledTaskConfig,
    monitor: Arc<Monitor>,
    shutdown_tx: watch::Sender<bool>,
    task_handles: Vec<JoinHandle<()>>,
}

impl ScheduledTaskManager {
    pub fn new(config: ScheduledTaskConfig, monitor: Arc<Monitor>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            monitor,
            shutdown_tx,
            task_handles: Vec::new(),
        }
    }

    /// Start all scheduled tasks
    pub fn start_all(&mut self) {
        tracing::info!("Starting scheduled task manager...");

        let handle = self.start_monitor_task();
        self.task_handles.push(handle);

        tracing::info!(
            "Started {} scheduled tasks (event monitor every {:.1} min)",
            self.task_handles.len(),
            self.config.monitor_interval.as_secs_f64() / 60.0
        );
    }

    fn start_monitor_task(&self) -> JoinHandle<()> {
        let monitor = self.monitor.clone();
        let period = self.config.monitor_interval;
        let start = if self.config.run_on_startup {
            Instant::now()
        } else {
            Instant::now() + period
        };
        let shutdown_rx = self.shutdown_tx.subscribe();

        tracing::info!(
            "Scheduling event monitor (interval: {:?}, initial: {})",
            period,
            self.config.run_on_startup
        );

        tokio::spawn(Self::monitor_loop(monitor, start, period, shutdown_rx))
    }

    async fn monitor_loop(
        monitor: Arc<Monitor>,
        start: Instant,
        period: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown_rx.changed() => break,
            }
            if *shutdown_rx.borrow() {
                break;
            }

            tracing::info!("Running event monitor cycle at {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
            Self::run_monitor_cycle(&monitor).await;
        }

        tracing::info!("Event monitor stopped");
    }

    /// Run one cycle in its own task so a panic ends the cycle, not the loop.
    async fn run_monitor_cycle(monitor: &Arc<Monitor>) -> Option<CycleReport> {
        let monitor = monitor.clone();
        match tokio::spawn(async move { monitor.run_cycle().await }).await {
            Ok(report) => {
                match &report {
                    CycleReport::NoEvents => tracing::info!("Cycle finished: no events"),
                    CycleReport::AlreadyNotified { id } => {
                        tracing::info!("Cycle finished: event {} already notified", id)
                    }
                    CycleReport::Dispatched { id, report } => tracing::info!(
                        "Cycle finished: event {} dispatched ({} delivered, {} failed chunks)",
                        id,
                        report.delivered(),
                        report.failed_chunks
                    ),
                }
                Some(report)
            }
            Err(e) => {
                tracing::error!("Event monitor cycle aborted: {}", e);
                None
            }
        }
    }

    /// Stop all tasks, letting an in-flight cycle finish first.
    pub async fn shutdown(self) {
        tracing::info!("Shutting down scheduled task manager...");

        let _ = self.shutdown_tx.send(true);
        for handle in self.task_handles {
            if let Err(e) = handle.await {
                tracing::warn!("Scheduled task ended abnormally: {}", e);
            }
        }

        tracing::info!("All scheduled tasks stopped");
    }
}
