//! Background reconciliation daemon.
//!
//! Runs a reconciliation pass, re-reads the persisted settings, sleeps for
//! the configured poll interval and repeats. Pass failures are logged and
//! counted; the loop itself only ends on a stop request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify, RwLock};
use tokio::time::Instant;

use crate::adapters::json_store::JsonStore;
use crate::domain::models::{PollerConfig, Settings};
use crate::services::reconciler::{PassReport, Reconciler};

/// Configuration for the poll daemon.
#[derive(Debug, Clone)]
pub struct PollDaemonConfig {
    /// Whether to run a pass before the first sleep.
    pub run_on_startup: bool,
    /// Interval used when settings cannot be read.
    pub fallback_interval: Duration,
}

impl Default for PollDaemonConfig {
    fn default() -> Self {
        Self {
            run_on_startup: true,
            fallback_interval: Settings::default().poll_interval(),
        }
    }
}

impl From<&PollerConfig> for PollDaemonConfig {
    fn from(config: &PollerConfig) -> Self {
        Self {
            run_on_startup: config.run_on_startup,
            ..Default::default()
        }
    }
}

/// Event emitted by the poll daemon.
#[derive(Debug, Clone)]
pub enum PollEvent {
    /// Daemon started.
    Started,
    /// Pass completed.
    PassCompleted {
        run_number: u64,
        report: PassReport,
        duration_ms: u64,
    },
    /// Pass failed.
    PassFailed { run_number: u64, error: String },
    /// Daemon stopped.
    Stopped,
}

/// Status of the poll daemon.
#[derive(Debug, Clone, Default)]
pub struct PollStatus {
    /// Whether the daemon is running.
    pub running: bool,
    /// Total passes started.
    pub total_runs: u64,
    /// Passes that completed.
    pub successful_runs: u64,
    /// Passes that failed.
    pub failed_runs: u64,
    /// End of the last pass.
    pub last_run: Option<Instant>,
    /// Interval chosen for the current sleep.
    pub current_interval: Option<Duration>,
}

/// Stop flag that also wakes a sleeping daemon.
#[derive(Debug, Default)]
struct StopSignal {
    requested: AtomicBool,
    wake: Notify,
}

impl StopSignal {
    fn request(&self) {
        self.requested.store(true, Ordering::Release);
        // notify_one keeps a permit when nobody is waiting yet.
        self.wake.notify_one();
    }

    fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

/// Handle to control the poll daemon.
#[derive(Clone)]
pub struct PollHandle {
    stop: Arc<StopSignal>,
    status: Arc<RwLock<PollStatus>>,
}

impl PollHandle {
    /// Request the daemon to stop. A pass in progress ends before its next
    /// student.
    pub fn stop(&self) {
        self.stop.request();
    }

    /// Check if stop was requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_requested()
    }

    /// Get current daemon status.
    pub async fn status(&self) -> PollStatus {
        self.status.read().await.clone()
    }
}

/// Periodic reconciliation daemon.
pub struct PollDaemon {
    reconciler: Arc<Reconciler>,
    store: Arc<JsonStore>,
    config: PollDaemonConfig,
    status: Arc<RwLock<PollStatus>>,
    stop: Arc<StopSignal>,
}

impl PollDaemon {
    pub fn new(reconciler: Arc<Reconciler>, store: Arc<JsonStore>, config: PollDaemonConfig) -> Self {
        Self {
            reconciler,
            store,
            config,
            status: Arc::new(RwLock::new(PollStatus::default())),
            stop: Arc::new(StopSignal::default()),
        }
    }

    /// Get a handle to control the daemon.
    pub fn handle(&self) -> PollHandle {
        PollHandle {
            stop: self.stop.clone(),
            status: self.status.clone(),
        }
    }

    /// Spawn the daemon, returning a channel for events.
    ///
    /// Events are dropped when the receiver lags or is gone; the loop never
    /// waits on its observers.
    pub fn spawn(self) -> mpsc::Receiver<PollEvent> {
        let (tx, rx) = mpsc::channel(100);
        tokio::spawn(async move {
            self.run_loop(tx).await;
        });
        rx
    }

    /// Main daemon loop.
    async fn run_loop(self, tx: mpsc::Sender<PollEvent>) {
        self.status.write().await.running = true;
        let _ = tx.try_send(PollEvent::Started);
        tracing::info!(run_on_startup = self.config.run_on_startup, "poll daemon started");

        if self.config.run_on_startup && !self.stop.is_requested() {
            self.run_pass(&tx).await;
        }

        loop {
            if self.stop.is_requested() {
                break;
            }

            let interval = self.next_interval().await;
            self.status.write().await.current_interval = Some(interval);
            tracing::debug!(interval_secs = interval.as_secs(), "poll daemon sleeping");

            tokio::select! {
                () = tokio::time::sleep(interval) => {}
                () = self.stop.wake.notified() => {}
            }

            if self.stop.is_requested() {
                break;
            }
            self.run_pass(&tx).await;
        }

        self.status.write().await.running = false;
        let _ = tx.try_send(PollEvent::Stopped);
        tracing::info!("poll daemon stopped");
    }

    /// Poll interval from the persisted settings.
    async fn next_interval(&self) -> Duration {
        match self.store.load_settings().await {
            Ok(settings) => settings.poll_interval(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read settings, using fallback interval");
                self.config.fallback_interval
            }
        }
    }

    /// Run a single pass, absorbing any failure.
    async fn run_pass(&self, tx: &mpsc::Sender<PollEvent>) {
        let run_number = {
            let mut status = self.status.write().await;
            status.total_runs += 1;
            status.total_runs
        };

        let start = Instant::now();
        let stop = self.stop.clone();
        let result = self
            .reconciler
            .check_all_until(move || stop.is_requested())
            .await;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(report) => {
                {
                    let mut status = self.status.write().await;
                    status.successful_runs += 1;
                    status.last_run = Some(Instant::now());
                }
                let _ = tx.try_send(PollEvent::PassCompleted {
                    run_number,
                    report,
                    duration_ms,
                });
            }
            Err(e) => {
                tracing::error!(run_number, error = %e, "reconciliation pass failed");
                self.status.write().await.failed_runs += 1;
                let _ = tx.try_send(PollEvent::PassFailed {
                    run_number,
                    error: e.to_string(),
                });
            }
        }
    }
}
