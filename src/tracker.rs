//! Per-listener device tracking with periodic report flushing.

use crate::config::{TrackerConfig, DEFAULT_OUTPUT_DIR};
use crate::registry::{DeviceRecord, DeviceRegistry};
use crate::report::MonthlyReport;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Tracks endpoint activity and persists it to monthly report files.
///
/// Construction creates the output directory and the current month's report
/// file, then spawns a background task that flushes the registry on the
/// configured interval and rotates the report at month boundaries. `close`
/// stops the task and writes a final snapshot; after that the tracker only
/// accumulates in memory.
#[derive(Debug)]
pub struct DeviceTracker {
    inner: Arc<TrackerInner>,
    shutdown_tx: watch::Sender<bool>,
    flush_task: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug)]
struct TrackerInner {
    registry: DeviceRegistry,
    output_dir: PathBuf,
    /// Current report target; `None` once the tracker is closed
    report: Mutex<Option<MonthlyReport>>,
}

impl DeviceTracker {
    /// Create a tracker and start its background flush task.
    ///
    /// Must be called from within a tokio runtime. Fails if the output
    /// directory or the current month's report file cannot be created.
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        let output_dir = resolve_output_dir(config);
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

        let report = MonthlyReport::create(&output_dir, Utc::now())?;
        info!(path = %report.path().display(), "device tracker started");

        let inner = Arc::new(TrackerInner {
            registry: DeviceRegistry::with_retention(config.retention()),
            output_dir,
            report: Mutex::new(Some(report)),
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let flush_task = tokio::spawn(flush_loop(
            Arc::clone(&inner),
            config.flush_interval(),
            shutdown_rx,
        ));

        Ok(Self {
            inner,
            shutdown_tx,
            flush_task: Mutex::new(Some(flush_task)),
        })
    }

    /// Record one connection event for an endpoint.
    pub fn record_connection(&self, address: &str, port: u16, protocol: &str, tag: &str) {
        self.inner.registry.record_connection(address, port, protocol, tag);
    }

    /// Record a traffic delta for an endpoint.
    pub fn record_traffic(&self, address: &str, port: u16, uplink: u64, downlink: u64) {
        self.inner.registry.record_traffic(address, port, uplink, downlink);
    }

    /// Get the underlying registry.
    pub fn registry(&self) -> &DeviceRegistry {
        &self.inner.registry
    }

    /// Get a copy of one endpoint's current state.
    pub fn lookup(&self, address: &str, port: u16) -> Option<DeviceRecord> {
        self.inner.registry.lookup(address, port)
    }

    /// Get a point-in-time copy of all tracked endpoints.
    pub fn snapshot(&self) -> HashMap<String, DeviceRecord> {
        self.inner.registry.snapshot()
    }

    /// Get the directory report files are written to.
    pub fn output_dir(&self) -> &Path {
        &self.inner.output_dir
    }

    /// Get the path of the current report file, if the tracker is open.
    pub fn report_path(&self) -> Option<PathBuf> {
        self.inner
            .report
            .lock()
            .as_ref()
            .map(|report| report.path().to_path_buf())
    }

    /// Append the current snapshot to the report file now.
    ///
    /// A no-op after `close`.
    pub fn flush(&self) -> Result<()> {
        self.inner.flush_now()
    }

    /// Stop the background task and write a final snapshot.
    ///
    /// Idempotent; a second call does nothing. Recording still works after
    /// close but nothing is persisted anymore.
    pub async fn close(&self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);

        let task = self.flush_task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "flush task ended abnormally");
            }
        }

        let report = self.inner.report.lock().take();
        if let Some(report) = report {
            let records = self.inner.collect_records();
            report
                .append(&records)
                .context("Failed to write final device report")?;
            info!(path = %report.path().display(), "device tracker closed");
        }
        Ok(())
    }
}

impl TrackerInner {
    /// Collect the registry snapshot as a flat record list.
    fn collect_records(&self) -> Vec<DeviceRecord> {
        self.registry.snapshot().into_values().collect()
    }

    /// Append the current snapshot to the report under the persistence lock.
    fn flush_now(&self) -> Result<()> {
        let guard = self.report.lock();
        let Some(report) = guard.as_ref() else {
            return Ok(());
        };
        report.append(&self.collect_records())
    }

    /// Switch to a new report file if `now` falls in a different month.
    ///
    /// The outgoing file gets a final snapshot first; failure to write it is
    /// logged but does not block rotation. The new report only becomes the
    /// target once its creation succeeded, so on failure the previous file
    /// keeps receiving flushes and rotation is retried on the next tick.
    fn rotate_if_needed(&self, now: DateTime<Utc>) -> Result<()> {
        let mut guard = self.report.lock();
        let Some(current) = guard.as_ref() else {
            return Ok(());
        };
        if current.covers(now) {
            return Ok(());
        }

        if let Err(e) = current.append(&self.collect_records()) {
            warn!(
                path = %current.path().display(),
                error = %e,
                "failed to write final section of outgoing report"
            );
        }

        let next = MonthlyReport::create(&self.output_dir, now)?;
        info!(
            path = %next.path().display(),
            month = next.month(),
            "rotated monthly report"
        );
        *guard = Some(next);
        Ok(())
    }
}

/// Background loop: flush on every interval tick, rotate on month change.
///
/// Errors are logged and the loop keeps running; one failed flush must not
/// end persistence. Exits when the shutdown signal fires or its sender is
/// dropped.
async fn flush_loop(
    inner: Arc<TrackerInner>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(period) => {
                if let Err(e) = inner.rotate_if_needed(Utc::now()) {
                    warn!(error = %e, "failed to rotate monthly report");
                }
                if let Err(e) = inner.flush_now() {
                    warn!(error = %e, "failed to flush device report");
                }
            }
            _ = shutdown_rx.changed() => break,
        }
    }
}

/// Resolve the output directory, falling back to the default when empty.
fn resolve_output_dir(config: &TrackerConfig) -> PathBuf {
    if config.output_dir.as_os_str().is_empty() {
        PathBuf::from(DEFAULT_OUTPUT_DIR)
    } else {
        config.output_dir.clone()
    }
}
