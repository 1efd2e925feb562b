use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use super::error::ReportError;
use super::types::{ProgressReport, ProgressReporter, RemoteProgress};
use crate::route::Route;

#[derive(Debug, Clone, Copy)]
pub struct ReporterOptions {
    pub queue: usize,
    pub timeout: Duration,
}

impl Default for ReporterOptions {
    fn default() -> Self {
        Self {
            queue: 16,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Owning end of a background reporting task.
///
/// Reports are queued without waiting; when the queue is full the report is
/// dropped. Dropping the handle aborts the task.
#[derive(Debug)]
pub struct ReportHandle {
    tx: mpsc::Sender<ProgressReport>,
    latest: watch::Receiver<Option<RemoteProgress>>,
    join: JoinHandle<()>,
}

impl ReportHandle {
    pub fn submit(&self, report: ProgressReport) -> bool {
        match self.tx.try_send(report) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::debug!("report queue full, dropping report for {}", report.timestamp);
                false
            }
            Err(TrySendError::Closed(_)) => {
                log::warn!("reporting task is gone, dropping report");
                false
            }
        }
    }

    pub fn latest(&self) -> Option<RemoteProgress> {
        *self.latest.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<RemoteProgress>> {
        self.latest.clone()
    }
}

impl Drop for ReportHandle {
    fn drop(&mut self) {
        self.join.abort();
    }
}

/// Start the reporting task for `route`. Must be called inside a tokio runtime.
pub fn spawn_reporter(
    reporter: Arc<dyn ProgressReporter>,
    route: Route,
    options: ReporterOptions,
) -> ReportHandle {
    let (tx, rx) = mpsc::channel(options.queue.max(1));
    let (latest_tx, latest) = watch::channel(None);
    let join = tokio::spawn(run_reporter_loop(
        reporter,
        route,
        rx,
        latest_tx,
        options.timeout,
    ));

    ReportHandle { tx, latest, join }
}

async fn run_reporter_loop(
    reporter: Arc<dyn ProgressReporter>,
    route: Route,
    mut rx: mpsc::Receiver<ProgressReport>,
    latest_tx: watch::Sender<Option<RemoteProgress>>,
    limit: Duration,
) {
    let mut initialised = init_route(reporter.as_ref(), &route, limit).await;

    while let Some(report) = rx.recv().await {
        // A backend without our route answers with zeroed progress.
        if !initialised {
            initialised = init_route(reporter.as_ref(), &route, limit).await;
            if !initialised {
                log::debug!("route not initialised remotely, skipping report");
                continue;
            }
        }

        match timeout(limit, reporter.location_update(&report)).await {
            Ok(Ok(progress)) => {
                if latest_tx.send(Some(progress)).is_err() {
                    break;
                }
            }
            Ok(Err(e)) => log::warn!("progress report failed: {}", e),
            Err(_) => log::warn!("progress report failed: {}", ReportError::Timeout(limit)),
        }
    }

    log::debug!("reporting task finished");
}

async fn init_route(reporter: &dyn ProgressReporter, route: &Route, limit: Duration) -> bool {
    match timeout(limit, reporter.init_route(route)).await {
        Ok(Ok(())) => {
            log::info!(
                "remote route initialised ({} waypoints)",
                route.waypoints.len()
            );
            true
        }
        Ok(Err(e)) => {
            log::warn!("remote route init failed: {}", e);
            false
        }
        Err(_) => {
            log::warn!("remote route init failed: {}", ReportError::Timeout(limit));
            false
        }
    }
}
