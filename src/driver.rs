//! Driver spawns and manages the frame polling task

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::TelemetryError;
use crate::aggregator::{Aggregator, DashboardSnapshot, FrameOutcome};
use crate::error::CONTENTION_BACKOFF;
use crate::provider::FrameSource;
use crate::reference::ReferenceCache;
use crate::status::ConnectionStatus;

/// Shortest period between reference re-checks.
const MIN_REFRESH_PERIOD: Duration = Duration::from_millis(1);

/// Handle to a running polling task.
pub struct DriverHandle {
    /// Latest dashboard snapshot, `None` until the first processed frame
    pub snapshots: watch::Receiver<Option<Arc<DashboardSnapshot>>>,
    pub status: watch::Receiver<ConnectionStatus>,
    pub cancel: CancellationToken,
    task: JoinHandle<()>,
    /// Reference refresh task, present when a save is configured
    refresher: Option<JoinHandle<()>>,
}

impl DriverHandle {
    /// Cancel the tasks and wait up to `timeout` for them to finish; abort them after that.
    ///
    /// Returns whether the tasks stopped on their own.
    pub async fn shutdown(self, timeout: Duration) -> bool {
        self.cancel.cancel();
        let mut tasks: Vec<JoinHandle<()>> = std::iter::once(self.task).chain(self.refresher).collect();
        match tokio::time::timeout(timeout, futures::future::join_all(tasks.iter_mut())).await {
            Ok(_) => true,
            Err(_) => {
                warn!(?timeout, "Driver tasks did not stop in time, aborting");
                for task in &tasks {
                    task.abort();
                }
                false
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Driver spawns the single task that polls a [`FrameSource`] and feeds the [`Aggregator`].
///
/// When the aggregator's [`ReferenceCache`] is backed by a save, a second task
/// re-checks it every recheck interval on the blocking pool, so frames only
/// ever read the cached data.
///
/// The loop never sleeps after a good frame. A frame that was not usable
/// backs off briefly; a failed poll waits for the error's own backoff. The loop
/// only ends on cancellation.
pub struct Driver;

impl Driver {
    pub fn spawn<S>(source: S, aggregator: Arc<Aggregator>) -> DriverHandle
    where
        S: FrameSource,
    {
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::waiting());
        let cancel = CancellationToken::new();

        let refresher = aggregator.reference().recheck_interval().map(|period| {
            let reference = Arc::clone(aggregator.reference());
            let cancel_refresh = cancel.clone();
            tokio::spawn(Self::reference_refresh_task(reference, period, cancel_refresh))
        });

        let cancel_reader = cancel.clone();
        let task = tokio::spawn(async move {
            Self::frame_reader_task(source, aggregator, snapshot_tx, status_tx, cancel_reader).await;
        });

        DriverHandle { snapshots: snapshot_rx, status: status_rx, cancel, task, refresher }
    }

    async fn reference_refresh_task(reference: Arc<ReferenceCache>, period: Duration, cancel: CancellationToken) {
        debug!(?period, "Reference refresh task started");
        let mut ticks = tokio::time::interval(period.max(MIN_REFRESH_PERIOD));
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticks.tick() => {}
            }
            // A pass already on the blocking pool finishes on its own.
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = refresh_reference(&reference) => {}
            }
        }

        debug!("Reference refresh task ended");
    }

    async fn frame_reader_task<S>(
        mut source: S,
        aggregator: Arc<Aggregator>,
        snapshot_tx: watch::Sender<Option<Arc<DashboardSnapshot>>>,
        status_tx: watch::Sender<ConnectionStatus>,
        cancel: CancellationToken,
    ) where
        S: FrameSource,
    {
        info!(source = %source.describe(), "Frame reader task started");
        let mut frame_count = 0u64;
        let mut error_count = 0u64;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = source.poll() => result,
            };

            let backoff = match result {
                Ok(Some(frame)) => match aggregator.on_frame(&frame) {
                    FrameOutcome::Processed(snapshot) => {
                        frame_count += 1;
                        error_count = 0;
                        trace!(frame = frame_count, sequence = snapshot.sequence, "Frame processed");
                        set_status(&status_tx, ConnectionStatus::connected());
                        snapshot_tx.send_replace(Some(snapshot));
                        None
                    }
                    FrameOutcome::NotInSession => {
                        set_status(&status_tx, ConnectionStatus::not_in_session());
                        Some(CONTENTION_BACKOFF)
                    }
                },
                Ok(None) => {
                    set_status(&status_tx, ConnectionStatus::not_in_session());
                    Some(CONTENTION_BACKOFF)
                }
                Err(e) => {
                    error_count += 1;
                    let backoff = e.backoff();
                    if e.is_retryable() {
                        debug!(error = %e, failures = error_count, ?backoff, "Poll failed");
                    } else {
                        error!(error = %e, failures = error_count, ?backoff, "Poll failed");
                    }
                    let message = match &e {
                        TelemetryError::ChannelMissing { .. } => ConnectionStatus::CHANNEL_MISSING.to_string(),
                        other => other.to_string(),
                    };
                    set_status(&status_tx, ConnectionStatus::disconnected(message));
                    Some(backoff)
                }
            };

            match backoff {
                Some(delay) => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                // Yield so a busy source cannot starve the runtime.
                None => tokio::task::yield_now().await,
            }
        }

        info!(frames = frame_count, "Frame reader task ended");
    }
}

/// Run one reference refresh on the blocking pool.
///
/// Failures keep the cached data and are only logged. Returns whether a new
/// data set was swapped in.
pub async fn refresh_reference(reference: &Arc<ReferenceCache>) -> bool {
    let cache = Arc::clone(reference);
    match tokio::task::spawn_blocking(move || cache.refresh()).await {
        Ok(Ok(swapped)) => swapped,
        Ok(Err(e)) => {
            warn!(error = %e, "Reference refresh failed, keeping cached data");
            false
        }
        Err(e) => {
            error!(error = %e, "Reference refresh task failed");
            false
        }
    }
}

/// Publish only real status changes so watchers are not woken every frame.
fn set_status(status_tx: &watch::Sender<ConnectionStatus>, status: ConnectionStatus) {
    status_tx.send_if_modified(|current| {
        if *current == status {
            return false;
        }
        debug!(%status, "Connection status changed");
        *current = status;
        true
    });
}
