//! Session facade tying a frame source to the aggregator

use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::DropGuard;
use tracing::info;

use crate::aggregator::{Aggregator, DashboardSnapshot, ExportHook, HistoryStore, StandingsIndex};
use crate::config::PitlaneConfig;
use crate::driver::{self, Driver, DriverHandle};
use crate::provider::FrameSource;
use crate::reference::ReferenceCache;
use crate::status::ConnectionStatus;
use crate::stream::ThrottleExt;
use crate::types::UpdateRate;
use crate::{Result, TelemetryError, providers};

/// Entry point for telemetry sessions.
///
/// # Examples
///
/// ```rust,no_run
/// use futures::StreamExt;
/// use pitlane::{Pitlane, PitlaneConfig, UpdateRate};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> pitlane::Result<()> {
///     let session = Pitlane::start(PitlaneConfig::load("pitlane.yaml")?).await?;
///     let mut snapshots = session.subscribe(UpdateRate::Max(4));
///     while let Some(snapshot) = snapshots.next().await {
///         println!("{} cars on track", snapshot.running_order().len());
///     }
///     Ok(())
/// }
/// ```
pub struct Pitlane;

impl Pitlane {
    /// Start a session reading from the source named in `config`.
    ///
    /// Succeeds even when the producer is not running yet; the status channel
    /// reports progress until frames arrive.
    pub async fn start(config: PitlaneConfig) -> Result<PitlaneSession> {
        config.validate()?;
        let source = providers::from_config(&config.source)?;
        Self::start_with_source(config, source, None).await
    }

    /// Start a session over an explicit source, optionally with an export hook.
    pub async fn start_with_source<S>(
        config: PitlaneConfig,
        source: S,
        export: Option<Arc<dyn ExportHook>>,
    ) -> Result<PitlaneSession>
    where
        S: FrameSource,
    {
        let reference = Arc::new(ReferenceCache::from_config(&config.archive));
        if reference.is_enabled() {
            // Load once up front so the first snapshot is already decorated.
            driver::refresh_reference(&reference).await;
        }
        let mut aggregator = Aggregator::new(&config, reference);
        if let Some(hook) = export {
            aggregator = aggregator.with_export(hook);
        }
        let aggregator = Arc::new(aggregator);

        info!(source = %source.describe(), "Starting telemetry session");
        let driver = Driver::spawn(source, Arc::clone(&aggregator));
        let guard = driver.cancel.clone().drop_guard();

        Ok(PitlaneSession { driver, aggregator, shutdown_timeout: config.shutdown_timeout(), _guard: guard })
    }
}

/// A running session. Dropping it cancels the polling task.
pub struct PitlaneSession {
    driver: DriverHandle,
    aggregator: Arc<Aggregator>,
    shutdown_timeout: Duration,
    _guard: DropGuard,
}

impl PitlaneSession {
    /// Snapshots at the requested rate.
    ///
    /// Yields the current snapshot first when one exists. Ends when the
    /// session stops.
    pub fn subscribe(&self, rate: UpdateRate) -> impl Stream<Item = Arc<DashboardSnapshot>> + 'static {
        // The channel starts empty, so skip the initial `None` rather than ending on it.
        let snapshots = WatchStream::new(self.driver.snapshots.clone()).filter_map(|snapshot| async move { snapshot });

        match rate.interval() {
            None => snapshots.boxed(),
            Some(period) => snapshots.throttle(period).boxed(),
        }
    }

    /// Connectivity changes, starting with the current status.
    pub fn status_updates(&self) -> impl Stream<Item = ConnectionStatus> + 'static {
        WatchStream::new(self.driver.status.clone())
    }

    pub fn status(&self) -> ConnectionStatus {
        self.driver.status.borrow().clone()
    }

    pub fn latest(&self) -> Option<Arc<DashboardSnapshot>> {
        self.driver.snapshots.borrow().clone()
    }

    pub fn standings(&self) -> &Arc<StandingsIndex> {
        self.aggregator.standings()
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        self.aggregator.history()
    }

    pub fn reference(&self) -> &Arc<ReferenceCache> {
        self.aggregator.reference()
    }

    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    /// Stop polling, waiting at most the configured shutdown timeout.
    ///
    /// The task is aborted when it overruns, reported as [`TelemetryError::Timeout`].
    pub async fn shutdown(self) -> Result<()> {
        let Self { driver, shutdown_timeout, .. } = self;
        if !driver.shutdown(shutdown_timeout).await {
            return Err(TelemetryError::Timeout { duration: shutdown_timeout });
        }
        info!("Telemetry session shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;
    use crate::providers::stream::write_frame;
    use crate::test_utils::{TestFrame, race_frame};
    use crate::types::TelemetryFrame;
    use parking_lot::Mutex;

    fn stream_config(path: &std::path::Path) -> PitlaneConfig {
        PitlaneConfig {
            source: SourceConfig::Stream { path: path.to_path_buf(), max_frame_len: 1 << 20 },
            ..PitlaneConfig::default()
        }
    }

    #[tokio::test]
    async fn snapshots_flow_from_channel_file() {
        let _ = tracing_subscriber::fmt::try_init();
        let dir = tempfile::tempdir().expect("tempdir");
        let channel = dir.path().join("F1Manager_Telemetry");
        write_frame(&channel, &race_frame(14, &[0.0, 0.8, 2.5])).expect("write frame");

        let session = Pitlane::start(stream_config(&channel)).await.expect("session");
        let mut snapshots = session.subscribe(UpdateRate::Native);
        let snapshot = snapshots.next().await.expect("snapshot");

        let order: Vec<&str> = snapshot.running_order().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(order.len(), 3);
        assert_eq!(session.standings().name_at(1).as_deref(), Some(order[0]));
        assert!(session.status().connected);
        session.shutdown().await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn missing_channel_is_reported_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = Pitlane::start(stream_config(&dir.path().join("absent"))).await.expect("session");

        let mut updates = session.status_updates();
        while let Some(status) = updates.next().await {
            if status.message == ConnectionStatus::CHANNEL_MISSING {
                break;
            }
        }
        assert!(session.latest().is_none());
        session.shutdown().await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn export_hook_sees_tracked_turns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let channel = dir.path().join("channel");
        let frame: TelemetryFrame = race_frame(1, &[0.0]).with_turn(3);
        write_frame(&channel, &frame).expect("write frame");

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let hook: Arc<dyn ExportHook> =
            Arc::new(move |competitor: &str, frame: &TelemetryFrame, _: &crate::reference::ReferenceView<'_>| {
                sink.lock().push((competitor.to_string(), frame.competitors[0].turn));
            });

        let mut config = stream_config(&channel);
        config.export.enabled = true;
        config.export.tracked_competitors = vec![crate::types::competitor_name(0).expect("slot 0").to_string()];

        let session = Pitlane::start_with_source(
            config.clone(),
            providers::from_config(&config.source).expect("source"),
            Some(hook),
        )
        .await
        .expect("session");
        session.subscribe(UpdateRate::Native).next().await.expect("snapshot");

        assert_eq!(seen.lock().first().map(|(_, turn)| *turn), Some(3));
        session.shutdown().await.expect("clean shutdown");
    }

    #[test]
    fn invalid_config_is_rejected_before_spawning() {
        let mut config = PitlaneConfig::default();
        config.history.max_laps = 0;
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().expect("runtime");
        assert!(runtime.block_on(Pitlane::start(config)).is_err());
    }

    #[tokio::test]
    async fn save_is_loaded_before_the_first_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let channel = dir.path().join("channel");
        write_frame(&channel, &race_frame(14, &[0.0, 0.8])).expect("write frame");
        crate::test_utils::write_save_archive(&dir.path().join("autosave.sav"), 2024).expect("save");

        let mut config = stream_config(&channel);
        config.archive.save_path = Some(dir.path().join("autosave.sav"));
        config.archive.output_dir = Some(dir.path().join("Unpacked"));

        let session = Pitlane::start(config).await.expect("session");
        assert!(session.reference().snapshot().is_some());
        session.shutdown().await.expect("clean shutdown");
    }
}
