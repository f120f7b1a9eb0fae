//! Frame source trait

use super::types::TelemetryFrame;
use crate::Result;

/// Trait for telemetry frame sources
///
/// A source is polled in a tight loop by a single [`Driver`](crate::driver::Driver)
/// task and owns whatever handle it needs on the producer channel.
#[async_trait::async_trait]
pub trait FrameSource: Send + 'static {
    /// Read the latest frame
    ///
    /// Returns:
    /// - `Ok(Some(frame))` - A validated frame
    /// - `Ok(None)` - Nothing usable right now (torn write, bad length, bad sentinel)
    /// - `Err(e)` - The channel could not be read; [`TelemetryError::backoff`](crate::TelemetryError::backoff)
    ///   says how long to wait before polling again
    async fn poll(&mut self) -> Result<Option<TelemetryFrame>>;

    /// Short description for logs
    fn describe(&self) -> String;
}

#[async_trait::async_trait]
impl FrameSource for Box<dyn FrameSource> {
    async fn poll(&mut self) -> Result<Option<TelemetryFrame>> {
        (**self).poll().await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
