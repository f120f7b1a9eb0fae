//! Export hook invoked on lap/turn transitions

use crate::reference::ReferenceView;
use crate::types::TelemetryFrame;

/// Receives one call per detected transition of a tracked competitor.
///
/// Called with the frame lock held; implementations should hand the work off
/// rather than block on I/O.
pub trait ExportHook: Send + Sync {
    fn export(&self, competitor: &str, frame: &TelemetryFrame, reference: &ReferenceView<'_>);
}

impl<F> ExportHook for F
where
    F: Fn(&str, &TelemetryFrame, &ReferenceView<'_>) + Send + Sync,
{
    fn export(&self, competitor: &str, frame: &TelemetryFrame, reference: &ReferenceView<'_>) {
        self(competitor, frame, reference)
    }
}
