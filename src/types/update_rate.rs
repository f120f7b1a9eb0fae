//! Dashboard subscription rates

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often a dashboard subscription wants snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateRate {
    /// Every processed frame
    #[default]
    Native,

    /// At most this many snapshots per second, latest wins.
    /// Zero is treated as one.
    Max(u32),
}

impl UpdateRate {
    /// Producer rate the aggregator is tuned for.
    pub const NOMINAL_SOURCE_HZ: u32 = 60;

    /// Collapse rates at or above the source rate into [`UpdateRate::Native`].
    pub fn normalize(self, source_hz: u32) -> Self {
        match self {
            UpdateRate::Max(hz) if hz >= source_hz => UpdateRate::Native,
            other => other,
        }
    }

    /// Throttle interval, or `None` when every snapshot should pass through.
    pub fn interval(self) -> Option<Duration> {
        match self.normalize(Self::NOMINAL_SOURCE_HZ) {
            UpdateRate::Native => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / f64::from(hz.max(1)))),
        }
    }
}
