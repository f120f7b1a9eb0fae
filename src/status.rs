//! Connectivity status shown to dashboards

use serde::Serialize;
use std::fmt;

/// What the dashboard sees of the ingestion loop: a flag plus a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub message: String,
}

impl ConnectionStatus {
    pub const WAITING: &'static str = "Waiting for telemetry";
    pub const CONNECTED: &'static str = "Connected";
    pub const NOT_IN_SESSION: &'static str = "Not in session";
    pub const CHANNEL_MISSING: &'static str = "Telemetry channel not found";

    pub fn waiting() -> Self {
        Self::disconnected(Self::WAITING)
    }

    pub fn connected() -> Self {
        Self { connected: true, message: Self::CONNECTED.to_string() }
    }

    pub fn not_in_session() -> Self {
        Self::disconnected(Self::NOT_IN_SESSION)
    }

    pub fn disconnected(message: impl Into<String>) -> Self {
        Self { connected: false, message: message.into() }
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::waiting()
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.connected { write!(f, "[up] {}", self.message) } else { write!(f, "[down] {}", self.message) }
    }
}
