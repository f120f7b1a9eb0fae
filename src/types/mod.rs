//! Core types for telemetry data representation.
//!
//! ## Architecture
//!
//! - [`TelemetryFrame`] is one typed snapshot of the session and all grid slots
//! - [`layout`] decodes and encodes the packed shared-memory record
//! - the code tables ([`SessionType`], [`TireCompound`], [`PitStatus`], ...) turn raw
//!   integers into enums with display labels, never failing on unknown values
//! - [`Track`] holds static circuit facts (length, turn count, speed trap)
//! - [`COMPETITOR_NAMES`] binds each grid slot to a stable name
//!
//! ## Usage Example
//!
//! ```rust
//! use pitlane::types::{TelemetryFrame, SessionType, layout};
//!
//! let mut frame = TelemetryFrame::default();
//! frame.session.session_type = 6;
//! frame.competitors[0].current_lap = 2;
//!
//! let raw = layout::encode(&frame);
//! let decoded = layout::decode(&raw).unwrap();
//! assert_eq!(decoded.session.kind(), SessionType::Race);
//! assert_eq!(decoded.competitors[0].display_lap(), 3);
//! ```

mod codes;
mod frame;
mod grid;
pub mod layout;
mod track;
mod update_rate;

pub use codes::{DrsMode, ErsMode, FuelMode, PaceMode, PitStatus, SessionType, TireCompound, WeatherKind};
pub use frame::{
    CompetitorFrame, Components, Energy, GRID_SLOTS, SENTINEL_EPIC, SENTINEL_STEAM, SessionFrame, Strategy,
    TelemetryFrame, TireCorner, Tires, Timings, Weather, is_valid_sentinel,
};
pub use grid::{COMPETITOR_NAMES, competitor_name, slot_of};
pub use track::{Track, UNKNOWN_TRACK};
pub use update_rate::UpdateRate;
