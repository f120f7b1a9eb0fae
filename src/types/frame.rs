//! Typed telemetry frame
//!
//! One [`TelemetryFrame`] is a complete snapshot of the session and all 22 grid
//! slots for a single producer tick. Both frame sources decode into this type
//! exactly once; everything downstream works on these strong types.

use serde::{Deserialize, Deserializer, Serialize};

use super::codes::{PitStatus, SessionType, TireCompound};
use super::track::Track;
use crate::{Result, TelemetryError};

/// Number of competitor slots in every frame.
pub const GRID_SLOTS: usize = 22;

/// Sentinel written by the Steam build of the game.
pub const SENTINEL_STEAM: f32 = 8021.863_281;
/// Sentinel written by the Epic build of the game.
pub const SENTINEL_EPIC: f32 = 8214.523_438;
const SENTINEL_TOLERANCE: f32 = 1e-3;

/// Weather block of the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Weather {
    pub air_temp: f32,
    pub track_temp: f32,
    /// Raw weather code, see [`super::WeatherKind`]
    pub weather: i32,
    pub water_on_track: f32,
}

/// Session-wide state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionFrame {
    pub time_elapsed: f32,
    pub rubber: f32,
    pub track_id: i32,
    pub session_type: i32,
    pub weather: Weather,
}

impl SessionFrame {
    pub fn kind(&self) -> SessionType {
        SessionType::from_code(self.session_type)
    }

    pub fn track(&self) -> &'static Track {
        Track::by_id(self.track_id)
    }
}

/// Temperatures and wear for one tire corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TireCorner {
    pub surface_temp: f32,
    pub temp: f32,
    pub brake_temp: f32,
    pub wear: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tires {
    pub front_left: TireCorner,
    pub front_right: TireCorner,
    pub rear_left: TireCorner,
    pub rear_right: TireCorner,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Components {
    pub engine_temp: f32,
    pub engine_wear: f32,
    pub gearbox_wear: f32,
    pub ers_wear: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Energy {
    pub charge: f32,
    pub harvested: f32,
    pub spent: f32,
    pub fuel: f32,
    pub fuel_delta: f32,
}

/// Strategy modes and driver assist instructions (raw codes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Strategy {
    pub pace_mode: i32,
    pub fuel_mode: i32,
    pub ers_mode: i32,
    pub drs_mode: i32,
    pub ers_assist: i32,
    pub overtake_aggression: i32,
    pub defend_approach: i32,
    pub drive_clean_air: i32,
    pub avoid_high_kerbs: i32,
    pub dont_fight_teammate: i32,
}

/// Lap and sector timings in seconds; zero means "no time".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timings {
    pub best_lap: f32,
    pub current_lap_time: f32,
    pub last_lap_time: f32,
    pub last_s1: f32,
    pub last_s2: f32,
    pub last_s3: f32,
}

impl Timings {
    /// Sector times in order, S1 to S3.
    pub fn sectors(&self) -> [f32; 3] {
        [self.last_s1, self.last_s2, self.last_s3]
    }
}

/// One grid slot for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompetitorFrame {
    pub driver_pos: i32,
    /// Zero-based lap counter as reported by the game
    pub current_lap: i32,
    pub tire_compound: i32,
    pub pit_status: i32,
    pub tires: Tires,
    pub components: Components,
    pub energy: Energy,
    pub team_id: i32,
    pub driver_number: i32,
    pub driver_id: i32,
    pub turn: i32,
    pub speed: i32,
    pub rpm: i32,
    pub gear: i32,
    /// Zero-based running position
    pub position: i32,
    pub strategy: Strategy,
    pub timings: Timings,
    pub distance_travelled: f32,
    pub gap_to_leader: f32,
}

impl CompetitorFrame {
    pub fn compound(&self) -> TireCompound {
        TireCompound::from_code(self.tire_compound)
    }

    pub fn pit(&self) -> PitStatus {
        PitStatus::from_code(self.pit_status)
    }

    /// Lap number as shown to users (one-based).
    pub fn display_lap(&self) -> u32 {
        (self.current_lap.max(0) as u32) + 1
    }

    /// Running position as shown to users (one-based).
    pub fn display_position(&self) -> u32 {
        (self.position.max(0) as u32) + 1
    }

    pub fn has_driver(&self) -> bool {
        self.driver_id != 0
    }

    /// A car with a stalled engine in a race has retired.
    pub fn is_retired(&self) -> bool {
        self.rpm == 0
    }
}

/// Complete snapshot for one producer tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelemetryFrame {
    pub session: SessionFrame,
    pub camera_focus: i32,
    pub sentinel: f32,
    #[serde(deserialize_with = "deserialize_slots")]
    pub competitors: [CompetitorFrame; GRID_SLOTS],
}

impl Default for TelemetryFrame {
    fn default() -> Self {
        Self {
            session: SessionFrame::default(),
            camera_focus: 0,
            sentinel: 0.0,
            competitors: [CompetitorFrame::default(); GRID_SLOTS],
        }
    }
}

impl TelemetryFrame {
    /// Whether the frame carries one of the known-good sentinel values.
    pub fn has_valid_sentinel(&self) -> bool {
        is_valid_sentinel(self.sentinel)
    }

    /// Decode a JSON payload from the streaming channel.
    pub fn from_json(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload)
            .map_err(|e| TelemetryError::parse("Frame payload", e.to_string()))
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| TelemetryError::parse("Frame payload", e.to_string()))
    }
}

pub fn is_valid_sentinel(value: f32) -> bool {
    [SENTINEL_STEAM, SENTINEL_EPIC].iter().any(|known| (value - known).abs() < SENTINEL_TOLERANCE)
}

/// Accept any number of competitor entries; pad with defaults or drop extras.
fn deserialize_slots<'de, D>(deserializer: D) -> std::result::Result<[CompetitorFrame; GRID_SLOTS], D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<CompetitorFrame>::deserialize(deserializer)?;
    let mut slots = [CompetitorFrame::default(); GRID_SLOTS];
    for (slot, entry) in slots.iter_mut().zip(entries) {
        *slot = entry;
    }
    Ok(slots)
}
