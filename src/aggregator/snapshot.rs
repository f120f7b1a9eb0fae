//! Flat dashboard properties published after each frame

use serde::Serialize;

use super::competitor::CompetitorState;
use super::standings::Gaps;
use crate::reference::ReferenceView;
use crate::types::{
    CompetitorFrame, Components, DrsMode, Energy, ErsMode, FuelMode, PaceMode, SessionFrame, Tires, WeatherKind,
};

/// Session-wide properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProperties {
    pub track_name: String,
    pub track_length: f32,
    pub session_type: String,
    pub session_type_short: String,
    pub time_elapsed: f32,
    pub rubber: f32,
    pub air_temp: f32,
    pub track_temp: f32,
    pub weather: String,
    pub water_on_track: f32,
    pub best_session_time: f32,
    pub cars_on_grid: u32,
    /// Slot name the game camera follows
    pub camera_focus: String,
}

impl SessionProperties {
    pub fn from_session(session: &SessionFrame) -> Self {
        let track = session.track();
        let kind = session.kind();
        Self {
            track_name: track.name.to_string(),
            track_length: track.length,
            session_type: kind.label().to_string(),
            session_type_short: kind.short_label().to_string(),
            time_elapsed: session.time_elapsed,
            rubber: session.rubber,
            air_temp: session.weather.air_temp,
            track_temp: session.weather.track_temp,
            weather: WeatherKind::from_code(session.weather.weather).label().to_string(),
            water_on_track: session.weather.water_on_track,
            ..Self::default()
        }
    }
}

/// Every named scalar a dashboard shows for one competitor.
///
/// An invalid competitor (retired, or no driver outside a race) is published
/// as [`CompetitorProperties::vacant`], never with stale values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorProperties {
    pub name: String,
    pub active: bool,
    pub position: u32,
    pub driver_number: i32,
    pub first_name: String,
    pub last_name: String,
    pub driver_code: String,
    pub team_name: String,
    pub team_colour: String,
    pub pit_status: String,
    pub lap: u32,
    pub turn: i32,
    pub distance_travelled: f32,
    pub speed: i32,
    pub rpm: i32,
    pub gear: i32,
    pub compound: String,
    pub tire_age: u32,
    pub tires: Tires,
    pub components: Components,
    pub energy: Energy,
    pub pace_mode: String,
    pub fuel_mode: String,
    pub ers_mode: String,
    pub drs_mode: String,
    pub best_lap: f32,
    pub current_lap_time: f32,
    pub last_lap_time: f32,
    pub last_sectors: [f32; 3],
    pub best_sectors: [f32; 3],
    pub speed_trap: i32,
    pub gap_ahead: f32,
    pub gap_behind: f32,
    pub gap_to_leader: f32,
    pub car_ahead: String,
    pub car_behind: String,
    pub points: u32,
}

impl CompetitorProperties {
    pub fn vacant(name: &str) -> Self {
        Self { name: name.to_string(), ..Self::default() }
    }

    pub fn build(
        name: &str,
        car: &CompetitorFrame,
        state: &CompetitorState,
        reference: &ReferenceView<'_>,
        gaps: Gaps,
        points: u32,
    ) -> Self {
        let driver = reference.driver_name(car.driver_id);
        let display_lap = car.display_lap();
        let sectors = state.sectors;

        Self {
            name: name.to_string(),
            active: true,
            position: car.display_position(),
            driver_number: car.driver_number,
            first_name: driver.first,
            last_name: driver.last,
            driver_code: driver.code,
            team_name: reference.team_name_for_driver(car.driver_id),
            team_colour: reference.team_colour_for_driver(car.driver_id),
            pit_status: car.pit().label().to_string(),
            lap: display_lap,
            turn: car.turn,
            distance_travelled: car.distance_travelled,
            speed: car.speed,
            rpm: car.rpm,
            gear: car.gear,
            compound: car.compound().label().to_string(),
            tire_age: state.tire_age(display_lap),
            tires: car.tires,
            components: car.components,
            energy: car.energy,
            pace_mode: PaceMode::from_code(car.strategy.pace_mode).label().to_string(),
            fuel_mode: FuelMode::from_code(car.strategy.fuel_mode).label().to_string(),
            ers_mode: ErsMode::from_code(car.strategy.ers_mode).label().to_string(),
            drs_mode: DrsMode::from_code(car.strategy.drs_mode).label().to_string(),
            best_lap: car.timings.best_lap,
            current_lap_time: car.timings.current_lap_time,
            last_lap_time: car.timings.last_lap_time,
            last_sectors: [sectors[0].current, sectors[1].current, sectors[2].current],
            best_sectors: state.best_sectors(),
            speed_trap: state.speed_trap.speed,
            gap_ahead: gaps.ahead,
            gap_behind: gaps.behind,
            gap_to_leader: gaps.to_leader,
            car_ahead: gaps.car_ahead,
            car_behind: gaps.car_behind,
            points,
        }
    }
}

/// Everything published after one processed frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    /// Frames processed in this session, starting at 1
    pub sequence: u64,
    pub session: SessionProperties,
    /// One entry per grid slot, in slot order
    pub competitors: Vec<CompetitorProperties>,
}

impl DashboardSnapshot {
    pub fn competitor(&self, name: &str) -> Option<&CompetitorProperties> {
        self.competitors.iter().find(|properties| properties.name == name)
    }

    /// Active competitors sorted by position.
    pub fn running_order(&self) -> Vec<&CompetitorProperties> {
        let mut order: Vec<&CompetitorProperties> = self.competitors.iter().filter(|c| c.active).collect();
        order.sort_by_key(|c| c.position);
        order
    }
}
