//! Fixed binary layout of the shared-memory record
//!
//! The producer writes one packed little-endian record with no padding:
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 32 | session (elapsed, rubber, track, type, weather block) |
//! | 32 | 4 | camera focus (i32) |
//! | 36 | 4 | sentinel (f32) |
//! | 40 | 22 × 220 | competitors |
//!
//! Field order inside a competitor block is fixed; see [`read_competitor`].

use super::frame::{
    CompetitorFrame, Components, Energy, GRID_SLOTS, SessionFrame, Strategy, TelemetryFrame, TireCorner, Tires,
    Timings, Weather,
};
use crate::{Result, TelemetryError};

pub const SESSION_SIZE: usize = 32;
pub const COMPETITOR_SIZE: usize = 220;
pub const COMPETITORS_OFFSET: usize = SESSION_SIZE + 8;
pub const FRAME_SIZE: usize = COMPETITORS_OFFSET + GRID_SLOTS * COMPETITOR_SIZE;

/// Bounds-checked little-endian cursor over a raw record.
struct LayoutReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> LayoutReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn take4(&mut self) -> Result<[u8; 4]> {
        let end = self.offset + 4;
        let bytes = self.data.get(self.offset..end).ok_or_else(|| TelemetryError::Parse {
            context: "Frame layout".to_string(),
            details: format!(
                "Insufficient data at offset {} (need 4 bytes, have {})",
                self.offset,
                self.data.len().saturating_sub(self.offset)
            ),
        })?;
        self.offset = end;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn i32(&mut self) -> Result<i32> {
        self.take4().map(i32::from_le_bytes)
    }

    fn f32(&mut self) -> Result<f32> {
        self.take4().map(f32::from_le_bytes)
    }
}

#[derive(Default)]
struct LayoutWriter {
    buf: Vec<u8>,
}

impl LayoutWriter {
    fn i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }
}

/// Decode a raw record. Trailing bytes beyond [`FRAME_SIZE`] are ignored.
pub fn decode(data: &[u8]) -> Result<TelemetryFrame> {
    if data.len() < FRAME_SIZE {
        return Err(TelemetryError::Parse {
            context: "Frame layout".to_string(),
            details: format!("Record is {} bytes, expected {}", data.len(), FRAME_SIZE),
        });
    }

    let mut r = LayoutReader::new(data);
    let session = read_session(&mut r)?;
    let camera_focus = r.i32()?;
    let sentinel = r.f32()?;

    let mut competitors = [CompetitorFrame::default(); GRID_SLOTS];
    for competitor in competitors.iter_mut() {
        *competitor = read_competitor(&mut r)?;
    }

    Ok(TelemetryFrame { session, camera_focus, sentinel, competitors })
}

/// Encode a frame into the raw record layout.
pub fn encode(frame: &TelemetryFrame) -> Vec<u8> {
    let mut w = LayoutWriter { buf: Vec::with_capacity(FRAME_SIZE) };
    write_session(&mut w, &frame.session);
    w.i32(frame.camera_focus);
    w.f32(frame.sentinel);
    for competitor in &frame.competitors {
        write_competitor(&mut w, competitor);
    }
    w.buf
}

fn read_session(r: &mut LayoutReader<'_>) -> Result<SessionFrame> {
    Ok(SessionFrame {
        time_elapsed: r.f32()?,
        rubber: r.f32()?,
        track_id: r.i32()?,
        session_type: r.i32()?,
        weather: Weather {
            air_temp: r.f32()?,
            track_temp: r.f32()?,
            weather: r.i32()?,
            water_on_track: r.f32()?,
        },
    })
}

fn write_session(w: &mut LayoutWriter, s: &SessionFrame) {
    w.f32(s.time_elapsed);
    w.f32(s.rubber);
    w.i32(s.track_id);
    w.i32(s.session_type);
    w.f32(s.weather.air_temp);
    w.f32(s.weather.track_temp);
    w.i32(s.weather.weather);
    w.f32(s.weather.water_on_track);
}

fn read_competitor(r: &mut LayoutReader<'_>) -> Result<CompetitorFrame> {
    let driver_pos = r.i32()?;
    let current_lap = r.i32()?;
    let tire_compound = r.i32()?;
    let pit_status = r.i32()?;
    let pace_mode = r.i32()?;
    let fuel_mode = r.i32()?;
    let ers_mode = r.i32()?;

    // Temperatures are grouped per corner, wear follows as a block of four.
    let mut corners = [TireCorner::default(); 4];
    for corner in corners.iter_mut() {
        corner.surface_temp = r.f32()?;
        corner.temp = r.f32()?;
        corner.brake_temp = r.f32()?;
    }
    for corner in corners.iter_mut() {
        corner.wear = r.f32()?;
    }
    let [front_left, front_right, rear_left, rear_right] = corners;

    let components =
        Components { engine_temp: r.f32()?, engine_wear: r.f32()?, gearbox_wear: r.f32()?, ers_wear: r.f32()? };
    let energy =
        Energy { charge: r.f32()?, harvested: r.f32()?, spent: r.f32()?, fuel: r.f32()?, fuel_delta: r.f32()? };

    let team_id = r.i32()?;
    let driver_number = r.i32()?;
    let driver_id = r.i32()?;
    let turn = r.i32()?;
    let speed = r.i32()?;
    let rpm = r.i32()?;
    let gear = r.i32()?;
    let position = r.i32()?;
    let strategy = Strategy {
        pace_mode,
        fuel_mode,
        ers_mode,
        drs_mode: r.i32()?,
        ers_assist: r.i32()?,
        overtake_aggression: r.i32()?,
        defend_approach: r.i32()?,
        drive_clean_air: r.i32()?,
        avoid_high_kerbs: r.i32()?,
        dont_fight_teammate: r.i32()?,
    };
    let timings = Timings {
        best_lap: r.f32()?,
        current_lap_time: r.f32()?,
        last_lap_time: r.f32()?,
        last_s1: r.f32()?,
        last_s2: r.f32()?,
        last_s3: r.f32()?,
    };

    Ok(CompetitorFrame {
        driver_pos,
        current_lap,
        tire_compound,
        pit_status,
        tires: Tires { front_left, front_right, rear_left, rear_right },
        components,
        energy,
        team_id,
        driver_number,
        driver_id,
        turn,
        speed,
        rpm,
        gear,
        position,
        strategy,
        timings,
        distance_travelled: r.f32()?,
        gap_to_leader: r.f32()?,
    })
}

fn write_competitor(w: &mut LayoutWriter, c: &CompetitorFrame) {
    w.i32(c.driver_pos);
    w.i32(c.current_lap);
    w.i32(c.tire_compound);
    w.i32(c.pit_status);
    w.i32(c.strategy.pace_mode);
    w.i32(c.strategy.fuel_mode);
    w.i32(c.strategy.ers_mode);

    let corners = [c.tires.front_left, c.tires.front_right, c.tires.rear_left, c.tires.rear_right];
    for corner in &corners {
        w.f32(corner.surface_temp);
        w.f32(corner.temp);
        w.f32(corner.brake_temp);
    }
    for corner in &corners {
        w.f32(corner.wear);
    }

    w.f32(c.components.engine_temp);
    w.f32(c.components.engine_wear);
    w.f32(c.components.gearbox_wear);
    w.f32(c.components.ers_wear);
    w.f32(c.energy.charge);
    w.f32(c.energy.harvested);
    w.f32(c.energy.spent);
    w.f32(c.energy.fuel);
    w.f32(c.energy.fuel_delta);

    w.i32(c.team_id);
    w.i32(c.driver_number);
    w.i32(c.driver_id);
    w.i32(c.turn);
    w.i32(c.speed);
    w.i32(c.rpm);
    w.i32(c.gear);
    w.i32(c.position);
    w.i32(c.strategy.drs_mode);
    w.i32(c.strategy.ers_assist);
    w.i32(c.strategy.overtake_aggression);
    w.i32(c.strategy.defend_approach);
    w.i32(c.strategy.drive_clean_air);
    w.i32(c.strategy.avoid_high_kerbs);
    w.i32(c.strategy.dont_fight_teammate);

    w.f32(c.timings.best_lap);
    w.f32(c.timings.current_lap_time);
    w.f32(c.timings.last_lap_time);
    w.f32(c.timings.last_s1);
    w.f32(c.timings.last_s2);
    w.f32(c.timings.last_s3);
    w.f32(c.distance_travelled);
    w.f32(c.gap_to_leader);
}
