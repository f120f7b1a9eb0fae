//! Per-competitor state carried across frames

use serde::Serialize;

use crate::types::{CompetitorFrame, TireCompound, Track};

/// Outcome of one lap/turn observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Transition {
    /// First frame seen for the slot
    Initialized,
    LapChanged,
    /// Entered a turn before the last one
    TurnChanged,
    /// Reached the last turn of the lap; reported once per lap
    FinalTurn,
    Unchanged,
}

impl Transition {
    pub fn is_change(self) -> bool {
        !matches!(self, Transition::Unchanged)
    }
}

/// Latest and best time for one sector; zero means none yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SectorTime {
    pub current: f32,
    pub best: f32,
}

impl SectorTime {
    /// Zero (or a garbage negative) is not a measurement and leaves the slot untouched.
    pub fn record(&mut self, time: f32) {
        if time <= 0.0 || !time.is_finite() {
            return;
        }
        self.current = time;
        if self.best == 0.0 || time < self.best {
            self.best = time;
        }
    }
}

/// Speed trap reading, armed once per lap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SpeedTrap {
    /// Last captured speed, km/h
    pub speed: i32,
    pub captured_this_lap: bool,
}

/// Everything remembered about one slot between frames.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitorState {
    /// Raw (zero-based) lap last seen
    pub lap: i32,
    pub turn: i32,
    pub new_lap: bool,
    pub final_turn_recorded: bool,
    pub sectors: [SectorTime; 3],
    pub compound: TireCompound,
    /// Display lap on which the current compound was first seen; zero when fitted before we joined
    pub tire_change_lap: u32,
    pub speed_trap: SpeedTrap,
}

impl CompetitorState {
    fn new(car: &CompetitorFrame) -> Self {
        Self {
            lap: car.current_lap,
            turn: car.turn,
            new_lap: false,
            final_turn_recorded: false,
            sectors: [SectorTime::default(); 3],
            compound: car.compound(),
            tire_change_lap: 0,
            speed_trap: SpeedTrap::default(),
        }
    }

    fn observe(&mut self, lap: i32, turn: i32, track_turns: i32) -> Transition {
        if lap != self.lap {
            self.lap = lap;
            self.turn = 0;
            self.new_lap = true;
            self.final_turn_recorded = false;
            self.speed_trap.captured_this_lap = false;
            return Transition::LapChanged;
        }

        if turn != self.turn && turn >= 1 && turn < track_turns {
            self.turn = turn;
            self.final_turn_recorded = false;
            return Transition::TurnChanged;
        }

        if track_turns > 0 && turn == track_turns && !self.final_turn_recorded {
            self.turn = turn;
            self.final_turn_recorded = true;
            return Transition::FinalTurn;
        }

        Transition::Unchanged
    }

    /// Record the latest S1 to S3 times.
    pub fn update_sectors(&mut self, times: [f32; 3]) {
        for (slot, time) in self.sectors.iter_mut().zip(times) {
            slot.record(time);
        }
    }

    /// Returns true when the compound changed on this frame.
    pub fn update_tires(&mut self, compound: TireCompound, display_lap: u32) -> bool {
        if compound == self.compound {
            return false;
        }
        self.compound = compound;
        self.tire_change_lap = display_lap;
        true
    }

    pub fn tire_age(&self, display_lap: u32) -> u32 {
        display_lap.saturating_sub(self.tire_change_lap)
    }

    /// Capture speed inside the track's trap window, once per lap.
    pub fn update_speed_trap(&mut self, track: &Track, distance_travelled: f32, speed: i32) -> bool {
        if self.speed_trap.captured_this_lap {
            return false;
        }
        if !track.in_speed_trap(track.lap_distance(distance_travelled)) {
            return false;
        }
        self.speed_trap = SpeedTrap { speed, captured_this_lap: true };
        true
    }

    /// Best sector times, S1 to S3.
    pub fn best_sectors(&self) -> [f32; 3] {
        [self.sectors[0].best, self.sectors[1].best, self.sectors[2].best]
    }
}

/// One grid slot: either never seen (or reset), or carrying state.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CompetitorSlot {
    #[default]
    Vacant,
    Active(CompetitorState),
}

impl CompetitorSlot {
    /// Run the lap/turn detector for this frame.
    pub fn observe(&mut self, car: &CompetitorFrame, track_turns: i32) -> Transition {
        match self {
            CompetitorSlot::Vacant => {
                *self = CompetitorSlot::Active(CompetitorState::new(car));
                Transition::Initialized
            }
            CompetitorSlot::Active(state) => state.observe(car.current_lap, car.turn, track_turns),
        }
    }

    pub fn state(&self) -> Option<&CompetitorState> {
        match self {
            CompetitorSlot::Active(state) => Some(state),
            CompetitorSlot::Vacant => None,
        }
    }

    pub fn state_mut(&mut self) -> Option<&mut CompetitorState> {
        match self {
            CompetitorSlot::Active(state) => Some(state),
            CompetitorSlot::Vacant => None,
        }
    }

    pub fn reset(&mut self) {
        *self = CompetitorSlot::Vacant;
    }
}
