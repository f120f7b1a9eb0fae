//! Per-frame race state aggregation
//!
//! [`Aggregator::on_frame`] is the single entry point of the hot path. Under one
//! lock it detects session resets, runs every slot through the lap/turn state
//! machine, records history on transitions, updates the [`StandingsIndex`] and
//! finally derives gaps, points and the [`DashboardSnapshot`].
//!
//! ```rust
//! use pitlane::aggregator::{Aggregator, FrameOutcome};
//! use pitlane::reference::ReferenceCache;
//! use pitlane::types::{SENTINEL_STEAM, TelemetryFrame};
//! use pitlane::PitlaneConfig;
//! use std::sync::Arc;
//!
//! let aggregator = Aggregator::new(&PitlaneConfig::default(), Arc::new(ReferenceCache::disabled()));
//!
//! let mut frame = TelemetryFrame::default();
//! assert_eq!(aggregator.on_frame(&frame), FrameOutcome::NotInSession);
//!
//! frame.sentinel = SENTINEL_STEAM;
//! assert!(matches!(aggregator.on_frame(&frame), FrameOutcome::Processed(_)));
//! ```

mod competitor;
mod export;
mod history;
mod points;
mod snapshot;
mod standings;

pub use competitor::{CompetitorSlot, CompetitorState, SectorTime, SpeedTrap, Transition};
pub use export::ExportHook;
pub use history::HistoryStore;
pub use points::{PointsRules, points};
pub use snapshot::{CompetitorProperties, DashboardSnapshot, SessionProperties};
pub use standings::{Gaps, StandingsIndex};

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, trace};

use crate::config::{ExportConfig, PitlaneConfig};
use crate::reference::{ReferenceCache, ReferenceView};
use crate::types::{COMPETITOR_NAMES, GRID_SLOTS, TelemetryFrame, competitor_name};

/// Slot whose empty driver id marks a 20-car grid.
const SHORT_GRID_MARKER_SLOT: usize = 20;
const SHORT_GRID: u32 = 20;

/// What happened to one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Sentinel did not match a known build; nothing was touched
    NotInSession,
    Processed(Arc<DashboardSnapshot>),
}

/// Identity of the running session, used to detect resets.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SessionMarker {
    track_id: i32,
    session_type: i32,
    time_elapsed: f32,
}

impl SessionMarker {
    fn of(frame: &TelemetryFrame) -> Self {
        Self {
            track_id: frame.session.track_id,
            session_type: frame.session.session_type,
            time_elapsed: frame.session.time_elapsed,
        }
    }

    /// A non-finite clock on either side says nothing about a restart.
    fn is_continued_by(&self, next: &SessionMarker) -> bool {
        let clock_ok = !self.time_elapsed.is_finite()
            || !next.time_elapsed.is_finite()
            || next.time_elapsed >= self.time_elapsed;
        self.track_id == next.track_id && self.session_type == next.session_type && clock_ok
    }

    /// Marker to keep after `next` continued this session; a bad clock keeps the last good one.
    fn advanced_to(self, next: SessionMarker) -> Self {
        if next.time_elapsed.is_finite() { next } else { Self { time_elapsed: self.time_elapsed, ..next } }
    }
}

struct AggregatorState {
    session: Option<SessionMarker>,
    slots: [CompetitorSlot; GRID_SLOTS],
    sequence: u64,
}

impl AggregatorState {
    fn new() -> Self {
        Self { session: None, slots: std::array::from_fn(|_| CompetitorSlot::Vacant), sequence: 0 }
    }
}

/// Owns all per-competitor state and the derived indices.
pub struct Aggregator {
    reference: Arc<ReferenceCache>,
    standings: Arc<StandingsIndex>,
    history: Arc<HistoryStore>,
    export_config: ExportConfig,
    export: Option<Arc<dyn ExportHook>>,
    state: Mutex<AggregatorState>,
}

impl Aggregator {
    pub fn new(config: &PitlaneConfig, reference: Arc<ReferenceCache>) -> Self {
        let standings = Arc::new(StandingsIndex::new());
        let history = Arc::new(HistoryStore::new(config.history.max_laps, Arc::clone(&standings)));
        Self {
            reference,
            standings,
            history,
            export_config: config.export.clone(),
            export: None,
            state: Mutex::new(AggregatorState::new()),
        }
    }

    /// Attach the hook called for tracked competitors on every transition.
    pub fn with_export(mut self, hook: Arc<dyn ExportHook>) -> Self {
        self.export = Some(hook);
        self
    }

    pub fn standings(&self) -> &Arc<StandingsIndex> {
        &self.standings
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    pub fn reference(&self) -> &Arc<ReferenceCache> {
        &self.reference
    }

    /// Copy of one competitor's carried state, if the slot is active.
    pub fn competitor_state(&self, competitor: &str) -> Option<CompetitorState> {
        let slot = crate::types::slot_of(competitor)?;
        self.state.lock().slots[slot].state().cloned()
    }

    /// Process one frame. Frames never interleave.
    pub fn on_frame(&self, frame: &TelemetryFrame) -> FrameOutcome {
        let mut state = self.state.lock();

        if !frame.has_valid_sentinel() {
            trace!(sentinel = frame.sentinel, "Frame outside a session");
            return FrameOutcome::NotInSession;
        }

        let marker = SessionMarker::of(frame);
        let marker = match state.session {
            Some(previous) if previous.is_continued_by(&marker) => previous.advanced_to(marker),
            Some(previous) => {
                info!(
                    track = frame.session.track().name,
                    session = %frame.session.kind(),
                    previous_track = previous.track_id,
                    previous_session = previous.session_type,
                    "Session reset"
                );
                self.reset(&mut state);
                marker
            }
            None => {
                info!(track = frame.session.track().name, session = %frame.session.kind(), "Session started");
                marker
            }
        };
        state.session = Some(marker);
        state.sequence += 1;

        // Refreshed off the hot path; this only reads the cached set.
        let reference = self.reference.snapshot();
        let view = ReferenceView::new(reference.as_deref());

        let race_like = frame.session.kind().is_race_like();
        let track = frame.session.track();
        let grid_size = grid_size(frame);

        let mut shared: Option<Arc<TelemetryFrame>> = None;
        let mut positions = HashSet::with_capacity(GRID_SLOTS);
        let mut active = HashSet::with_capacity(GRID_SLOTS);

        for (slot, name) in COMPETITOR_NAMES.iter().enumerate() {
            let car = &frame.competitors[slot];
            let valid = if race_like { !car.is_retired() } else { car.has_driver() };
            if !valid {
                if state.slots[slot].state().is_some() {
                    debug!(competitor = %name, "Slot invalid, state cleared");
                }
                state.slots[slot].reset();
                continue;
            }

            let transition = state.slots[slot].observe(car, track.turns);
            if transition.is_change() {
                trace!(competitor = %name, lap = car.display_lap(), turn = car.turn, ?transition, "Transition");
                let frame_arc = shared.get_or_insert_with(|| Arc::new(frame.clone()));
                self.history.record(name, car.display_lap(), car.turn, Arc::clone(frame_arc));
                if let Some(hook) = &self.export
                    && self.export_config.is_tracked(name)
                {
                    hook.export(name, frame, &view);
                }
            }

            let Some(competitor) = state.slots[slot].state_mut() else {
                continue;
            };
            if competitor.new_lap {
                competitor.new_lap = false;
                debug!(competitor = %name, lap = car.display_lap(), last_lap = car.timings.last_lap_time, "Lap started");
            }
            if competitor.update_tires(car.compound(), car.display_lap()) {
                debug!(competitor = %name, compound = %car.compound(), lap = car.display_lap(), "Tire change");
            }
            competitor.update_sectors(car.timings.sectors());
            competitor.update_speed_trap(track, car.distance_travelled, car.speed);

            let position = car.display_position();
            self.standings.record(position, name, car.timings.best_lap, car.gap_to_leader);
            positions.insert(position);
            active.insert(*name);
        }

        self.standings.retain(&positions, &active);

        let session_best = self.standings.session_best();
        let best_holder = session_best.as_ref().map(|(name, _)| name.as_str());
        let rules = PointsRules::from_reference(reference.as_deref());
        let kind = frame.session.kind();

        let competitors = COMPETITOR_NAMES
            .iter()
            .enumerate()
            .map(|(slot, name)| match state.slots[slot].state() {
                Some(competitor) => {
                    let car = &frame.competitors[slot];
                    let position = car.display_position();
                    let gaps = self.standings.gaps_for(name, position, grid_size, race_like);
                    let points = points(kind, position, best_holder == Some(*name), &rules);
                    CompetitorProperties::build(name, car, competitor, &view, gaps, points)
                }
                None => CompetitorProperties::vacant(name),
            })
            .collect();

        let session = SessionProperties {
            best_session_time: session_best.map_or(0.0, |(_, time)| time),
            cars_on_grid: grid_size,
            camera_focus: usize::try_from(frame.camera_focus)
                .ok()
                .and_then(competitor_name)
                .unwrap_or_default()
                .to_string(),
            ..SessionProperties::from_session(&frame.session)
        };

        FrameOutcome::Processed(Arc::new(DashboardSnapshot { sequence: state.sequence, session, competitors }))
    }

    /// Forget everything about the running session.
    pub fn reset_session(&self) {
        let mut state = self.state.lock();
        self.reset(&mut state);
        state.session = None;
    }

    fn reset(&self, state: &mut AggregatorState) {
        for slot in &mut state.slots {
            slot.reset();
        }
        state.sequence = 0;
        self.history.clear_all();
    }
}

/// Cars taking part in the session.
///
/// Races count running engines; otherwise an empty driver in slot 20 means
/// the short 20-car grid.
pub fn grid_size(frame: &TelemetryFrame) -> u32 {
    let nominal = if frame.competitors[SHORT_GRID_MARKER_SLOT].has_driver() { GRID_SLOTS as u32 } else { SHORT_GRID };
    if !frame.session.kind().is_race_like() {
        return nominal;
    }
    match frame.competitors.iter().filter(|car| !car.is_retired()).count() as u32 {
        0 => nominal,
        running => running,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{ReferenceData, ReferenceKey};
    use crate::test_utils::{TestFrame, race_frame};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn aggregator() -> Aggregator {
        Aggregator::new(&PitlaneConfig::default(), Arc::new(ReferenceCache::disabled()))
    }

    fn processed(outcome: FrameOutcome) -> Arc<DashboardSnapshot> {
        match outcome {
            FrameOutcome::Processed(snapshot) => snapshot,
            FrameOutcome::NotInSession => panic!("frame was rejected"),
        }
    }

    #[test]
    fn bad_sentinel_touches_nothing() {
        let _ = tracing_subscriber::fmt::try_init();
        let aggregator = aggregator();
        let mut frame = race_frame(14, &[0.0, 1.2, 3.4]);
        frame.sentinel = 1.0;

        assert_eq!(aggregator.on_frame(&frame), FrameOutcome::NotInSession);
        assert!(aggregator.standings().is_empty());
        assert!(aggregator.history().is_empty());
        assert!(aggregator.competitor_state("Ferrari1").is_none());
    }

    #[test]
    fn race_gaps_and_order() {
        let aggregator = aggregator();
        let snapshot = processed(aggregator.on_frame(&race_frame(14, &[0.0, 1.2, 3.4])));

        let third = snapshot.competitor("McLaren1").expect("third car");
        assert_eq!(third.position, 3);
        assert!((third.gap_ahead - 2.2).abs() < 1e-4);
        assert!((third.gap_to_leader - 3.4).abs() < 1e-4);
        assert_eq!(third.car_ahead, "Ferrari2");
        assert_eq!(third.car_behind, "McLaren1");
        assert_eq!(snapshot.session.cars_on_grid, 3);
        assert_eq!(snapshot.session.track_name, "Monza");

        let order: Vec<&str> = snapshot.running_order().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(order, vec!["Ferrari1", "Ferrari2", "McLaren1"]);
        assert!(!snapshot.competitor("Haas1").expect("slot").active);
        assert_eq!(aggregator.standings().len(), 3);
    }

    #[test]
    fn retired_car_is_reset() {
        let aggregator = aggregator();
        let mut frame = race_frame(14, &[0.0, 1.2, 3.4]);
        aggregator.on_frame(&frame);
        assert!(aggregator.competitor_state("Ferrari2").is_some());

        frame.competitors[1].rpm = 0;
        frame.session.time_elapsed += 1.0;
        let snapshot = processed(aggregator.on_frame(&frame));
        assert!(aggregator.competitor_state("Ferrari2").is_none());
        assert_eq!(snapshot.competitor("Ferrari2"), Some(&CompetitorProperties::vacant("Ferrari2")));
        assert_eq!(aggregator.standings().best_lap("Ferrari2"), None);
        assert_eq!(snapshot.session.cars_on_grid, 2);
    }

    #[test]
    fn session_change_clears_everything() {
        let aggregator = aggregator();
        let mut frame = race_frame(14, &[0.0, 1.2]).with_turn(3);
        aggregator.on_frame(&frame);
        assert!(!aggregator.history().is_empty());

        frame.session.time_elapsed = 0.5;
        frame.session.track_id = 10;
        let snapshot = processed(aggregator.on_frame(&frame));
        assert_eq!(snapshot.sequence, 1);
        // The first frame of the new session is recorded again.
        assert_eq!(aggregator.history().laps("Ferrari1"), vec![1]);
    }

    #[test]
    fn clock_going_backwards_is_a_reset() {
        let aggregator = aggregator();
        let mut frame = race_frame(14, &[0.0]);
        frame.session.time_elapsed = 100.0;
        aggregator.on_frame(&frame);
        frame.session.time_elapsed = 101.0;
        assert_eq!(processed(aggregator.on_frame(&frame)).sequence, 2);
        frame.session.time_elapsed = 3.0;
        assert_eq!(processed(aggregator.on_frame(&frame)).sequence, 1);
    }

    #[test]
    fn non_finite_clock_is_not_a_reset() {
        let aggregator = aggregator();
        let mut frame = race_frame(14, &[0.0]);
        frame.session.time_elapsed = 100.0;
        aggregator.on_frame(&frame);
        frame.session.time_elapsed = f32::NAN;
        assert_eq!(processed(aggregator.on_frame(&frame)).sequence, 2);
        frame.session.time_elapsed = f32::INFINITY;
        assert_eq!(processed(aggregator.on_frame(&frame)).sequence, 3);
        frame.session.time_elapsed = 101.0;
        assert_eq!(processed(aggregator.on_frame(&frame)).sequence, 4);

        // The last good clock still catches a real restart.
        frame.session.time_elapsed = f32::NAN;
        aggregator.on_frame(&frame);
        frame.session.time_elapsed = 2.0;
        assert_eq!(processed(aggregator.on_frame(&frame)).sequence, 1);
    }

    #[test]
    fn transitions_write_history_and_export() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut config = PitlaneConfig::default();
        config.export.enabled = true;
        config.export.tracked_competitors = vec!["Ferrari1".to_string()];

        let aggregator = Aggregator::new(&config, Arc::new(ReferenceCache::disabled())).with_export(Arc::new(
            move |competitor: &str, _: &TelemetryFrame, _: &ReferenceView<'_>| {
                assert_eq!(competitor, "Ferrari1");
                counter.fetch_add(1, Ordering::SeqCst);
            },
        ));

        // Albert Park has 14 turns.
        let mut frame = race_frame(1, &[0.0, 1.0]).with_turn(1);
        for (lap, turn) in [(0, 1), (0, 1), (0, 2), (0, 14), (0, 14), (1, 0), (1, 1)] {
            frame.competitors[0].current_lap = lap;
            frame.competitors[0].turn = turn;
            frame.session.time_elapsed += 1.0;
            aggregator.on_frame(&frame);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(aggregator.history().turns("Ferrari1", 1), vec![1, 2, 14]);
        assert_eq!(aggregator.history().turns("Ferrari1", 2), vec![1]);
    }

    #[test]
    fn sector_bests_track_across_frames() {
        let aggregator = aggregator();
        let mut frame = race_frame(14, &[0.0]);
        for s1 in [12.1, 0.0, 11.9, 12.5] {
            frame.competitors[0].timings.last_s1 = s1;
            frame.session.time_elapsed += 1.0;
            aggregator.on_frame(&frame);
        }
        let state = aggregator.competitor_state("Ferrari1").expect("active");
        assert_eq!(state.sectors[0].best, 11.9);
        assert_eq!(state.sectors[0].current, 12.5);
    }

    #[test]
    fn points_use_cached_rules() {
        let mut data = ReferenceData::default();
        data.scalars.insert(ReferenceKey::PointScheme, 1);
        data.scalars.insert(ReferenceKey::FastestLapBonus, 1);
        let aggregator = Aggregator::new(&PitlaneConfig::default(), Arc::new(ReferenceCache::with_data(data)));

        let mut frame = race_frame(14, &[0.0, 1.2, 3.4]);
        frame.competitors[2].timings.best_lap = 80.0;
        let snapshot = processed(aggregator.on_frame(&frame));

        assert_eq!(snapshot.competitor("Ferrari1").map(|c| c.points), Some(25));
        assert_eq!(snapshot.competitor("McLaren1").map(|c| c.points), Some(16));
        assert_eq!(snapshot.session.best_session_time, 80.0);
    }

    #[test]
    fn frames_only_read_cached_reference_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let save = dir.path().join("autosave.sav");
        crate::test_utils::write_save_archive(&save, 2024).expect("save");
        let cache = Arc::new(ReferenceCache::new(crate::archive::ArchiveUnpacker::new(
            &save,
            dir.path().join("Unpacked"),
            std::time::Duration::ZERO,
        )));
        let aggregator = Aggregator::new(&PitlaneConfig::default(), Arc::clone(&cache));

        processed(aggregator.on_frame(&race_frame(14, &[0.0])));
        assert!(cache.snapshot().is_none());
        assert!(!dir.path().join("Unpacked").exists());

        assert!(cache.refresh().expect("refresh"));
        let mut frame = race_frame(14, &[0.0]);
        frame.session.time_elapsed += 1.0;
        processed(aggregator.on_frame(&frame));
        assert!(cache.snapshot().is_some());
    }

    #[test]
    fn grid_size_heuristics() {
        let mut frame = TelemetryFrame::default();
        frame.session.session_type = 0;
        assert_eq!(grid_size(&frame), 20);
        frame.competitors[20].driver_id = 77;
        assert_eq!(grid_size(&frame), 22);

        let race = race_frame(14, &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(grid_size(&race), 4);
    }
}
