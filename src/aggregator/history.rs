//! Bounded per-competitor lap history

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, trace};

use super::standings::StandingsIndex;
use crate::types::TelemetryFrame;
use crate::{Result, TelemetryError};

type Turns = BTreeMap<i32, Arc<TelemetryFrame>>;

/// Frames keyed by competitor, lap and turn.
///
/// Guarded by its own lock so history writes never wait on gap computation.
/// Each competitor keeps at most `max_laps` laps; the lowest lap number goes first.
pub struct HistoryStore {
    max_laps: usize,
    laps: Mutex<HashMap<String, BTreeMap<u32, Turns>>>,
    standings: Arc<StandingsIndex>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LapRecord<'a> {
    lap_number: u32,
    turns: BTreeMap<i32, &'a TelemetryFrame>,
}

impl HistoryStore {
    pub fn new(max_laps: usize, standings: Arc<StandingsIndex>) -> Self {
        Self { max_laps: max_laps.max(1), laps: Mutex::new(HashMap::new()), standings }
    }

    pub fn max_laps(&self) -> usize {
        self.max_laps
    }

    /// Store `frame` as the snapshot for `competitor` at `lap`/`turn`.
    ///
    /// Turn numbers below 1 are not on track yet and are skipped.
    pub fn record(&self, competitor: &str, lap: u32, turn: i32, frame: Arc<TelemetryFrame>) -> bool {
        if turn < 1 {
            return false;
        }

        let mut laps = self.laps.lock();
        let competitor_laps = laps.entry(competitor.to_string()).or_default();
        competitor_laps.entry(lap).or_default().insert(turn, frame);

        if competitor_laps.len() > self.max_laps
            && let Some((evicted, _)) = competitor_laps.pop_first()
        {
            trace!(competitor, lap = evicted, "Evicted oldest lap");
        }
        true
    }

    /// Wipe every competitor's history and the standings maps together.
    pub fn clear_all(&self) {
        let mut laps = self.laps.lock();
        laps.clear();
        self.standings.clear();
        debug!("History and standings cleared");
    }

    pub fn laps(&self, competitor: &str) -> Vec<u32> {
        self.laps.lock().get(competitor).map(|laps| laps.keys().copied().collect()).unwrap_or_default()
    }

    pub fn turns(&self, competitor: &str, lap: u32) -> Vec<i32> {
        self.laps
            .lock()
            .get(competitor)
            .and_then(|laps| laps.get(&lap))
            .map(|turns| turns.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn frame(&self, competitor: &str, lap: u32, turn: i32) -> Option<Arc<TelemetryFrame>> {
        self.laps.lock().get(competitor)?.get(&lap)?.get(&turn).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.laps.lock().values().all(BTreeMap::is_empty)
    }

    /// Serialized `{ "lapNumber", "turns" }` blob for one lap, if recorded.
    pub fn lap_json(&self, competitor: &str, lap: u32) -> Result<Option<String>> {
        let laps = self.laps.lock();
        let Some(turns) = laps.get(competitor).and_then(|laps| laps.get(&lap)) else {
            return Ok(None);
        };

        let record = LapRecord {
            lap_number: lap,
            turns: turns.iter().map(|(turn, frame)| (*turn, frame.as_ref())).collect(),
        };
        serde_json::to_string(&record)
            .map(Some)
            .map_err(|e| TelemetryError::parse(format!("{competitor} lap {lap} history"), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn store(max_laps: usize) -> HistoryStore {
        HistoryStore::new(max_laps, Arc::new(StandingsIndex::new()))
    }

    #[test]
    fn eviction_drops_lowest_lap() {
        let history = store(100);
        let frame = Arc::new(TelemetryFrame::default());
        for lap in 1..=101 {
            history.record("Ferrari1", lap, 1, Arc::clone(&frame));
        }
        let laps = history.laps("Ferrari1");
        assert_eq!(laps.len(), 100);
        assert_eq!(laps.first(), Some(&2));
        assert_eq!(laps.last(), Some(&101));
    }

    #[test]
    fn eviction_is_by_lap_number_not_insertion_order() {
        let history = store(2);
        let frame = Arc::new(TelemetryFrame::default());
        history.record("Haas1", 5, 1, Arc::clone(&frame));
        history.record("Haas1", 3, 1, Arc::clone(&frame));
        history.record("Haas1", 9, 1, Arc::clone(&frame));
        assert_eq!(history.laps("Haas1"), vec![5, 9]);
    }

    #[test]
    fn turns_before_the_first_are_skipped() {
        let history = store(10);
        let frame = Arc::new(TelemetryFrame::default());
        assert!(!history.record("Haas1", 1, 0, Arc::clone(&frame)));
        assert!(history.record("Haas1", 1, 3, frame));
        assert_eq!(history.turns("Haas1", 1), vec![3]);
        assert!(history.frame("Haas1", 1, 3).is_some());
        assert!(history.frame("Haas1", 1, 4).is_none());
    }

    #[test]
    fn clear_all_wipes_standings_too() {
        let standings = Arc::new(StandingsIndex::new());
        let history = HistoryStore::new(10, Arc::clone(&standings));
        history.record("Haas1", 1, 1, Arc::new(TelemetryFrame::default()));
        standings.record(1, "Haas1", 90.0, 0.0);

        history.clear_all();
        assert!(history.is_empty());
        assert!(standings.is_empty());
        assert_eq!(standings.best_lap("Haas1"), None);
    }

    #[test]
    fn lap_json_shape() {
        let history = store(10);
        let mut frame = TelemetryFrame::default();
        frame.session.track_id = 14;
        history.record("McLaren2", 4, 2, Arc::new(frame));

        let json = history.lap_json("McLaren2", 4).expect("serialize").expect("recorded lap");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["lapNumber"], 4);
        assert_eq!(value["turns"]["2"]["session"]["trackId"], 14);

        assert_eq!(history.lap_json("McLaren2", 5).expect("serialize"), None);
        assert_eq!(history.lap_json("Nobody", 4).expect("serialize"), None);
    }

    proptest! {
        #[test]
        fn prop_history_keeps_highest_laps(laps in prop::collection::hash_set(1u32..500, 1..150), cap in 1usize..40) {
            let history = store(cap);
            let frame = Arc::new(TelemetryFrame::default());
            for &lap in &laps {
                history.record("Alpine1", lap, 1, Arc::clone(&frame));
            }

            let mut expected: Vec<u32> = laps.iter().copied().collect();
            expected.sort_unstable();
            let keep = expected.len().min(cap);
            let expected = expected.split_off(expected.len() - keep);
            prop_assert_eq!(history.laps("Alpine1"), expected);
        }
    }
}
