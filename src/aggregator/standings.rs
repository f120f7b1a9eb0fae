//! Position and gap indices read concurrently by dashboards

use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashSet;

use crate::reference::UNKNOWN;

/// Derived lookup maps, rewritten every frame.
///
/// Positions are one-based. Each entry is replaced in place, so readers never
/// block the frame loop and never see a half-written value.
#[derive(Debug, Default)]
pub struct StandingsIndex {
    positions: DashMap<u32, String>,
    best_laps: DashMap<String, f32>,
    gaps: DashMap<u32, f32>,
}

/// Gaps and neighbours of one competitor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Gaps {
    pub ahead: f32,
    pub behind: f32,
    pub to_leader: f32,
    pub car_ahead: String,
    pub car_behind: String,
}

impl StandingsIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one competitor's entries for this frame.
    pub fn record(&self, position: u32, competitor: &str, best_lap: f32, gap_to_leader: f32) {
        self.positions.insert(position, competitor.to_string());
        self.best_laps.insert(competitor.to_string(), best_lap);
        self.gaps.insert(position, gap_to_leader);
    }

    /// Drop entries not written this frame.
    pub fn retain(&self, positions: &HashSet<u32>, competitors: &HashSet<&str>) {
        self.positions.retain(|position, _| positions.contains(position));
        self.gaps.retain(|position, _| positions.contains(position));
        self.best_laps.retain(|name, _| competitors.contains(name.as_str()));
    }

    pub fn clear(&self) {
        self.positions.clear();
        self.best_laps.clear();
        self.gaps.clear();
    }

    pub fn name_at(&self, position: u32) -> Option<String> {
        self.positions.get(&position).map(|entry| entry.value().clone())
    }

    pub fn best_lap(&self, competitor: &str) -> Option<f32> {
        self.best_laps.get(competitor).map(|entry| *entry.value())
    }

    pub fn gap_at(&self, position: u32) -> Option<f32> {
        self.gaps.get(&position).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Names by running position.
    pub fn running_order(&self) -> Vec<(u32, String)> {
        let mut order: Vec<(u32, String)> =
            self.positions.iter().map(|entry| (*entry.key(), entry.value().clone())).collect();
        order.sort_by_key(|(position, _)| *position);
        order
    }

    /// Holder and time of the fastest recorded lap; zero times do not count.
    pub fn session_best(&self) -> Option<(String, f32)> {
        self.best_laps
            .iter()
            .filter(|entry| *entry.value() > 0.0)
            .map(|entry| (entry.key().clone(), *entry.value()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Gap metric at a position: leader-relative time in races, best lap otherwise.
    fn metric(&self, position: u32, race_like: bool) -> Option<f32> {
        if race_like {
            self.gap_at(position)
        } else {
            self.name_at(position).and_then(|name| self.best_lap(&name))
        }
    }

    /// Gaps for the competitor at `position` on a grid of `grid_size` cars.
    ///
    /// The leader has no car ahead and the last car none behind; both report
    /// themselves as the neighbour with a zero gap.
    pub fn gaps_for(&self, competitor: &str, position: u32, grid_size: u32, race_like: bool) -> Gaps {
        let own = self.metric(position, race_like).unwrap_or(0.0);

        let (ahead, car_ahead) = if position <= 1 {
            (0.0, competitor.to_string())
        } else {
            let gap = self.metric(position - 1, race_like).map_or(0.0, |front| own - front);
            (gap, self.name_at(position - 1).unwrap_or_else(|| UNKNOWN.to_string()))
        };

        let (behind, car_behind) = if position >= grid_size {
            (0.0, competitor.to_string())
        } else {
            let gap = self.metric(position + 1, race_like).map_or(0.0, |back| back - own);
            (gap, self.name_at(position + 1).unwrap_or_else(|| UNKNOWN.to_string()))
        };

        let to_leader = if position <= 1 { 0.0 } else { self.metric(1, race_like).map_or(0.0, |leader| own - leader) };

        Gaps { ahead, behind, to_leader, car_ahead, car_behind }
    }
}
