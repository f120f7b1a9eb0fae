//! Championship points for a running position

use serde::Serialize;

use crate::reference::{ReferenceData, ReferenceKey};
use crate::types::SessionType;

const SCHEME_1: [u32; 10] = [25, 18, 15, 12, 10, 8, 6, 4, 2, 1];
const SCHEME_2: [u32; 8] = [10, 8, 6, 5, 4, 3, 2, 1];
const SCHEME_3: [u32; 6] = [10, 6, 4, 3, 2, 1];
const SPRINT: [u32; 8] = [8, 7, 6, 5, 4, 3, 2, 1];

/// Scoring rules of the current save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointsRules {
    pub scheme: i64,
    pub fastest_lap_bonus: bool,
    pub pole_bonus: bool,
    /// Double points are enabled and this is the last race of the season
    pub double_points: bool,
}

impl Default for PointsRules {
    fn default() -> Self {
        Self { scheme: 1, fastest_lap_bonus: false, pole_bonus: false, double_points: false }
    }
}

impl PointsRules {
    pub fn from_reference(data: Option<&ReferenceData>) -> Self {
        let Some(data) = data else {
            return Self::default();
        };
        Self {
            scheme: data.scalar(ReferenceKey::PointScheme).unwrap_or(1),
            fastest_lap_bonus: data.flag(ReferenceKey::FastestLapBonus),
            pole_bonus: data.flag(ReferenceKey::PoleBonus),
            double_points: data.flag(ReferenceKey::DoublePointsLastRace) && data.is_last_race(),
        }
    }

    fn race_table(&self) -> &'static [u32] {
        match self.scheme {
            2 => &SCHEME_2,
            3 => &SCHEME_3,
            _ => &SCHEME_1,
        }
    }
}

/// Points for a one-based `position` in `session`.
///
/// `holds_best_lap` is whether this competitor set the session's best lap.
pub fn points(session: SessionType, position: u32, holds_best_lap: bool, rules: &PointsRules) -> u32 {
    let table: &[u32] = match session {
        SessionType::Race => rules.race_table(),
        SessionType::Sprint => &SPRINT,
        _ => &[],
    };

    let mut points = position
        .checked_sub(1)
        .and_then(|index| table.get(index as usize))
        .copied()
        .unwrap_or(0);

    if session.is_race_like() && rules.fastest_lap_bonus && holds_best_lap && (1..=10).contains(&position) {
        points += 1;
    }
    if session.is_final_qualifying() && rules.pole_bonus && holds_best_lap {
        points += 1;
    }
    if rules.double_points {
        points *= 2;
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(scheme: i64) -> PointsRules {
        PointsRules { scheme, fastest_lap_bonus: true, pole_bonus: true, double_points: false }
    }

    #[test]
    fn race_winner_with_fastest_lap() {
        assert_eq!(points(SessionType::Race, 1, true, &rules(1)), 26);
        assert_eq!(points(SessionType::Race, 11, false, &rules(1)), 0);
        assert_eq!(points(SessionType::Race, 11, true, &rules(1)), 0);
        assert_eq!(points(SessionType::Race, 10, true, &rules(1)), 2);
    }

    #[test]
    fn schemes_select_tables() {
        assert_eq!(points(SessionType::Race, 1, false, &rules(2)), 10);
        assert_eq!(points(SessionType::Race, 8, false, &rules(2)), 1);
        assert_eq!(points(SessionType::Race, 9, false, &rules(2)), 0);
        assert_eq!(points(SessionType::Race, 2, false, &rules(3)), 6);
        assert_eq!(points(SessionType::Race, 7, false, &rules(3)), 0);
        // Unknown scheme ids score like scheme 1
        assert_eq!(points(SessionType::Race, 2, false, &rules(42)), 18);
    }

    #[test]
    fn sprint_uses_its_own_table() {
        assert_eq!(points(SessionType::Sprint, 1, false, &rules(3)), 8);
        assert_eq!(points(SessionType::Sprint, 8, false, &rules(1)), 1);
        assert_eq!(points(SessionType::Sprint, 9, false, &rules(1)), 0);
        assert_eq!(points(SessionType::Sprint, 3, true, &rules(1)), 7);
    }

    #[test]
    fn pole_bonus_only_in_final_qualifying() {
        assert_eq!(points(SessionType::Qualifying3, 1, true, &rules(1)), 1);
        assert_eq!(points(SessionType::SprintQualifying3, 1, true, &rules(1)), 1);
        assert_eq!(points(SessionType::Qualifying2, 1, true, &rules(1)), 0);
        assert_eq!(points(SessionType::Practice1, 1, true, &rules(1)), 0);

        let no_pole = PointsRules { pole_bonus: false, ..rules(1) };
        assert_eq!(points(SessionType::Qualifying3, 1, true, &no_pole), 0);
    }

    #[test]
    fn last_race_doubles() {
        let doubled = PointsRules { double_points: true, ..rules(1) };
        assert_eq!(points(SessionType::Race, 1, true, &doubled), 52);
        assert_eq!(points(SessionType::Race, 0, false, &doubled), 0);
    }

    #[test]
    fn rules_from_reference_data() {
        assert_eq!(PointsRules::from_reference(None), PointsRules::default());

        let mut data = ReferenceData::default();
        data.scalars.insert(ReferenceKey::PointScheme, 2);
        data.scalars.insert(ReferenceKey::DoublePointsLastRace, 1);
        data.scalars.insert(ReferenceKey::CurrentRace, 5);
        data.scalars.insert(ReferenceKey::LastRaceOfSeason, 24);
        let parsed = PointsRules::from_reference(Some(&data));
        assert_eq!(parsed.scheme, 2);
        assert!(!parsed.double_points);

        data.scalars.insert(ReferenceKey::CurrentRace, 24);
        assert!(PointsRules::from_reference(Some(&data)).double_points);
    }
}
