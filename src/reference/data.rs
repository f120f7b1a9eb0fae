//! Reference facts loaded from the save database

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::names::{argb_to_hex, unwrap_driver_name, unwrap_team_name};
use crate::TelemetryError;

pub const UNKNOWN: &str = "Unknown";
pub const FALLBACK_COLOUR: &str = "#000000";

/// Scalar facts cached from the save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ReferenceKey {
    PointScheme,
    FastestLapBonus,
    PoleBonus,
    DoublePointsLastRace,
    CurrentSeason,
    CurrentRace,
    LastRaceOfSeason,
}

impl ReferenceKey {
    pub const ALL: [ReferenceKey; 7] = [
        ReferenceKey::PointScheme,
        ReferenceKey::FastestLapBonus,
        ReferenceKey::PoleBonus,
        ReferenceKey::DoublePointsLastRace,
        ReferenceKey::CurrentSeason,
        ReferenceKey::CurrentRace,
        ReferenceKey::LastRaceOfSeason,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ReferenceKey::PointScheme => "PointScheme",
            ReferenceKey::FastestLapBonus => "FastestLapPoint",
            ReferenceKey::PoleBonus => "PolePositionPoint",
            ReferenceKey::DoublePointsLastRace => "DoublePointsLastRace",
            ReferenceKey::CurrentSeason => "CurrentSeason",
            ReferenceKey::CurrentRace => "CurrentRace",
            ReferenceKey::LastRaceOfSeason => "RaceIdOfLastRace",
        }
    }
}

impl fmt::Display for ReferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReferenceKey {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReferenceKey::ALL.into_iter().find(|key| key.name() == s).ok_or_else(|| TelemetryError::missing_key(s))
    }
}

/// One contracted F1 driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverRow {
    pub staff_id: i64,
    pub raw_first_name: String,
    pub raw_last_name: String,
    pub raw_code: String,
    pub team_id: i64,
}

impl DriverRow {
    pub fn first_name(&self) -> String {
        unwrap_driver_name(&self.raw_first_name)
    }

    pub fn last_name(&self) -> String {
        unwrap_driver_name(&self.raw_last_name)
    }

    pub fn code(&self) -> String {
        unwrap_driver_name(&self.raw_code)
    }
}

/// One tyre set allocated to a car for the weekend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TyreSetRow {
    pub car_id: i64,
    pub tyre_set_id: i64,
    pub weekend_tyre_type: i64,
}

/// One F1 team with its primary colour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamRow {
    pub team_id: i64,
    pub raw_name: String,
    /// Decimal ARGB as stored; `None` when the column did not parse
    pub argb: Option<i64>,
}

impl TeamRow {
    pub fn name(&self) -> String {
        unwrap_team_name(&self.raw_name)
    }

    pub fn colour(&self) -> String {
        self.argb.map(argb_to_hex).unwrap_or_else(|| FALLBACK_COLOUR.to_string())
    }
}

/// Resolved driver display names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverName {
    pub first: String,
    pub last: String,
    pub code: String,
}

impl DriverName {
    pub fn unknown() -> Self {
        Self { first: UNKNOWN.to_string(), last: UNKNOWN.to_string(), code: UNKNOWN.to_string() }
    }
}

/// Complete result of one reference refresh. Replaced wholesale, never patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReferenceData {
    pub scalars: BTreeMap<ReferenceKey, i64>,
    pub drivers: Vec<DriverRow>,
    pub tyre_sets: Vec<TyreSetRow>,
    pub teams: Vec<TeamRow>,
}

impl ReferenceData {
    pub fn scalar(&self, key: ReferenceKey) -> Option<i64> {
        self.scalars.get(&key).copied()
    }

    pub fn flag(&self, key: ReferenceKey) -> bool {
        self.scalar(key).is_some_and(|value| value != 0)
    }

    pub fn driver(&self, driver_id: i32) -> Option<&DriverRow> {
        self.drivers.iter().find(|row| row.staff_id == i64::from(driver_id))
    }

    pub fn team(&self, team_id: i64) -> Option<&TeamRow> {
        self.teams.iter().find(|row| row.team_id == team_id)
    }

    pub fn driver_name(&self, driver_id: i32) -> DriverName {
        match self.driver(driver_id) {
            Some(row) => DriverName { first: row.first_name(), last: row.last_name(), code: row.code() },
            None => DriverName::unknown(),
        }
    }

    /// Driver id → team id → team colour, all over cached rows.
    pub fn team_colour_for_driver(&self, driver_id: i32) -> String {
        self.driver(driver_id)
            .and_then(|driver| self.team(driver.team_id))
            .map(TeamRow::colour)
            .unwrap_or_else(|| FALLBACK_COLOUR.to_string())
    }

    pub fn team_name_for_driver(&self, driver_id: i32) -> String {
        self.driver(driver_id)
            .and_then(|driver| self.team(driver.team_id))
            .map(TeamRow::name)
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    pub fn tyre_sets_for_car(&self, car_id: i64) -> impl Iterator<Item = &TyreSetRow> {
        self.tyre_sets.iter().filter(move |row| row.car_id == car_id)
    }

    /// Whether the cached current race is the season's last.
    pub fn is_last_race(&self) -> bool {
        match (self.scalar(ReferenceKey::CurrentRace), self.scalar(ReferenceKey::LastRaceOfSeason)) {
            (Some(current), Some(last)) => current == last,
            _ => false,
        }
    }
}

/// Lookups that always answer, falling back when no data is loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceView<'a> {
    data: Option<&'a ReferenceData>,
}

impl<'a> ReferenceView<'a> {
    pub fn new(data: Option<&'a ReferenceData>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> Option<&'a ReferenceData> {
        self.data
    }

    pub fn driver_name(&self, driver_id: i32) -> DriverName {
        self.data.map_or_else(DriverName::unknown, |data| data.driver_name(driver_id))
    }

    pub fn team_name_for_driver(&self, driver_id: i32) -> String {
        self.data.map_or_else(|| UNKNOWN.to_string(), |data| data.team_name_for_driver(driver_id))
    }

    pub fn team_colour_for_driver(&self, driver_id: i32) -> String {
        self.data.map_or_else(|| FALLBACK_COLOUR.to_string(), |data| data.team_colour_for_driver(driver_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_view_falls_back() {
        let view = ReferenceView::default();
        assert_eq!(view.driver_name(1), DriverName::unknown());
        assert_eq!(view.team_name_for_driver(1), UNKNOWN);
        assert_eq!(view.team_colour_for_driver(1), FALLBACK_COLOUR);

        let data = sample();
        let view = ReferenceView::new(Some(&data));
        assert_eq!(view.team_colour_for_driver(1), "#DC0000");
    }

    fn sample() -> ReferenceData {
        let mut scalars = BTreeMap::new();
        scalars.insert(ReferenceKey::CurrentRace, 24);
        scalars.insert(ReferenceKey::LastRaceOfSeason, 24);
        scalars.insert(ReferenceKey::FastestLapBonus, 1);
        scalars.insert(ReferenceKey::PoleBonus, 0);
        ReferenceData {
            scalars,
            drivers: vec![DriverRow {
                staff_id: 1,
                raw_first_name: "[StaffName_Forename_Male_Lewis]".into(),
                raw_last_name: "[StaffName_Surname_Hamilton]".into(),
                raw_code: "[DriverCode_HAM]".into(),
                team_id: 1,
            }],
            tyre_sets: vec![
                TyreSetRow { car_id: 1, tyre_set_id: 1, weekend_tyre_type: 0 },
                TyreSetRow { car_id: 2, tyre_set_id: 2, weekend_tyre_type: 1 },
                TyreSetRow { car_id: 1, tyre_set_id: 3, weekend_tyre_type: 2 },
            ],
            teams: vec![TeamRow { team_id: 1, raw_name: "[TeamName_F1_Ferrari]".into(), argb: Some(0xFFDC_0000) }],
        }
    }

    #[test]
    fn joins_resolve_through_team_id() {
        let data = sample();
        assert_eq!(data.team_colour_for_driver(1), "#DC0000");
        assert_eq!(data.team_name_for_driver(1), "Ferrari");
        assert_eq!(
            data.driver_name(1),
            DriverName { first: "Lewis".into(), last: "Hamilton".into(), code: "HAM".into() }
        );
    }

    #[test]
    fn unknown_ids_fall_back() {
        let data = sample();
        assert_eq!(data.team_colour_for_driver(99), FALLBACK_COLOUR);
        assert_eq!(data.team_name_for_driver(99), UNKNOWN);
        assert_eq!(data.driver_name(99), DriverName::unknown());

        let uncoloured = TeamRow { team_id: 2, raw_name: "X".into(), argb: None };
        assert_eq!(uncoloured.colour(), FALLBACK_COLOUR);
    }

    #[test]
    fn flags_and_last_race() {
        let mut data = sample();
        assert!(data.flag(ReferenceKey::FastestLapBonus));
        assert!(!data.flag(ReferenceKey::PoleBonus));
        assert!(!data.flag(ReferenceKey::DoublePointsLastRace));
        assert!(data.is_last_race());
        data.scalars.insert(ReferenceKey::CurrentRace, 3);
        assert!(!data.is_last_race());
    }

    #[test]
    fn tyre_sets_filter_by_car() {
        let data = sample();
        let ids: Vec<i64> = data.tyre_sets_for_car(1).map(|row| row.tyre_set_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn keys_parse_by_name() {
        for key in ReferenceKey::ALL {
            assert_eq!(key.name().parse::<ReferenceKey>().expect("known key"), key);
        }
        assert!(matches!("Nope".parse::<ReferenceKey>(), Err(TelemetryError::MissingKey { .. })));
    }
}
