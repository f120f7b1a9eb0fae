//! Fixed query battery against the extracted main database

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Params, params};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, trace};

use super::data::{DriverRow, ReferenceData, ReferenceKey, TeamRow, TyreSetRow};
use crate::{Result, TelemetryError};

const REGULATION_SQL: &str = r#"SELECT "CurrentValue" FROM "Regulations_Enum_Changes" WHERE "Name" = ?1"#;
const CURRENT_SEASON_SQL: &str = r#"SELECT "CurrentSeason" FROM "Player_State""#;
const CURRENT_RACE_SQL: &str = r#"SELECT "RaceID" FROM "Save_Weekend""#;
const LAST_RACE_SQL: &str = r#"SELECT "RaceID" FROM "Races" WHERE "SeasonID" = ?1 ORDER BY "RaceID" DESC LIMIT 1"#;

const DRIVERS_SQL: &str = r#"
    SELECT driver."StaffID", driver."FirstName", driver."LastName", driver."DriverCode", team."TeamID"
    FROM "Staff_DriverData_View" driver
    JOIN "Staff_Contracts_View" team ON driver."StaffID" = team."StaffID"
    WHERE team."Formula" = '1'
    ORDER BY driver."StaffID" ASC"#;

const TYRE_SETS_SQL: &str = r#"
    SELECT tyre."CarID", tyre."TyreSetID", tyre."WeekendTyreType"
    FROM "Save_CarTyreAllocation" tyre
    ORDER BY tyre."CarID" ASC"#;

const TEAMS_SQL: &str = r#"
    SELECT team."TeamID", team."TeamNameLocKey", colour."Colour"
    FROM "Teams" team
    JOIN "Teams_Colours" colour ON team."TeamID" = colour."TeamID"
    WHERE team."Formula" = '1'
    ORDER BY team."TeamID" ASC"#;

/// Loosely typed integer: the save mixes INTEGER, REAL and TEXT affinities.
fn as_i64(value: ValueRef<'_>) -> Option<i64> {
    match value {
        ValueRef::Integer(i) => Some(i),
        ValueRef::Real(f) => Some(f as i64),
        ValueRef::Text(t) => std::str::from_utf8(t).ok()?.trim().parse().ok(),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

fn as_string(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Null | ValueRef::Blob(_) => String::new(),
    }
}

/// First column of the first row; `None` for no row or a non-numeric value.
fn scalar<P: Params>(conn: &Connection, key: ReferenceKey, sql: &str, params: P) -> Result<Option<i64>> {
    let value = conn
        .query_row(sql, params, |row| row.get_ref(0).map(as_i64))
        .optional()
        .map_err(|e| TelemetryError::database(key.name(), e))?;
    Ok(value.flatten())
}

fn rows<T, F>(conn: &Connection, context: &str, sql: &str, map: F) -> Result<Vec<T>>
where
    F: Fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql).map_err(|e| TelemetryError::database(context, e))?;
    let mapped = stmt.query_map([], map).map_err(|e| TelemetryError::database(context, e))?;
    mapped.collect::<rusqlite::Result<Vec<T>>>().map_err(|e| TelemetryError::database(context, e))
}

/// Run the full battery. Any failed statement fails the whole load.
pub fn load_reference_data(db_path: &Path) -> Result<ReferenceData> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(db_path, flags)
        .map_err(|e| TelemetryError::database(format!("opening {}", db_path.display()), e))?;
    load_from_connection(&conn)
}

pub fn load_from_connection(conn: &Connection) -> Result<ReferenceData> {
    let mut scalars = BTreeMap::new();
    let mut put = |key: ReferenceKey, value: Option<i64>| {
        match value {
            Some(value) => {
                scalars.insert(key, value);
            }
            None => trace!(key = key.name(), "No value in save"),
        };
    };

    for (key, regulation) in [
        (ReferenceKey::PointScheme, "PointScheme"),
        (ReferenceKey::FastestLapBonus, "FastestLapBonusPoint"),
        (ReferenceKey::PoleBonus, "PolePositionBonusPoint"),
        (ReferenceKey::DoublePointsLastRace, "DoubleLastRacePoints"),
    ] {
        put(key, scalar(conn, key, REGULATION_SQL, params![regulation])?);
    }

    let season = scalar(conn, ReferenceKey::CurrentSeason, CURRENT_SEASON_SQL, [])?;
    put(ReferenceKey::CurrentSeason, season);
    put(ReferenceKey::CurrentRace, scalar(conn, ReferenceKey::CurrentRace, CURRENT_RACE_SQL, [])?);
    if let Some(season) = season {
        put(ReferenceKey::LastRaceOfSeason, scalar(conn, ReferenceKey::LastRaceOfSeason, LAST_RACE_SQL, params![season])?);
    }

    let drivers = rows(conn, "drivers", DRIVERS_SQL, |row| {
        Ok(DriverRow {
            staff_id: as_i64(row.get_ref(0)?).unwrap_or_default(),
            raw_first_name: as_string(row.get_ref(1)?),
            raw_last_name: as_string(row.get_ref(2)?),
            raw_code: as_string(row.get_ref(3)?),
            team_id: as_i64(row.get_ref(4)?).unwrap_or_default(),
        })
    })?;

    let tyre_sets = rows(conn, "tyre allocation", TYRE_SETS_SQL, |row| {
        Ok(TyreSetRow {
            car_id: as_i64(row.get_ref(0)?).unwrap_or_default(),
            tyre_set_id: as_i64(row.get_ref(1)?).unwrap_or_default(),
            weekend_tyre_type: as_i64(row.get_ref(2)?).unwrap_or_default(),
        })
    })?;

    let mut teams = rows(conn, "teams", TEAMS_SQL, |row| {
        Ok(TeamRow {
            team_id: as_i64(row.get_ref(0)?).unwrap_or_default(),
            raw_name: as_string(row.get_ref(1)?),
            argb: as_i64(row.get_ref(2)?),
        })
    })?;
    // Several colour rows per team; the first is the primary colour.
    teams.dedup_by_key(|team| team.team_id);

    debug!(
        scalars = scalars.len(),
        drivers = drivers.len(),
        tyre_sets = tyre_sets.len(),
        teams = teams.len(),
        "Reference data loaded"
    );
    Ok(ReferenceData { scalars, drivers, tyre_sets, teams })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::seed_save_database;

    #[test]
    fn battery_reads_seeded_save() {
        let conn = Connection::open_in_memory().expect("memory db");
        seed_save_database(&conn).expect("seed");

        let data = load_from_connection(&conn).expect("load");
        assert_eq!(data.scalar(ReferenceKey::PointScheme), Some(1));
        assert!(data.flag(ReferenceKey::FastestLapBonus));
        assert!(data.flag(ReferenceKey::PoleBonus));
        assert!(!data.flag(ReferenceKey::DoublePointsLastRace));
        assert_eq!(data.scalar(ReferenceKey::CurrentSeason), Some(2024));
        assert_eq!(data.scalar(ReferenceKey::CurrentRace), Some(7));
        assert_eq!(data.scalar(ReferenceKey::LastRaceOfSeason), Some(24));

        assert_eq!(data.drivers.len(), 2);
        assert_eq!(data.team_colour_for_driver(1), "#DC0000");
        assert_eq!(data.team_name_for_driver(2), "Mercedes AMG Petronas F1");
        assert_eq!(data.driver_name(2).code, "RUS");
        assert_eq!(data.teams.len(), 2);
        assert_eq!(data.tyre_sets_for_car(1).count(), 2);
    }

    #[test]
    fn missing_tables_fail_the_load() {
        let conn = Connection::open_in_memory().expect("memory db");
        let err = load_from_connection(&conn).expect_err("empty db");
        assert!(matches!(err, TelemetryError::Database { .. }));
    }

    #[test]
    fn loose_affinities_coerce() {
        assert_eq!(as_i64(ValueRef::Text(b" 42 ")), Some(42));
        assert_eq!(as_i64(ValueRef::Real(3.9)), Some(3));
        assert_eq!(as_i64(ValueRef::Null), None);
        assert_eq!(as_string(ValueRef::Integer(7)), "7");
    }
}
