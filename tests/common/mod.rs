//! Fixtures shared by the integration tests

#![allow(dead_code)]

use pitlane::archive::format::{SIGNATURE, SIGNATURE_SKIP, write_container};
use pitlane::types::{SENTINEL_STEAM, TelemetryFrame};
use rusqlite::{Connection, params};
use std::path::Path;

pub const RACE: i32 = 6;

/// Header chunk with the signature appearing once inside the prefix and once at the end.
pub fn header_chunk_with_decoy() -> Vec<u8> {
    let mut chunk = b"GVAS\x03\x00\x00\x00".to_vec();
    chunk.extend_from_slice(&SIGNATURE);
    chunk.extend_from_slice(b"\x2a\x2a\x2a\x2a properties");
    chunk.extend_from_slice(&SIGNATURE);
    chunk.extend_from_slice(&[0u8; SIGNATURE_SKIP]);
    chunk
}

/// Build a save database for `season` and return its file bytes.
pub fn save_database(scratch: &Path, season: i64, point_scheme: i64) -> Vec<u8> {
    {
        let conn = Connection::open(scratch).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE "Regulations_Enum_Changes" ("Name" TEXT, "CurrentValue" INTEGER);
            CREATE TABLE "Player_State" ("CurrentSeason" INTEGER);
            CREATE TABLE "Save_Weekend" ("RaceID" INTEGER);
            CREATE TABLE "Races" ("RaceID" INTEGER, "SeasonID" INTEGER);
            CREATE TABLE "Staff_DriverData_View" ("StaffID" INTEGER, "FirstName" TEXT, "LastName" TEXT, "DriverCode" TEXT);
            CREATE TABLE "Staff_Contracts_View" ("StaffID" INTEGER, "TeamID" INTEGER, "Formula" INTEGER);
            CREATE TABLE "Save_CarTyreAllocation" ("CarID" INTEGER, "TyreSetID" INTEGER, "WeekendTyreType" INTEGER);
            CREATE TABLE "Teams" ("TeamID" INTEGER, "TeamNameLocKey" TEXT, "Formula" INTEGER);
            CREATE TABLE "Teams_Colours" ("TeamID" INTEGER, "Colour" INTEGER);

            INSERT INTO "Save_Weekend" VALUES (3);
            INSERT INTO "Staff_DriverData_View" VALUES
                (1, '[StaffName_Forename_Male_Charles]', '[StaffName_Surname_Leclerc]', '[DriverCode_LEC]'),
                (2, '[StaffName_Forename_Male_Lando]', '[StaffName_Surname_Norris]', '[DriverCode_NOR]');
            INSERT INTO "Staff_Contracts_View" VALUES (1, 1, 1), (2, 2, 1);
            INSERT INTO "Save_CarTyreAllocation" VALUES (1, 1, 0), (1, 2, 1);
            INSERT INTO "Teams" VALUES (1, '[TeamName_F1_Ferrari]', 1), (2, '[TeamName_F1_McLaren]', 1);
            INSERT INTO "Teams_Colours" VALUES (1, 4292608000), (2, 4294936576);
            "#,
        )
        .unwrap();
        conn.execute(r#"INSERT INTO "Player_State" VALUES (?1)"#, params![season]).unwrap();
        for (name, value) in [
            ("PointScheme", point_scheme),
            ("FastestLapBonusPoint", 1),
            ("PolePositionBonusPoint", 0),
            ("DoubleLastRacePoints", 0),
        ] {
            conn.execute(r#"INSERT INTO "Regulations_Enum_Changes" VALUES (?1, ?2)"#, params![name, value]).unwrap();
        }
        for race in 1..=10i64 {
            conn.execute(r#"INSERT INTO "Races" VALUES (?1, ?2)"#, params![race, season]).unwrap();
        }
    }
    let bytes = std::fs::read(scratch).unwrap();
    std::fs::remove_file(scratch).unwrap();
    bytes
}

/// Write a complete save container whose main segment is a seeded database.
pub fn write_save(path: &Path, season: i64, point_scheme: i64) {
    let main = save_database(&path.with_extension("scratch.db"), season, point_scheme);
    let container = write_container(&header_chunk_with_decoy(), [&main, b"backup one", b"backup two"]).unwrap();
    std::fs::write(path, container).unwrap();
}

/// Race frame with driver ids 1.. in slot order and the given leader gaps.
pub fn race_frame(gaps: &[f32]) -> TelemetryFrame {
    let mut frame = TelemetryFrame { sentinel: SENTINEL_STEAM, ..Default::default() };
    frame.session.track_id = 14;
    frame.session.session_type = RACE;
    frame.session.time_elapsed = 120.0;
    for (slot, &gap) in gaps.iter().enumerate() {
        let car = &mut frame.competitors[slot];
        car.driver_id = slot as i32 + 1;
        car.position = slot as i32;
        car.rpm = 11_000;
        car.current_lap = 4;
        car.turn = 2;
        car.tire_compound = 1;
        car.gap_to_leader = gap;
        car.timings.best_lap = 81.5 + slot as f32;
    }
    frame
}
