//! Synthetic fixtures for tests and benchmarks
//!
//! Frames, save containers and save databases are built in memory so no test
//! depends on a game install.

#![cfg(any(test, feature = "benchmark"))]

use rusqlite::{Connection, params};
use std::path::Path;

use crate::archive::format::{SIGNATURE, SIGNATURE_SKIP, write_container};
use crate::types::{SENTINEL_STEAM, TelemetryFrame};

pub type FixtureResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Race session code.
pub const RACE: i32 = 6;
/// First practice session code.
pub const PRACTICE: i32 = 0;

const RUNNING_RPM: i32 = 11_500;

/// A valid race frame with one running car per entry of `gaps`, in slot and
/// position order, and every other slot stopped.
pub fn race_frame(track_id: i32, gaps: &[f32]) -> TelemetryFrame {
    let mut frame = TelemetryFrame { sentinel: SENTINEL_STEAM, ..Default::default() };
    frame.session.track_id = track_id;
    frame.session.session_type = RACE;
    frame.session.time_elapsed = 10.0;
    frame.session.weather.air_temp = 24.0;
    frame.session.weather.track_temp = 38.0;

    for (slot, &gap) in gaps.iter().enumerate() {
        let car = &mut frame.competitors[slot];
        car.driver_id = slot as i32 + 1;
        car.driver_number = slot as i32 + 10;
        car.team_id = slot as i32 / 2 + 1;
        car.position = slot as i32;
        car.rpm = RUNNING_RPM;
        car.speed = 280;
        car.gear = 7;
        car.tire_compound = 2;
        car.gap_to_leader = gap;
        car.timings.best_lap = 90.0 + slot as f32;
        car.distance_travelled = 100.0;
    }
    frame
}

/// A valid practice frame; cars are placed by the given best laps.
pub fn practice_frame(track_id: i32, best_laps: &[f32]) -> TelemetryFrame {
    let mut frame = race_frame(track_id, &vec![0.0; best_laps.len()]);
    frame.session.session_type = PRACTICE;
    for (slot, &best) in best_laps.iter().enumerate() {
        frame.competitors[slot].timings.best_lap = best;
    }
    frame
}

/// Builder-style tweaks for test frames.
pub trait TestFrame {
    /// Put every car with a driver on `turn`.
    fn with_turn(self, turn: i32) -> Self;
    fn with_time(self, time_elapsed: f32) -> Self;
}

impl TestFrame for TelemetryFrame {
    fn with_turn(mut self, turn: i32) -> Self {
        for car in self.competitors.iter_mut().filter(|car| car.has_driver()) {
            car.turn = turn;
        }
        self
    }

    fn with_time(mut self, time_elapsed: f32) -> Self {
        self.session.time_elapsed = time_elapsed;
        self
    }
}

/// Header chunk ending in the container signature.
pub fn header_chunk(prefix: &[u8]) -> Vec<u8> {
    let mut chunk = prefix.to_vec();
    chunk.extend_from_slice(&SIGNATURE);
    chunk.extend_from_slice(&[0u8; SIGNATURE_SKIP]);
    chunk
}

/// Complete save container around three segments.
pub fn save_container(main: &[u8], backup1: &[u8], backup2: &[u8]) -> FixtureResult<Vec<u8>> {
    Ok(write_container(&header_chunk(b"GVAS\x03\x00\x00\x00fixture"), [main, backup1, backup2])?)
}

/// Create and fill the tables the reference battery reads.
pub fn seed_save_database(conn: &Connection) -> rusqlite::Result<()> {
    seed_season(conn, 2024)
}

fn seed_season(conn: &Connection, season: i64) -> rusqlite::Result<()> {
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

        INSERT INTO "Regulations_Enum_Changes" VALUES
            ('PointScheme', 1), ('FastestLapBonusPoint', 1), ('PolePositionBonusPoint', 1), ('DoubleLastRacePoints', 0);
        INSERT INTO "Save_Weekend" VALUES (7);

        INSERT INTO "Staff_DriverData_View" VALUES
            (1, '[StaffName_Forename_Male_Charles]', '[StaffName_Surname_Leclerc]', '[DriverCode_LEC]'),
            (2, '[StaffName_Forename_Male_George01]', '[StaffName_Surname_Russell]', '[DriverCode_RUS]'),
            (3, '[StaffName_Forename_Male_Test]', '[StaffName_Surname_Driver]', '[DriverCode_TST]');
        INSERT INTO "Staff_Contracts_View" VALUES (1, 1, 1), (2, 3, 1), (3, 1, 2);

        INSERT INTO "Save_CarTyreAllocation" VALUES (1, 1, 0), (2, 2, 1), (1, 3, 2);

        INSERT INTO "Teams" VALUES (1, '[TeamName_F1_Ferrari]', 1), (3, '[TeamName_F1_MercedesAMGPetronasF1]', 1),
            (12, '[TeamName_F2_Prema]', 2);
        "#,
    )?;

    conn.execute(r#"INSERT INTO "Player_State" VALUES (?1)"#, params![season])?;
    for race in 1..=24i64 {
        conn.execute(r#"INSERT INTO "Races" VALUES (?1, ?2)"#, params![race, season])?;
    }
    for (team, colour) in [(1i64, 0xFFDC_0000i64), (3, 0xFF27_F4D2), (3, 0xFF00_0000), (12, 0xFF00_00FF)] {
        conn.execute(r#"INSERT INTO "Teams_Colours" VALUES (?1, ?2)"#, params![team, colour])?;
    }
    Ok(())
}

/// Write a save container at `path` whose main database is seeded for `season`.
pub fn write_save_archive(path: &Path, season: i64) -> FixtureResult<()> {
    let scratch = path.with_extension("seed.db");
    if scratch.exists() {
        std::fs::remove_file(&scratch)?;
    }
    {
        let conn = Connection::open(&scratch)?;
        seed_season(&conn, season)?;
    }
    let main = std::fs::read(&scratch)?;
    std::fs::remove_file(&scratch)?;
    std::fs::write(path, save_container(&main, b"backup-one", b"backup-two")?)?;
    Ok(())
}
