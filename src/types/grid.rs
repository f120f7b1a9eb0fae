//! Stable competitor names for the 22 grid slots

use super::frame::GRID_SLOTS;

/// Slot names in frame order. Names stay bound to the car, not its position.
pub const COMPETITOR_NAMES: [&str; GRID_SLOTS] = [
    "Ferrari1",
    "Ferrari2",
    "McLaren1",
    "McLaren2",
    "RedBull1",
    "RedBull2",
    "Mercedes1",
    "Mercedes2",
    "Alpine1",
    "Alpine2",
    "Williams1",
    "Williams2",
    "Haas1",
    "Haas2",
    "RacingBulls1",
    "RacingBulls2",
    "KickSauber1",
    "KickSauber2",
    "AstonMartin1",
    "AstonMartin2",
    "MyTeam1",
    "MyTeam2",
];

pub fn competitor_name(slot: usize) -> Option<&'static str> {
    COMPETITOR_NAMES.get(slot).copied()
}

pub fn slot_of(name: &str) -> Option<usize> {
    COMPETITOR_NAMES.iter().position(|candidate| *candidate == name)
}
