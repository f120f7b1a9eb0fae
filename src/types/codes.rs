//! Decoded enumerations for the integer codes carried in telemetry frames
//!
//! Every table keeps an `Unknown(code)` variant so an unexpected value from a
//! newer game build decodes instead of failing the frame.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! code_table {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident = $code:literal => ($label:literal, $short:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant,)+
            Unknown(i32),
        }

        impl $name {
            pub fn from_code(code: i32) -> Self {
                match code {
                    $($code => Self::$variant,)+
                    other => Self::Unknown(other),
                }
            }

            pub fn code(self) -> i32 {
                match self {
                    $(Self::$variant => $code,)+
                    Self::Unknown(other) => other,
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                    Self::Unknown(_) => "Unknown",
                }
            }

            pub fn short_label(self) -> &'static str {
                match self {
                    $(Self::$variant => $short,)+
                    Self::Unknown(_) => "?",
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

code_table! {
    /// Session type of the running event.
    SessionType {
        Practice1 = 0 => ("Practice 1", "P1"),
        Practice2 = 1 => ("Practice 2", "P2"),
        Practice3 = 2 => ("Practice 3", "P3"),
        Qualifying1 = 3 => ("Qualifying 1", "Q1"),
        Qualifying2 = 4 => ("Qualifying 2", "Q2"),
        Qualifying3 = 5 => ("Qualifying 3", "Q3"),
        Race = 6 => ("Race", "R"),
        Sprint = 7 => ("Sprint", "S"),
        SprintQualifying1 = 8 => ("Sprint Qualifying 1", "SQ1"),
        SprintQualifying2 = 9 => ("Sprint Qualifying 2", "SQ2"),
        SprintQualifying3 = 10 => ("Sprint Qualifying 3", "SQ3"),
    }
}

impl SessionType {
    /// Race and sprint sessions, where gaps are running time differences.
    pub fn is_race_like(self) -> bool {
        matches!(self, Self::Race | Self::Sprint)
    }

    /// Last qualifying segment, where pole position is decided.
    pub fn is_final_qualifying(self) -> bool {
        matches!(self, Self::Qualifying3 | Self::SprintQualifying3)
    }
}

code_table! {
    PitStatus {
        None = 0 => ("None", "-"),
        Requested = 1 => ("Requested", "REQ"),
        Entering = 2 => ("Entering", "IN"),
        Queuing = 3 => ("Queuing", "QUE"),
        Stopped = 4 => ("Stopped", "STOP"),
        Exiting = 5 => ("Exiting", "OUT"),
        InGarage = 6 => ("In Garage", "GAR"),
        JackUp = 7 => ("Jack Up", "JACK"),
        Releasing = 8 => ("Releasing", "REL"),
        CarSetup = 9 => ("Car Setup", "SET"),
        PitStopApproach = 10 => ("Pit Stop Approach", "APP"),
        PitStopPenalty = 11 => ("Pit Stop Penalty", "PEN"),
        WaitingForRelease = 12 => ("Waiting for Release", "WAIT"),
    }
}

impl PitStatus {
    pub fn in_pitlane(self) -> bool {
        !matches!(self, Self::None | Self::Requested | Self::Unknown(_))
    }
}

code_table! {
    WeatherKind {
        None = 0 => ("None", "-"),
        Sunny = 1 => ("Sunny", "SUN"),
        PartlySunny = 2 => ("Partly Sunny", "PSUN"),
        Cloudy = 3 => ("Cloudy", "CLD"),
        LightRain = 4 => ("Light Rain", "LR"),
        ModerateRain = 5 => ("Moderate Rain", "MR"),
        HeavyRain = 6 => ("Heavy Rain", "HR"),
    }
}

code_table! {
    PaceMode {
        Attack = 0 => ("Attack", "ATK"),
        Aggressive = 1 => ("Aggressive", "AGR"),
        Standard = 2 => ("Standard", "STD"),
        Light = 3 => ("Light", "LGT"),
        Conserve = 4 => ("Conserve", "CON"),
    }
}

code_table! {
    FuelMode {
        Push = 0 => ("Push", "PSH"),
        Balanced = 1 => ("Balanced", "BAL"),
        Conserve = 2 => ("Conserve", "CON"),
    }
}

code_table! {
    ErsMode {
        Neutral = 0 => ("Neutral", "NEU"),
        Harvest = 1 => ("Harvest", "HRV"),
        Standard = 2 => ("Standard", "STD"),
        TopUp = 3 => ("Top Up", "TOP"),
    }
}

code_table! {
    DrsMode {
        Disabled = 0 => ("Disabled", "OFF"),
        Detected = 1 => ("Detected", "DET"),
        Enabled = 2 => ("Enabled", "EN"),
        Active = 3 => ("Active", "ON"),
    }
}

/// Tire compound family.
///
/// The game encodes per-weekend compound variants as ranges, so several raw
/// codes collapse onto one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TireCompound {
    Soft,
    Medium,
    Hard,
    Intermediate,
    Wet,
    Unknown(i32),
}

impl TireCompound {
    pub fn from_code(code: i32) -> Self {
        match code {
            0..=7 => Self::Soft,
            8..=10 => Self::Medium,
            11..=12 => Self::Hard,
            13..=17 => Self::Intermediate,
            18..=19 => Self::Wet,
            other => Self::Unknown(other),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Soft => "Soft",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
            Self::Intermediate => "Intermediate",
            Self::Wet => "Wet",
            Self::Unknown(_) => "Unknown",
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            Self::Soft => "S",
            Self::Medium => "M",
            Self::Hard => "H",
            Self::Intermediate => "I",
            Self::Wet => "W",
            Self::Unknown(_) => "?",
        }
    }
}

impl fmt::Display for TireCompound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
