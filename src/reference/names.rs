//! Human-readable names from save-database resource strings
//!
//! Names in the save are usually localisation keys such as
//! `[StaffName_Forename_Male_Lewis01]` or `[TeamName_F1_MercedesAMGPetronasF1]`.
//! Custom teams carry a literal: `[STRING_LITERAL:Value=|Peugeot Sport|]`.

const LITERAL_PREFIX: &str = "[STRING_LITERAL:Value=|";
const LITERAL_SUFFIX: &str = "|]";

/// Team names the space-insertion heuristic gets wrong.
const KNOWN_TEAM_NAMES: &[(&str, &str)] =
    &[("MercedesAMGPetronasF1", "Mercedes AMG Petronas F1"), ("McLaren", "McLaren")];

/// Last `_`-separated part of a bracketed key, or `None` if `raw` is not bracketed.
fn key_tail(raw: &str) -> Option<&str> {
    let inner = raw.strip_prefix('[')?.strip_suffix(']')?;
    inner.rsplit('_').next()
}

/// Unwrap a driver name or driver code key; anything else passes through.
pub fn unwrap_driver_name(raw: &str) -> String {
    match key_tail(raw) {
        Some(tail) => tail.trim_end_matches(|c: char| c.is_ascii_digit()).to_string(),
        None => raw.to_string(),
    }
}

/// Unwrap a team name key or string literal; anything else passes through.
pub fn unwrap_team_name(raw: &str) -> String {
    if let Some(literal) = raw.strip_prefix(LITERAL_PREFIX).and_then(|rest| rest.strip_suffix(LITERAL_SUFFIX)) {
        return literal.to_string();
    }

    let Some(tail) = key_tail(raw) else {
        return raw.to_string();
    };

    KNOWN_TEAM_NAMES
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(tail))
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| add_spaces(tail))
}

/// Split a CamelCase name into words, keeping acronyms together.
///
/// A space goes before an uppercase letter unless the previous letter was
/// also uppercase and the next one is not lowercase (`AMG`, `F1`).
pub fn add_spaces(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev_upper = chars[i - 1].is_uppercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if !prev_upper || next_lower {
                out.push(' ');
            }
        }
        out.push(c);
    }

    out.replace("F 1", "F1")
}

/// Decimal ARGB colour to `#RRGGBB`; alpha is dropped.
pub fn argb_to_hex(argb: i64) -> String {
    format!("#{:06X}", argb & 0x00FF_FFFF)
}
