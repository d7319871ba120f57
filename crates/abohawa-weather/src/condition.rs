//! WMO weather code table.
//! See: https://open-meteo.com/en/docs#weathervariables

use serde::Serialize;

/// Coarse grouping used to pick a background theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionCategory {
    Sun,
    Cloud,
    Fog,
    Rain,
    Snow,
    Storm,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConditionInfo {
    pub code: i32,
    pub label: &'static str,
    pub icon: &'static str,
    pub category: ConditionCategory,
}

pub const UNKNOWN_LABEL: &str = "Unknown";
pub const UNKNOWN_ICON: &str = "fas fa-question";

const SUN: &str = "fas fa-sun";
const CLOUD_SUN: &str = "fas fa-cloud-sun";
const CLOUD: &str = "fas fa-cloud";
const SMOG: &str = "fas fa-smog";
const RAIN: &str = "fas fa-cloud-rain";
const SHOWERS: &str = "fas fa-cloud-showers-heavy";
const SNOW: &str = "fas fa-snowflake";
const BOLT: &str = "fas fa-bolt";

/// Every code the table knows, in ascending order.
pub const KNOWN_CODES: [i32; 28] = [
    0, 1, 2, 3, 45, 48, 51, 53, 55, 56, 57, 61, 63, 65, 66, 67, 71, 73, 75, 77, 80, 81, 82, 85,
    86, 95, 96, 99,
];

fn lookup(code: i32) -> Option<(&'static str, &'static str)> {
    let entry = match code {
        0 => ("Clear sky", SUN),
        1 => ("Mainly clear", CLOUD_SUN),
        2 => ("Partly cloudy", CLOUD),
        3 => ("Overcast", CLOUD),
        45 => ("Foggy", SMOG),
        48 => ("Depositing rime fog", SMOG),
        51 => ("Light drizzle", RAIN),
        53 => ("Moderate drizzle", RAIN),
        55 => ("Dense drizzle", RAIN),
        56 => ("Light freezing drizzle", RAIN),
        57 => ("Dense freezing drizzle", RAIN),
        61 => ("Slight rain", RAIN),
        63 => ("Moderate rain", RAIN),
        65 => ("Heavy rain", SHOWERS),
        66 => ("Light freezing rain", RAIN),
        67 => ("Heavy freezing rain", RAIN),
        71 => ("Slight snow fall", SNOW),
        73 => ("Moderate snow fall", SNOW),
        75 => ("Heavy snow fall", SNOW),
        77 => ("Snow grains", SNOW),
        80 => ("Slight rain showers", SHOWERS),
        81 => ("Moderate rain showers", SHOWERS),
        82 => ("Violent rain showers", SHOWERS),
        85 => ("Slight snow showers", SNOW),
        86 => ("Heavy snow showers", SNOW),
        95 => ("Thunderstorm", BOLT),
        96 => ("Thunderstorm with hail", BOLT),
        99 => ("Heavy thunderstorm with hail", BOLT),
        _ => return None,
    };
    Some(entry)
}

fn category(code: i32) -> ConditionCategory {
    match code {
        0 | 1 => ConditionCategory::Sun,
        2 | 3 => ConditionCategory::Cloud,
        45 | 48 => ConditionCategory::Fog,
        51..=67 | 80..=82 => ConditionCategory::Rain,
        71..=77 | 85 | 86 => ConditionCategory::Snow,
        95..=99 => ConditionCategory::Storm,
        _ => ConditionCategory::Unknown,
    }
}

/// Resolve a weather code to its label, icon and category.
///
/// Total over `i32`: codes outside the table map to `Unknown`.
pub fn resolve(code: i32) -> ConditionInfo {
    match lookup(code) {
        Some((label, icon)) => ConditionInfo {
            code,
            label,
            icon,
            category: category(code),
        },
        None => ConditionInfo {
            code,
            label: UNKNOWN_LABEL,
            icon: UNKNOWN_ICON,
            category: ConditionCategory::Unknown,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_pairs() {
        let cases = [
            (0, "Clear sky", SUN),
            (1, "Mainly clear", CLOUD_SUN),
            (3, "Overcast", CLOUD),
            (48, "Depositing rime fog", SMOG),
            (57, "Dense freezing drizzle", RAIN),
            (65, "Heavy rain", SHOWERS),
            (77, "Snow grains", SNOW),
            (82, "Violent rain showers", SHOWERS),
            (86, "Heavy snow showers", SNOW),
            (99, "Heavy thunderstorm with hail", BOLT),
        ];
        for (code, label, icon) in cases {
            let info = resolve(code);
            assert_eq!(info.label, label, "code {}", code);
            assert_eq!(info.icon, icon, "code {}", code);
        }
    }

    #[test]
    fn test_every_known_code_resolves() {
        for code in KNOWN_CODES {
            let info = resolve(code);
            assert_ne!(info.label, UNKNOWN_LABEL, "code {}", code);
            assert_ne!(info.category, ConditionCategory::Unknown, "code {}", code);
        }
    }

    #[test]
    fn test_unknown_codes_fall_back() {
        for code in [-1, 4, 44, 50, 58, 100, i32::MIN, i32::MAX] {
            let info = resolve(code);
            assert_eq!(info.label, UNKNOWN_LABEL);
            assert_eq!(info.icon, UNKNOWN_ICON);
            assert_eq!(info.category, ConditionCategory::Unknown);
            assert_eq!(info.code, code);
        }
    }

    #[test]
    fn test_categories() {
        assert_eq!(resolve(1).category, ConditionCategory::Sun);
        assert_eq!(resolve(2).category, ConditionCategory::Cloud);
        assert_eq!(resolve(45).category, ConditionCategory::Fog);
        assert_eq!(resolve(66).category, ConditionCategory::Rain);
        assert_eq!(resolve(81).category, ConditionCategory::Rain);
        assert_eq!(resolve(85).category, ConditionCategory::Snow);
        assert_eq!(resolve(96).category, ConditionCategory::Storm);
    }
}
