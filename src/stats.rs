//! Derived statistics and display helpers for profile documents.

use crate::profile::GameStats;

/// Aggregated raid statistics for one faction (PMC or Scav).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RaidStats {
    pub sessions: i64,
    pub survived: i64,
    pub kills: i64,
    pub deaths: i64,
    pub total_in_game_time: i64,
    pub kd: f64,
    pub survival_rate: f64,
}

/// Folds a faction's raid counters into the numbers players actually compare.
/// Counter keys are tagged label tuples; session and survival counters are
/// summed across tags, the bare `Kills`/`Deaths` totals are taken as-is.
pub fn raid_stats(stats: Option<&GameStats>) -> RaidStats {
    let eft = stats.and_then(|s| s.eft.as_ref());
    let total_in_game_time = eft.and_then(|e| e.total_in_game_time).unwrap_or(0);
    let counters = eft
        .and_then(|e| e.over_all_counters.as_ref())
        .map(|c| c.items.as_slice())
        .unwrap_or(&[]);

    let mut sessions = 0;
    let mut survived = 0;
    let mut kills = 0;
    let mut deaths = 0;

    for item in counters {
        let key = &item.key;
        if key.first().map(String::as_str) == Some("Sessions") {
            sessions += item.value;
        } else if key.first().map(String::as_str) == Some("ExitStatus")
            && key.iter().any(|k| k == "Survived")
        {
            survived += item.value;
        } else if key.len() == 1 && key[0] == "Kills" {
            kills = item.value;
        } else if key.len() == 1 && key[0] == "Deaths" {
            deaths = item.value;
        }
    }

    let kd = if deaths == 0 {
        kills as f64
    } else {
        kills as f64 / deaths as f64
    };
    let survival_rate = if sessions == 0 {
        0.0
    } else {
        survived as f64 / sessions as f64 * 100.0
    };

    RaidStats {
        sessions,
        survived,
        kills,
        deaths,
        total_in_game_time,
        kd,
        survival_rate,
    }
}

// Cumulative experience required for each level, 1..=70.
const XP_THRESHOLDS: [i64; 70] = [
    0, 1000, 4017, 8432, 14256, 21477, 30023, 39936, 51204, 63723, 77563, 92713, 110144, 128384,
    149867, 172144, 197203, 225938, 259311, 295287, 336008, 382308, 432768, 490936, 557528,
    631688, 714168, 804808, 905408, 1018908, 1141108, 1272508, 1413908, 1570708, 1742908,
    1930508, 2133508, 2351908, 2585708, 2834908, 3099508, 3379508, 3674908, 3985708, 4311908,
    4653508, 5010508, 5382908, 5770708, 6173908, 6592508, 7026508, 7475908, 7940708, 8420908,
    8916508, 9427508, 9953908, 10495708, 11052908, 11625508, 12213508, 12816908, 13435708,
    14069908, 14719508, 15384508, 16064908, 16760708, 17471908,
];

/// Player level for a cumulative experience total.
pub fn level_for_experience(experience: i64) -> u32 {
    let mut level = 1;
    for (i, threshold) in XP_THRESHOLDS.iter().enumerate() {
        if experience >= *threshold {
            level = i as u32 + 1;
        } else {
            break;
        }
    }
    level
}

/// Compact display form: 1500 -> "1.5K", 2_500_000 -> "2.5M".
pub fn format_number(n: i64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

/// In-game time in whole hours and minutes.
pub fn format_playtime(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Why a candidate player name is not valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameValidationError {
    /// Characters outside `[a-zA-Z0-9-_]`.
    InvalidCharacters,
    /// Not 3-15 characters and not an auto-generated `TarkovCitizen<digits>`
    /// name.
    InvalidLength,
}

/// Validates a player display name against the game's naming rules.
pub fn validate_player_name(name: &str) -> Result<(), NameValidationError> {
    let chars_valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !chars_valid {
        return Err(NameValidationError::InvalidCharacters);
    }

    if (3..=15).contains(&name.len()) {
        return Ok(());
    }

    // Auto-generated names are longer than the normal cap.
    let lower = name.to_lowercase();
    if let Some(digits) = lower.strip_prefix("tarkovcitizen") {
        if !digits.is_empty() && digits.len() <= 10 && digits.chars().all(|c| c.is_ascii_digit()) {
            return Ok(());
        }
    }

    Err(NameValidationError::InvalidLength)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{CounterItem, EftStats, OverallCounters};

    fn counters(items: Vec<(Vec<&str>, i64)>) -> GameStats {
        GameStats {
            eft: Some(EftStats {
                total_in_game_time: Some(7200),
                over_all_counters: Some(OverallCounters {
                    items: items
                        .into_iter()
                        .map(|(key, value)| CounterItem {
                            key: key.iter().map(|k| k.to_string()).collect(),
                            value,
                        })
                        .collect(),
                }),
            }),
        }
    }

    #[test]
    fn aggregates_raid_counters() {
        let stats = counters(vec![
            (vec!["Sessions", "Pmc"], 100),
            (vec!["ExitStatus", "Survived", "Pmc"], 45),
            (vec!["ExitStatus", "Killed", "Pmc"], 40),
            (vec!["Kills"], 250),
            (vec!["Deaths"], 50),
            (vec!["Kills", "Usec"], 9999),
        ]);

        let raid = raid_stats(Some(&stats));
        assert_eq!(raid.sessions, 100);
        assert_eq!(raid.survived, 45);
        assert_eq!(raid.kills, 250, "tagged kill counters are not totals");
        assert_eq!(raid.deaths, 50);
        assert_eq!(raid.total_in_game_time, 7200);
        assert!((raid.kd - 5.0).abs() < f64::EPSILON);
        assert!((raid.survival_rate - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_deaths_uses_kills_as_kd() {
        let stats = counters(vec![(vec!["Kills"], 12), (vec!["Deaths"], 0)]);
        assert!((raid_stats(Some(&stats)).kd - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_sessions_means_zero_survival_rate() {
        let stats = counters(vec![(vec!["ExitStatus", "Survived", "Pmc"], 5)]);
        assert_eq!(raid_stats(Some(&stats)).survival_rate, 0.0);
    }

    #[test]
    fn missing_stats_block_yields_defaults() {
        let raid = raid_stats(None);
        assert_eq!(raid, RaidStats::default());
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(level_for_experience(0), 1);
        assert_eq!(level_for_experience(999), 1);
        assert_eq!(level_for_experience(1000), 2);
        assert_eq!(level_for_experience(14256), 5);
        assert_eq!(level_for_experience(17_471_908), 70);
        assert_eq!(level_for_experience(99_999_999), 70);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_500), "1.5K");
        assert_eq!(format_number(2_500_000), "2.5M");
    }

    #[test]
    fn playtime_formatting() {
        assert_eq!(format_playtime(59), "0m");
        assert_eq!(format_playtime(3600), "1h 0m");
        assert_eq!(format_playtime(3661), "1h 1m");
    }

    #[test]
    fn name_validation() {
        assert_eq!(validate_player_name("Reshala"), Ok(()));
        assert_eq!(validate_player_name("a-b_c"), Ok(()));
        assert_eq!(validate_player_name("TarkovCitizen1234567"), Ok(()));
        assert_eq!(
            validate_player_name("bad name"),
            Err(NameValidationError::InvalidCharacters)
        );
        assert_eq!(
            validate_player_name("ab"),
            Err(NameValidationError::InvalidLength)
        );
        assert_eq!(
            validate_player_name("waytoolongplayername"),
            Err(NameValidationError::InvalidLength)
        );
        assert_eq!(
            validate_player_name("TarkovCitizen12345678901"),
            Err(NameValidationError::InvalidLength)
        );
    }
}
