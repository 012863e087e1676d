//! Static level ladder derived from total XP
//!
//! Titles from the ladder are defaults; a title claimed from an achievement
//! overrides them on the profile.

pub struct Level {
    pub level: i64,
    pub xp_required: i64,
    pub title: &'static str,
}

pub static LEVELS: &[Level] = &[
    Level { level: 1, xp_required: 0, title: "Newcomer" },
    Level { level: 2, xp_required: 100, title: "Beginner" },
    Level { level: 3, xp_required: 300, title: "Apprentice" },
    Level { level: 4, xp_required: 600, title: "Student" },
    Level { level: 5, xp_required: 1_000, title: "Scholar" },
    Level { level: 6, xp_required: 2_000, title: "Achiever" },
    Level { level: 7, xp_required: 3_500, title: "Expert" },
    Level { level: 8, xp_required: 5_500, title: "Master" },
    Level { level: 9, xp_required: 8_000, title: "Grandmaster" },
    Level { level: 10, xp_required: 12_000, title: "Legend" },
];

/// The highest level whose threshold is covered by `xp_total`.
pub fn level_for_xp(xp_total: i64) -> &'static Level {
    LEVELS
        .iter()
        .rev()
        .find(|level| xp_total >= level.xp_required)
        .unwrap_or(&LEVELS[0])
}

/// The next level to reach, or `None` at the top of the ladder.
pub fn next_level(xp_total: i64) -> Option<&'static Level> {
    LEVELS.iter().find(|level| level.xp_required > xp_total)
}

/// Percentage progress from the current level threshold to the next,
/// 100.0 once the ladder is maxed out.
pub fn progress_to_next(xp_total: i64) -> f64 {
    let current = level_for_xp(xp_total);
    match next_level(xp_total) {
        Some(next) => {
            let span = (next.xp_required - current.xp_required) as f64;
            let into = (xp_total - current.xp_required) as f64;
            (into / span * 100.0).clamp(0.0, 100.0)
        }
        None => 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_is_sorted() {
        for pair in LEVELS.windows(2) {
            assert!(pair[0].xp_required < pair[1].xp_required);
            assert_eq!(pair[0].level + 1, pair[1].level);
        }
    }

    #[test]
    fn test_level_boundaries() {
        assert_eq!(level_for_xp(0).level, 1);
        assert_eq!(level_for_xp(99).level, 1);
        assert_eq!(level_for_xp(100).level, 2);
        assert_eq!(level_for_xp(12_000).level, 10);
        assert_eq!(level_for_xp(1_000_000).level, 10);
    }

    #[test]
    fn test_progress_to_next() {
        // Level 1 spans 0..100
        assert_eq!(progress_to_next(50) as i64, 50);
        assert_eq!(progress_to_next(0) as i64, 0);
        // Maxed ladder reports full progress
        assert_eq!(progress_to_next(50_000) as i64, 100);
    }

    #[test]
    fn test_next_level() {
        assert_eq!(next_level(0).map(|l| l.level), Some(2));
        assert_eq!(next_level(11_999).map(|l| l.level), Some(10));
        assert!(next_level(12_000).is_none());
    }
}
