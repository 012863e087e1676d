//! Configuration loading and management

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default config file written by `motiva init`.
pub const DEFAULT_CONFIG: &str = r#"# motiva engine configuration

[hearts]
# Heart capacity per user.
max_hearts = 5
# Minutes of waiting per regenerated heart.
refill_interval_minutes = 30

[streak]
# Milestone bonuses. The largest applicable bonus wins.
weekly_bonus_xp = 50
monthly_bonus_xp = 200
century_bonus_xp = 1000
# Streak freeze shop.
freeze_cost_gems = 200
max_freezes = 2

[leaderboard]
# How long a snapshot is served before a reader triggers a recompute.
staleness_minutes = 60
# Entries materialized for global/weekly/monthly boards.
top_n = 100

[challenges]
# Challenge slots generated per user per day.
per_day = 3
"#;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Heart pool settings
    #[serde(default)]
    pub hearts: HeartsConfig,

    /// Streak and milestone settings
    #[serde(default)]
    pub streak: StreakConfig,

    /// Leaderboard snapshot settings
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,

    /// Daily challenge settings
    #[serde(default)]
    pub challenges: ChallengeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartsConfig {
    /// Heart capacity per user
    #[serde(default = "default_max_hearts")]
    pub max_hearts: i64,

    /// Minutes of waiting per regenerated heart
    #[serde(default = "default_refill_interval_minutes")]
    pub refill_interval_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakConfig {
    /// XP awarded every 7th consecutive day
    #[serde(default = "default_weekly_bonus_xp")]
    pub weekly_bonus_xp: i64,

    /// XP awarded every 30th consecutive day
    #[serde(default = "default_monthly_bonus_xp")]
    pub monthly_bonus_xp: i64,

    /// XP awarded on day 100
    #[serde(default = "default_century_bonus_xp")]
    pub century_bonus_xp: i64,

    /// Gem price of one streak freeze
    #[serde(default = "default_freeze_cost_gems")]
    pub freeze_cost_gems: i64,

    /// Most freezes a user can hold at once
    #[serde(default = "default_max_freezes")]
    pub max_freezes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    /// Snapshot age after which a reader triggers a recompute
    #[serde(default = "default_staleness_minutes")]
    pub staleness_minutes: i64,

    /// Entries kept for global, weekly and monthly boards
    #[serde(default = "default_top_n")]
    pub top_n: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeConfig {
    /// Challenge slots generated per user per day
    #[serde(default = "default_per_day")]
    pub per_day: i64,
}

fn default_max_hearts() -> i64 {
    5
}

fn default_refill_interval_minutes() -> i64 {
    30
}

fn default_weekly_bonus_xp() -> i64 {
    50
}

fn default_monthly_bonus_xp() -> i64 {
    200
}

fn default_century_bonus_xp() -> i64 {
    1000
}

fn default_freeze_cost_gems() -> i64 {
    200
}

fn default_max_freezes() -> i64 {
    2
}

fn default_staleness_minutes() -> i64 {
    60
}

fn default_top_n() -> i64 {
    100
}

fn default_per_day() -> i64 {
    3
}

impl Default for HeartsConfig {
    fn default() -> Self {
        Self {
            max_hearts: default_max_hearts(),
            refill_interval_minutes: default_refill_interval_minutes(),
        }
    }
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            weekly_bonus_xp: default_weekly_bonus_xp(),
            monthly_bonus_xp: default_monthly_bonus_xp(),
            century_bonus_xp: default_century_bonus_xp(),
            freeze_cost_gems: default_freeze_cost_gems(),
            max_freezes: default_max_freezes(),
        }
    }
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            staleness_minutes: default_staleness_minutes(),
            top_n: default_top_n(),
        }
    }
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            per_day: default_per_day(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: EngineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration for a working directory
    /// Looks for: .motiva/config.toml (preferred), motiva.toml, then the
    /// global ~/.motiva/config.toml
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let local_path = dir.join(".motiva/config.toml");
        if local_path.exists() {
            return Self::from_file(&local_path);
        }

        let legacy_path = dir.join("motiva.toml");
        if legacy_path.exists() {
            return Self::from_file(&legacy_path);
        }

        let global_path = global_dir().join("config.toml");
        if global_path.exists() {
            return Self::from_file(&global_path);
        }

        Ok(Self::default())
    }
}

/// Per-user data directory (`~/.motiva`), the current directory as a last
/// resort when no home is available
pub fn global_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".motiva")
}
