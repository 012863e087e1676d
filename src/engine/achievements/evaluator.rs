//! Achievement progress evaluation and claiming
//!
//! Evaluation is a full re-scan: every active definition is recomputed from
//! the activity log and current records, so missed or out-of-order events
//! cannot leave progress permanently wrong. Unlocks are monotonic and claims
//! are exactly-once.

use std::sync::Arc;

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info, warn};

use super::definitions::Requirement;
use crate::engine::activity::build_filter;
use crate::engine::catalog::Catalog;
use crate::engine::dates::now_ms;
use crate::engine::db::GameDb;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::models::{ActivityFilter, ActivityKind, Reward};
use crate::engine::profile::credit_reward;

/// Per-(user, achievement) progress record.
#[derive(Debug, Clone)]
pub struct AchievementProgress {
    pub user_id: String,
    pub achievement_id: String,
    pub current: i64,
    pub target: i64,
    pub unlocked: bool,
    pub unlocked_at: Option<i64>,
    pub rewards_claimed: bool,
}

impl AchievementProgress {
    pub fn percentage(&self) -> i64 {
        if self.target <= 0 {
            return 100;
        }
        let pct = (self.current as f64 / self.target as f64 * 100.0).round();
        (pct as i64).min(100)
    }
}

#[derive(Clone)]
pub struct Achievements {
    db: GameDb,
    catalog: Arc<Catalog>,
}

impl Achievements {
    pub fn new(db: GameDb, catalog: Arc<Catalog>) -> Self {
        Self { db, catalog }
    }

    /// Recompute progress for every definition and return the newly
    /// unlocked ones.
    pub fn evaluate(&self, user_id: &str) -> EngineResult<Vec<AchievementProgress>> {
        self.evaluate_at(user_id, now_ms())
    }

    pub fn evaluate_at(
        &self,
        user_id: &str,
        now_ms: i64,
    ) -> EngineResult<Vec<AchievementProgress>> {
        let mut conn = self.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut unlocked = Vec::new();

        for def in self.catalog.achievements() {
            let existing = load_progress(&tx, user_id, &def.id)?;
            if existing.is_some_and(|p| p.unlocked) {
                continue;
            }

            let target = def.requirement.target();
            if target < 1 {
                // Overlay loading rejects these; a hand-built catalogue
                // could still carry one and must not break evaluation.
                warn!(achievement = %def.id, target, "skipping definition with non-positive target");
                continue;
            }
            let current = compute_current(&tx, user_id, &def.requirement)?
                .clamp(0, target);
            let is_unlocked = current >= target;
            let unlocked_at = if is_unlocked { Some(now_ms) } else { None };

            // The guard keeps an unlock monotonic even if another evaluate
            // raced this one between the read above and this write.
            tx.execute(
                "INSERT INTO achievement_progress
                 (user_id, achievement_id, current, target, unlocked, unlocked_at, rewards_claimed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)
                 ON CONFLICT(user_id, achievement_id) DO UPDATE SET
                    current = excluded.current,
                    target = excluded.target,
                    unlocked = excluded.unlocked,
                    unlocked_at = excluded.unlocked_at
                 WHERE achievement_progress.unlocked = 0",
                rusqlite::params![user_id, def.id, current, target, is_unlocked, unlocked_at],
            )?;

            if is_unlocked {
                info!(user_id, achievement = %def.id, "achievement unlocked");
                unlocked.push(AchievementProgress {
                    user_id: user_id.to_string(),
                    achievement_id: def.id.clone(),
                    current,
                    target,
                    unlocked: true,
                    unlocked_at,
                    rewards_claimed: false,
                });
            }
        }

        tx.commit()?;
        debug!(user_id, newly_unlocked = unlocked.len(), "achievements evaluated");
        Ok(unlocked)
    }

    /// Claim the rewards of an unlocked achievement. The claim flag and the
    /// wallet credit commit in one transaction.
    pub fn claim(&self, user_id: &str, achievement_id: &str) -> EngineResult<Reward> {
        let def = self
            .catalog
            .achievement(achievement_id)
            .ok_or_else(|| EngineError::NotFound {
                kind: "achievement",
                id: achievement_id.to_string(),
            })?;

        let mut conn = self.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let progress =
            load_progress(&tx, user_id, achievement_id)?.ok_or(EngineError::NotUnlocked)?;
        if !progress.unlocked {
            return Err(EngineError::NotUnlocked);
        }
        if progress.rewards_claimed {
            return Err(EngineError::AlreadyClaimed);
        }

        let claimed = tx.execute(
            "UPDATE achievement_progress SET rewards_claimed = 1
             WHERE user_id = ?1 AND achievement_id = ?2 AND unlocked = 1 AND rewards_claimed = 0",
            rusqlite::params![user_id, achievement_id],
        )?;
        if claimed == 0 {
            return Err(EngineError::AlreadyClaimed);
        }
        credit_reward(&tx, user_id, &def.reward, now_ms())?;
        tx.commit()?;

        info!(user_id, achievement = achievement_id, "achievement rewards claimed");
        Ok(def.reward.clone())
    }

    /// All progress rows for a user, ordered by achievement id.
    pub fn progress(&self, user_id: &str) -> EngineResult<Vec<AchievementProgress>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id, achievement_id, current, target, unlocked, unlocked_at, rewards_claimed
             FROM achievement_progress WHERE user_id = ?1 ORDER BY achievement_id",
        )?;
        let rows = stmt.query_map(rusqlite::params![user_id], row_to_progress)?;
        let mut all = Vec::new();
        for row in rows {
            all.push(row?);
        }
        Ok(all)
    }

    pub fn progress_for(
        &self,
        user_id: &str,
        achievement_id: &str,
    ) -> EngineResult<Option<AchievementProgress>> {
        let conn = self.db.conn();
        load_progress(&conn, user_id, achievement_id).map_err(EngineError::from)
    }
}

fn load_progress(
    conn: &Connection,
    user_id: &str,
    achievement_id: &str,
) -> rusqlite::Result<Option<AchievementProgress>> {
    conn.query_row(
        "SELECT user_id, achievement_id, current, target, unlocked, unlocked_at, rewards_claimed
         FROM achievement_progress WHERE user_id = ?1 AND achievement_id = ?2",
        rusqlite::params![user_id, achievement_id],
        row_to_progress,
    )
    .optional()
}

fn row_to_progress(row: &rusqlite::Row<'_>) -> rusqlite::Result<AchievementProgress> {
    Ok(AchievementProgress {
        user_id: row.get(0)?,
        achievement_id: row.get(1)?,
        current: row.get(2)?,
        target: row.get(3)?,
        unlocked: row.get(4)?,
        unlocked_at: row.get(5)?,
        rewards_claimed: row.get(6)?,
    })
}

/// Recompute the raw progress value of one requirement.
fn compute_current(
    conn: &Connection,
    user_id: &str,
    requirement: &Requirement,
) -> EngineResult<i64> {
    match requirement {
        Requirement::Count { kind, filter, .. } => {
            let mut activity_filter = ActivityFilter::for_user(user_id).with_kind(*kind);
            if let Some(f) = filter {
                activity_filter = activity_filter.with_metadata(&f.key, &f.value);
            }
            let (clause, params) = build_filter(&activity_filter);
            let sql = format!("SELECT COUNT(*) FROM activity_log{clause}");
            let count = conn.query_row(
                &sql,
                rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
                |row| row.get(0),
            )?;
            Ok(count)
        }
        Requirement::Streak { .. } => {
            let streak: Option<i64> = conn
                .query_row(
                    "SELECT current_streak FROM streak_state WHERE user_id = ?1",
                    rusqlite::params![user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(streak.unwrap_or(0))
        }
        Requirement::XpTotal { .. } => {
            let xp: Option<i64> = conn
                .query_row(
                    "SELECT xp_total FROM user_profile WHERE user_id = ?1",
                    rusqlite::params![user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(xp.unwrap_or(0))
        }
        Requirement::ConsecutiveCorrect { window, .. } => {
            let mut stmt = conn.prepare(
                "SELECT metadata FROM activity_log
                 WHERE user_id = ?1 AND kind = ?2
                 ORDER BY timestamp DESC, id DESC LIMIT ?3",
            )?;
            let rows = stmt.query_map(
                rusqlite::params![user_id, ActivityKind::ExerciseAttempt.as_str(), window],
                |row| row.get::<_, String>(0),
            )?;
            let mut run = 0i64;
            for row in rows {
                let metadata: serde_json::Value =
                    serde_json::from_str(&row?).unwrap_or_default();
                if metadata.get("correct").and_then(|v| v.as_bool()) == Some(true) {
                    run += 1;
                } else {
                    break;
                }
            }
            Ok(run)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::achievements::definitions::{
        AchievementDefinition, Difficulty, MetadataFilter,
    };
    use crate::engine::activity::ActivityLog;
    use crate::engine::profile::Profiles;
    use serde_json::json;

    fn definition(id: &str, requirement: Requirement, reward: Reward) -> AchievementDefinition {
        AchievementDefinition {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            difficulty: Difficulty::Easy,
            requirement,
            reward,
        }
    }

    fn setup(defs: Vec<AchievementDefinition>) -> (Achievements, ActivityLog) {
        let db = GameDb::open_in_memory().unwrap();
        let catalog = Arc::new(Catalog::new(defs, Vec::new()));
        (
            Achievements::new(db.clone(), catalog),
            ActivityLog::new(db),
        )
    }

    #[test]
    fn test_filtered_count_unlocks_in_one_pass() {
        let (achievements, log) = setup(vec![definition(
            "easy_5",
            Requirement::Count {
                kind: ActivityKind::ExerciseAttempt,
                filter: Some(MetadataFilter {
                    key: "difficulty".into(),
                    value: "easy".into(),
                }),
                target: 5,
            },
            Reward::default(),
        )]);

        for _ in 0..5 {
            log.append("u1", ActivityKind::ExerciseAttempt, 5, json!({"difficulty": "easy"}))
                .unwrap();
        }
        // A near miss on the filter must not count
        log.append("u1", ActivityKind::ExerciseAttempt, 5, json!({"difficulty": "hard"}))
            .unwrap();

        let unlocked = achievements.evaluate("u1").unwrap();
        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].achievement_id, "easy_5");
        assert_eq!(unlocked[0].current, 5);

        // Second evaluate reports nothing new
        assert!(achievements.evaluate("u1").unwrap().is_empty());
    }

    #[test]
    fn test_partial_progress_persisted() {
        let (achievements, log) = setup(vec![definition(
            "lessons_10",
            Requirement::Count {
                kind: ActivityKind::LessonCompleted,
                filter: None,
                target: 10,
            },
            Reward::default(),
        )]);

        for _ in 0..3 {
            log.append("u1", ActivityKind::LessonCompleted, 10, json!({})).unwrap();
        }
        assert!(achievements.evaluate("u1").unwrap().is_empty());

        let progress = achievements.progress_for("u1", "lessons_10").unwrap().unwrap();
        assert_eq!(progress.current, 3);
        assert!(!progress.unlocked);
        assert_eq!(progress.percentage(), 30);
    }

    #[test]
    fn test_consecutive_correct_stops_at_first_miss() {
        let (achievements, log) = setup(vec![definition(
            "sharp",
            Requirement::ConsecutiveCorrect { count: 3, window: 10 },
            Reward::default(),
        )]);

        // Oldest to newest: miss, then three correct
        for (ts, correct) in [(100, false), (200, true), (300, true), (400, true)] {
            log.append_at(
                "u1",
                ActivityKind::ExerciseAttempt,
                2,
                json!({"correct": correct}),
                ts,
            )
            .unwrap();
        }
        let unlocked = achievements.evaluate("u1").unwrap();
        assert_eq!(unlocked.len(), 1);

        // A fresh miss on top breaks the run for a new user
        let (achievements2, log2) = setup(vec![definition(
            "sharp",
            Requirement::ConsecutiveCorrect { count: 3, window: 10 },
            Reward::default(),
        )]);
        for (ts, correct) in [(100, true), (200, true), (300, true), (400, false)] {
            log2.append_at(
                "u2",
                ActivityKind::ExerciseAttempt,
                2,
                json!({"correct": correct}),
                ts,
            )
            .unwrap();
        }
        assert!(achievements2.evaluate("u2").unwrap().is_empty());
        let progress = achievements2.progress_for("u2", "sharp").unwrap().unwrap();
        assert_eq!(progress.current, 0);
    }

    #[test]
    fn test_unlock_is_monotonic() {
        let (achievements, log) = setup(vec![definition(
            "one_lesson",
            Requirement::Count {
                kind: ActivityKind::LessonCompleted,
                filter: None,
                target: 1,
            },
            Reward::default(),
        )]);

        log.append("u1", ActivityKind::LessonCompleted, 10, json!({})).unwrap();
        assert_eq!(achievements.evaluate("u1").unwrap().len(), 1);

        // Wiping the log must not revert the unlock
        achievements
            .db
            .conn()
            .execute("DELETE FROM activity_log", [])
            .unwrap();
        assert!(achievements.evaluate("u1").unwrap().is_empty());
        let progress = achievements.progress_for("u1", "one_lesson").unwrap().unwrap();
        assert!(progress.unlocked);
        assert_eq!(progress.current, 1);
    }

    #[test]
    fn test_claim_exactly_once() {
        let (achievements, log) = setup(vec![definition(
            "one_lesson",
            Requirement::Count {
                kind: ActivityKind::LessonCompleted,
                filter: None,
                target: 1,
            },
            Reward {
                xp: 50,
                gems: 10,
                title: Some("Starter".into()),
            },
        )]);
        let profiles = Profiles::new(achievements.db.clone());

        assert!(matches!(
            achievements.claim("u1", "one_lesson"),
            Err(EngineError::NotUnlocked)
        ));
        assert!(matches!(
            achievements.claim("u1", "missing"),
            Err(EngineError::NotFound { .. })
        ));

        log.append("u1", ActivityKind::LessonCompleted, 10, json!({})).unwrap();
        achievements.evaluate("u1").unwrap();

        let reward = achievements.claim("u1", "one_lesson").unwrap();
        assert_eq!(reward.xp, 50);

        let profile = profiles.get("u1").unwrap().unwrap();
        assert_eq!(profile.xp_total, 10 + 50);
        assert_eq!(profile.gems, 10);
        assert_eq!(profile.title.as_deref(), Some("Starter"));

        assert!(matches!(
            achievements.claim("u1", "one_lesson"),
            Err(EngineError::AlreadyClaimed)
        ));
        // The wallet was credited exactly once
        assert_eq!(profiles.get("u1").unwrap().unwrap().xp_total, 60);
    }

    #[test]
    fn test_non_positive_target_is_skipped() {
        let (achievements, log) = setup(vec![
            definition(
                "bad_target",
                Requirement::XpTotal { target: -1 },
                Reward::default(),
            ),
            definition(
                "one_lesson",
                Requirement::Count {
                    kind: ActivityKind::LessonCompleted,
                    filter: None,
                    target: 1,
                },
                Reward::default(),
            ),
        ]);

        log.append("u1", ActivityKind::LessonCompleted, 10, json!({})).unwrap();

        // The broken definition is ignored, the healthy one still unlocks
        let unlocked = achievements.evaluate("u1").unwrap();
        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].achievement_id, "one_lesson");
        assert!(achievements.progress_for("u1", "bad_target").unwrap().is_none());
    }

    #[test]
    fn test_streak_requirement_reads_streak_state() {
        let (achievements, _log) = setup(vec![definition(
            "streak_3",
            Requirement::Streak { days: 3 },
            Reward::default(),
        )]);
        achievements
            .db
            .conn()
            .execute(
                "INSERT INTO streak_state (user_id, current_streak, longest_streak, freezes_available, version)
                 VALUES ('u1', 3, 5, 0, 0)",
                [],
            )
            .unwrap();
        assert_eq!(achievements.evaluate("u1").unwrap().len(), 1);
    }
}
