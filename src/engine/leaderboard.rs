//! Ranked leaderboard snapshots with bounded staleness
//!
//! Boards are pulled, not pushed: a snapshot is recomputed synchronously
//! when a reader finds it older than the staleness threshold. Recomputation
//! scans the population for the scope, scores it for the metric, sorts with
//! a deterministic tie-break and atomically replaces the stored entry list,
//! recording per-user rank movement against the previous snapshot.

use std::collections::HashMap;

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

use super::db::GameDb;
use super::dates::{date_of_ms, day_end_ms, day_key, day_start_ms, month_bounds, now_ms, parse_day_key, week_bounds};
use super::error::{EngineError, EngineResult};
use super::models::{
    ActivityKind, LeaderboardEntry, LeaderboardSnapshot, Metric, RankView, Scope, ScopeType,
};
use crate::config::LeaderboardConfig;

const MS_PER_MINUTE: i64 = 60 * 1000;

#[derive(Clone)]
pub struct Leaderboards {
    db: GameDb,
    config: LeaderboardConfig,
}

impl Leaderboards {
    pub fn new(db: GameDb, config: LeaderboardConfig) -> Self {
        Self { db, config }
    }

    /// Return the stored snapshot while it is fresh, recomputing it first
    /// once it has gone stale.
    pub fn get_or_create(&self, scope: &Scope, metric: Metric) -> EngineResult<LeaderboardSnapshot> {
        self.get_or_create_at(scope, metric, now_ms())
    }

    pub fn get_or_create_at(
        &self,
        scope: &Scope,
        metric: Metric,
        now_ms: i64,
    ) -> EngineResult<LeaderboardSnapshot> {
        validate_scope(scope)?;
        let staleness_ms = self.config.staleness_minutes * MS_PER_MINUTE;
        {
            let conn = self.db.conn();
            if let Some(snapshot) = load_snapshot(&conn, scope, metric)? {
                if now_ms - snapshot.computed_at <= staleness_ms {
                    return Ok(snapshot);
                }
            }
        }
        self.recompute_at(scope, metric, now_ms)
    }

    /// A user's position on a board, with freshness guaranteed first.
    /// `None` when the user fell outside a capped board's stored slice.
    pub fn user_rank(
        &self,
        scope: &Scope,
        metric: Metric,
        user_id: &str,
    ) -> EngineResult<Option<RankView>> {
        self.user_rank_at(scope, metric, user_id, now_ms())
    }

    pub fn user_rank_at(
        &self,
        scope: &Scope,
        metric: Metric,
        user_id: &str,
        now_ms: i64,
    ) -> EngineResult<Option<RankView>> {
        let snapshot = self.get_or_create_at(scope, metric, now_ms)?;
        let total = snapshot.total_participants;
        Ok(snapshot.entries.iter().find(|e| e.user_id == user_id).map(|entry| {
            let percentile = if total > 0 {
                ((1.0 - entry.rank as f64 / total as f64) * 100.0).round() as i64
            } else {
                0
            };
            RankView {
                rank: entry.rank,
                score: entry.score,
                percentile,
            }
        }))
    }

    /// Rebuild one board from the current population.
    pub fn recompute(&self, scope: &Scope, metric: Metric) -> EngineResult<LeaderboardSnapshot> {
        self.recompute_at(scope, metric, now_ms())
    }

    pub fn recompute_at(
        &self,
        scope: &Scope,
        metric: Metric,
        now_ms: i64,
    ) -> EngineResult<LeaderboardSnapshot> {
        validate_scope(scope)?;
        let today = date_of_ms(now_ms);
        let (period_start, period_end) = match scope.scope_type {
            ScopeType::Weekly => {
                let (start, end) = week_bounds(today);
                (Some(start), Some(end))
            }
            ScopeType::Monthly => {
                let (start, end) = month_bounds(today);
                (Some(start), Some(end))
            }
            _ => (None, None),
        };
        let window = period_start
            .zip(period_end)
            .map(|(start, end)| (day_start_ms(start), day_end_ms(end)));

        let mut conn = self.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let population = select_population(&tx, scope, window)?;
        let scores = select_scores(&tx, metric, window)?;

        let mut scored: Vec<(String, f64)> = population
            .into_iter()
            .map(|user_id| {
                let score = scores.get(&user_id).copied().unwrap_or(0.0);
                (user_id, score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let total_participants = scored.len() as i64;
        if scope.scope_type.is_capped() && scored.len() > self.config.top_n as usize {
            scored.truncate(self.config.top_n as usize);
        }

        let previous = previous_ranks(&tx, scope, metric)?;

        tx.execute(
            "DELETE FROM leaderboard_entries
             WHERE scope_type = ?1 AND scope_id = ?2 AND metric = ?3",
            rusqlite::params![scope.scope_type.as_str(), scope.id_key(), metric.as_str()],
        )?;

        let mut entries = Vec::with_capacity(scored.len());
        for (index, (user_id, score)) in scored.into_iter().enumerate() {
            let rank = index as i64 + 1;
            let previous_rank = previous.get(&user_id).copied();
            let rank_delta = previous_rank.map_or(0, |prev| prev - rank);
            tx.execute(
                "INSERT INTO leaderboard_entries
                 (scope_type, scope_id, metric, user_id, rank, score, previous_rank, rank_delta)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    scope.scope_type.as_str(),
                    scope.id_key(),
                    metric.as_str(),
                    user_id,
                    rank,
                    score,
                    previous_rank,
                    rank_delta
                ],
            )?;
            entries.push(LeaderboardEntry {
                user_id,
                rank,
                score,
                previous_rank,
                rank_delta,
            });
        }

        tx.execute(
            "INSERT INTO leaderboard_snapshots
             (scope_type, scope_id, metric, total_participants, computed_at, period_start, period_end)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(scope_type, scope_id, metric) DO UPDATE SET
                total_participants = excluded.total_participants,
                computed_at = excluded.computed_at,
                period_start = excluded.period_start,
                period_end = excluded.period_end",
            rusqlite::params![
                scope.scope_type.as_str(),
                scope.id_key(),
                metric.as_str(),
                total_participants,
                now_ms,
                period_start.map(day_key),
                period_end.map(day_key)
            ],
        )?;
        tx.commit()?;

        info!(
            scope = scope.scope_type.as_str(),
            scope_id = scope.id_key(),
            metric = metric.as_str(),
            participants = total_participants,
            "leaderboard recomputed"
        );
        Ok(LeaderboardSnapshot {
            scope: scope.clone(),
            metric,
            entries,
            total_participants,
            computed_at: now_ms,
            period_start,
            period_end,
        })
    }
}

fn validate_scope(scope: &Scope) -> EngineResult<()> {
    if scope.scope_type.requires_scope_id() && scope.scope_id.is_none() {
        return Err(EngineError::InvalidArgument(
            "class and grade boards need a scope id",
        ));
    }
    Ok(())
}

/// The user ids eligible for a board: every profile for global boards,
/// placement-filtered profiles for class/grade, users active in the period
/// for windowed boards.
fn select_population(
    conn: &Connection,
    scope: &Scope,
    window: Option<(i64, i64)>,
) -> EngineResult<Vec<String>> {
    let mut users = Vec::new();
    match scope.scope_type {
        ScopeType::Global => {
            let mut stmt = conn.prepare("SELECT user_id FROM user_profile")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            for row in rows {
                users.push(row?);
            }
        }
        ScopeType::Class => {
            let mut stmt = conn.prepare("SELECT user_id FROM user_profile WHERE class_id = ?1")?;
            let rows = stmt.query_map(rusqlite::params![scope.id_key()], |row| row.get(0))?;
            for row in rows {
                users.push(row?);
            }
        }
        ScopeType::Grade => {
            let mut stmt = conn.prepare("SELECT user_id FROM user_profile WHERE grade = ?1")?;
            let rows = stmt.query_map(rusqlite::params![scope.id_key()], |row| row.get(0))?;
            for row in rows {
                users.push(row?);
            }
        }
        ScopeType::Weekly | ScopeType::Monthly => {
            let (start, end) = window.unwrap_or((0, i64::MAX));
            let mut stmt = conn.prepare(
                "SELECT DISTINCT user_id FROM activity_log
                 WHERE timestamp >= ?1 AND timestamp < ?2",
            )?;
            let rows = stmt.query_map(rusqlite::params![start, end], |row| row.get(0))?;
            for row in rows {
                users.push(row?);
            }
        }
    }
    Ok(users)
}

/// Score every user that has any signal for the metric. Users missing here
/// score 0. Windowed boards aggregate inside the period only.
fn select_scores(
    conn: &Connection,
    metric: Metric,
    window: Option<(i64, i64)>,
) -> EngineResult<HashMap<String, f64>> {
    let mut scores = HashMap::new();
    let (start, end) = window.unwrap_or((0, i64::MAX));

    match metric {
        Metric::Xp => {
            if window.is_some() {
                let mut stmt = conn.prepare(
                    "SELECT user_id, CAST(COALESCE(SUM(xp_earned), 0) AS REAL)
                     FROM activity_log WHERE timestamp >= ?1 AND timestamp < ?2
                     GROUP BY user_id",
                )?;
                collect_scores(&mut scores, stmt.query_map(rusqlite::params![start, end], score_row)?)?;
            } else {
                let mut stmt =
                    conn.prepare("SELECT user_id, CAST(xp_total AS REAL) FROM user_profile")?;
                collect_scores(&mut scores, stmt.query_map([], score_row)?)?;
            }
        }
        Metric::Streak => {
            let mut stmt =
                conn.prepare("SELECT user_id, CAST(current_streak AS REAL) FROM streak_state")?;
            collect_scores(&mut scores, stmt.query_map([], score_row)?)?;
        }
        Metric::Lessons => {
            let mut stmt = conn.prepare(
                "SELECT user_id, CAST(COUNT(*) AS REAL) FROM activity_log
                 WHERE kind = ?1 AND timestamp >= ?2 AND timestamp < ?3
                 GROUP BY user_id",
            )?;
            collect_scores(
                &mut scores,
                stmt.query_map(
                    rusqlite::params![ActivityKind::LessonCompleted.as_str(), start, end],
                    score_row,
                )?,
            )?;
        }
        Metric::Accuracy => {
            let mut stmt = conn.prepare(
                "SELECT user_id,
                        SUM(CASE WHEN json_extract(metadata, '$.correct') = 1 THEN 1 ELSE 0 END) * 100.0
                            / COUNT(*)
                 FROM activity_log
                 WHERE kind = ?1 AND timestamp >= ?2 AND timestamp < ?3
                 GROUP BY user_id",
            )?;
            collect_scores(
                &mut scores,
                stmt.query_map(
                    rusqlite::params![ActivityKind::ExerciseAttempt.as_str(), start, end],
                    score_row,
                )?,
            )?;
        }
    }
    Ok(scores)
}

fn score_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, f64)> {
    Ok((row.get(0)?, row.get(1)?))
}

fn collect_scores(
    scores: &mut HashMap<String, f64>,
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<(String, f64)>>,
) -> EngineResult<()> {
    for row in rows {
        let (user_id, score) = row?;
        scores.insert(user_id, score);
    }
    Ok(())
}

fn previous_ranks(
    conn: &Connection,
    scope: &Scope,
    metric: Metric,
) -> EngineResult<HashMap<String, i64>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, rank FROM leaderboard_entries
         WHERE scope_type = ?1 AND scope_id = ?2 AND metric = ?3",
    )?;
    let rows = stmt.query_map(
        rusqlite::params![scope.scope_type.as_str(), scope.id_key(), metric.as_str()],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
    )?;
    let mut ranks = HashMap::new();
    for row in rows {
        let (user_id, rank) = row?;
        ranks.insert(user_id, rank);
    }
    Ok(ranks)
}

fn load_snapshot(
    conn: &Connection,
    scope: &Scope,
    metric: Metric,
) -> EngineResult<Option<LeaderboardSnapshot>> {
    let header = conn
        .query_row(
            "SELECT total_participants, computed_at, period_start, period_end
             FROM leaderboard_snapshots
             WHERE scope_type = ?1 AND scope_id = ?2 AND metric = ?3",
            rusqlite::params![scope.scope_type.as_str(), scope.id_key(), metric.as_str()],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((total_participants, computed_at, period_start, period_end)) = header else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT user_id, rank, score, previous_rank, rank_delta
         FROM leaderboard_entries
         WHERE scope_type = ?1 AND scope_id = ?2 AND metric = ?3
         ORDER BY rank",
    )?;
    let rows = stmt.query_map(
        rusqlite::params![scope.scope_type.as_str(), scope.id_key(), metric.as_str()],
        |row| {
            Ok(LeaderboardEntry {
                user_id: row.get(0)?,
                rank: row.get(1)?,
                score: row.get(2)?,
                previous_rank: row.get(3)?,
                rank_delta: row.get(4)?,
            })
        },
    )?;
    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }

    debug!(
        scope = scope.scope_type.as_str(),
        metric = metric.as_str(),
        entries = entries.len(),
        "leaderboard snapshot loaded"
    );
    Ok(Some(LeaderboardSnapshot {
        scope: scope.clone(),
        metric,
        entries,
        total_participants,
        computed_at,
        period_start: period_start.as_deref().and_then(parse_day_key),
        period_end: period_end.as_deref().and_then(parse_day_key),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::activity::ActivityLog;
    use crate::engine::profile::Profiles;
    use serde_json::json;

    struct Fixture {
        boards: Leaderboards,
        profiles: Profiles,
        log: ActivityLog,
    }

    fn setup(config: LeaderboardConfig) -> Fixture {
        let db = GameDb::open_in_memory().unwrap();
        Fixture {
            boards: Leaderboards::new(db.clone(), config),
            profiles: Profiles::new(db.clone()),
            log: ActivityLog::new(db),
        }
    }

    fn seed_xp(fixture: &Fixture, user_id: &str, class_id: &str, xp: i64) {
        fixture.profiles.register(user_id, Some(class_id), 7).unwrap();
        if xp > 0 {
            fixture.profiles.credit_xp(user_id, xp).unwrap();
        }
    }

    #[test]
    fn test_ranks_are_contiguous_and_deterministic() {
        let fixture = setup(LeaderboardConfig::default());
        seed_xp(&fixture, "ava", "7a", 300);
        seed_xp(&fixture, "ben", "7a", 500);
        seed_xp(&fixture, "cem", "7a", 400);
        // deniz and eren tie, the id breaks it
        seed_xp(&fixture, "deniz", "7a", 200);
        seed_xp(&fixture, "eren", "7a", 200);

        let snapshot = fixture
            .boards
            .recompute_at(&Scope::global(), Metric::Xp, 1_000_000)
            .unwrap();

        let order: Vec<&str> = snapshot.entries.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(order, vec!["ben", "cem", "ava", "deniz", "eren"]);
        let ranks: Vec<i64> = snapshot.entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
        assert_eq!(snapshot.total_participants, 5);
    }

    #[test]
    fn test_recompute_is_idempotent_with_zero_deltas() {
        let fixture = setup(LeaderboardConfig::default());
        seed_xp(&fixture, "ava", "7a", 300);
        seed_xp(&fixture, "ben", "7a", 500);

        let first = fixture
            .boards
            .recompute_at(&Scope::global(), Metric::Xp, 1_000_000)
            .unwrap();
        let second = fixture
            .boards
            .recompute_at(&Scope::global(), Metric::Xp, 2_000_000)
            .unwrap();

        for (a, b) in first.entries.iter().zip(second.entries.iter()) {
            assert_eq!(a.user_id, b.user_id);
            assert_eq!(a.rank, b.rank);
            assert_eq!(a.score, b.score);
        }
        assert!(second.entries.iter().all(|e| e.rank_delta == 0));
    }

    #[test]
    fn test_rank_deltas_track_movement() {
        let fixture = setup(LeaderboardConfig::default());
        seed_xp(&fixture, "ava", "7a", 300);
        seed_xp(&fixture, "ben", "7a", 500);

        fixture
            .boards
            .recompute_at(&Scope::global(), Metric::Xp, 1_000_000)
            .unwrap();

        // ava overtakes ben
        fixture.profiles.credit_xp("ava", 400).unwrap();
        let snapshot = fixture
            .boards
            .recompute_at(&Scope::global(), Metric::Xp, 2_000_000)
            .unwrap();

        let ava = snapshot.entries.iter().find(|e| e.user_id == "ava").unwrap();
        let ben = snapshot.entries.iter().find(|e| e.user_id == "ben").unwrap();
        assert_eq!(ava.rank, 1);
        assert_eq!(ava.previous_rank, Some(2));
        assert_eq!(ava.rank_delta, 1);
        assert_eq!(ben.rank, 2);
        assert_eq!(ben.rank_delta, -1);
    }

    #[test]
    fn test_staleness_gates_recompute() {
        let fixture = setup(LeaderboardConfig::default());
        seed_xp(&fixture, "ava", "7a", 300);

        let t0 = 1_000_000;
        let first = fixture
            .boards
            .get_or_create_at(&Scope::global(), Metric::Xp, t0)
            .unwrap();
        assert_eq!(first.computed_at, t0);

        // Within the hour: served from the stored snapshot
        let cached = fixture
            .boards
            .get_or_create_at(&Scope::global(), Metric::Xp, t0 + 30 * MS_PER_MINUTE)
            .unwrap();
        assert_eq!(cached.computed_at, t0);

        // Past the threshold: recomputed
        let t1 = t0 + 61 * MS_PER_MINUTE;
        let refreshed = fixture
            .boards
            .get_or_create_at(&Scope::global(), Metric::Xp, t1)
            .unwrap();
        assert_eq!(refreshed.computed_at, t1);
    }

    #[test]
    fn test_capped_board_keeps_total_population() {
        let fixture = setup(LeaderboardConfig {
            staleness_minutes: 60,
            top_n: 3,
        });
        for (user, xp) in [("ava", 500), ("ben", 400), ("cem", 300), ("deniz", 200), ("eren", 100)] {
            seed_xp(&fixture, user, "7a", xp);
        }

        let global = fixture
            .boards
            .recompute_at(&Scope::global(), Metric::Xp, 1_000_000)
            .unwrap();
        assert_eq!(global.entries.len(), 3);
        assert_eq!(global.total_participants, 5);

        // Outside the stored slice: present in spirit, absent in rank
        let outside = fixture
            .boards
            .user_rank_at(&Scope::global(), Metric::Xp, "eren", 1_000_000)
            .unwrap();
        assert!(outside.is_none());

        // Class boards are never capped
        let class = fixture
            .boards
            .recompute_at(&Scope::class("7a"), Metric::Xp, 1_000_000)
            .unwrap();
        assert_eq!(class.entries.len(), 5);
    }

    #[test]
    fn test_grade_board_filters_population() {
        let fixture = setup(LeaderboardConfig::default());
        // Two classes share grade 7; grade 8 stays off the board
        fixture.profiles.register("ava", Some("7a"), 7).unwrap();
        fixture.profiles.register("ben", Some("7b"), 7).unwrap();
        fixture.profiles.register("cem", Some("8a"), 8).unwrap();
        fixture.profiles.credit_xp("ava", 100).unwrap();
        fixture.profiles.credit_xp("ben", 300).unwrap();
        fixture.profiles.credit_xp("cem", 500).unwrap();

        let snapshot = fixture
            .boards
            .recompute_at(&Scope::grade(7), Metric::Xp, 1_000_000)
            .unwrap();
        let order: Vec<&str> = snapshot.entries.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(order, vec!["ben", "ava"]);
        assert_eq!(snapshot.total_participants, 2);

        let eighth = fixture
            .boards
            .user_rank_at(&Scope::grade(8), Metric::Xp, "cem", 1_000_000)
            .unwrap()
            .unwrap();
        assert_eq!(eighth.rank, 1);
        assert_eq!(eighth.score, 500.0);
    }

    #[test]
    fn test_user_rank_percentile() {
        let fixture = setup(LeaderboardConfig::default());
        for (user, xp) in [("ava", 400), ("ben", 300), ("cem", 200), ("deniz", 100)] {
            seed_xp(&fixture, user, "7a", xp);
        }

        let view = fixture
            .boards
            .user_rank_at(&Scope::global(), Metric::Xp, "ben", 1_000_000)
            .unwrap()
            .unwrap();
        assert_eq!(view.rank, 2);
        assert_eq!(view.score, 300.0);
        assert_eq!(view.percentile, 50);
    }

    #[test]
    fn test_weekly_board_scores_inside_period_only() {
        let fixture = setup(LeaderboardConfig::default());
        fixture.profiles.register("ava", Some("7a"), 7).unwrap();
        fixture.profiles.register("ben", Some("7a"), 7).unwrap();

        // 2025-03-07 is a Friday; the week runs 03-03 through 03-09
        let in_week = day_start_ms(chrono::NaiveDate::from_ymd_opt(2025, 3, 7).unwrap());
        let before_week = day_start_ms(chrono::NaiveDate::from_ymd_opt(2025, 2, 20).unwrap());

        fixture
            .log
            .append_at("ava", ActivityKind::LessonCompleted, 40, json!({}), in_week)
            .unwrap();
        fixture
            .log
            .append_at("ava", ActivityKind::LessonCompleted, 500, json!({}), before_week)
            .unwrap();
        fixture
            .log
            .append_at("ben", ActivityKind::LessonCompleted, 90, json!({}), before_week)
            .unwrap();

        let snapshot = fixture
            .boards
            .recompute_at(&Scope::weekly(), Metric::Xp, in_week + 1000)
            .unwrap();

        assert_eq!(snapshot.entries.len(), 1, "only in-period users participate");
        assert_eq!(snapshot.entries[0].user_id, "ava");
        assert_eq!(snapshot.entries[0].score, 40.0, "only in-period XP counts");
        assert!(snapshot.period_start.is_some());
    }

    #[test]
    fn test_accuracy_metric() {
        let fixture = setup(LeaderboardConfig::default());
        seed_xp(&fixture, "ava", "7a", 0);
        let now = 1_000_000;
        for correct in [true, true, true, false] {
            fixture
                .log
                .append_at("ava", ActivityKind::ExerciseAttempt, 2, json!({"correct": correct}), now)
                .unwrap();
        }

        let snapshot = fixture
            .boards
            .recompute_at(&Scope::global(), Metric::Accuracy, now + 1)
            .unwrap();
        assert_eq!(snapshot.entries[0].score, 75.0);
    }

    #[test]
    fn test_scoped_board_requires_id() {
        let fixture = setup(LeaderboardConfig::default());
        let bare = Scope {
            scope_type: ScopeType::Class,
            scope_id: None,
        };
        assert!(matches!(
            fixture.boards.get_or_create_at(&bare, Metric::Xp, 0),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_streak_metric_reads_streak_state() {
        let fixture = setup(LeaderboardConfig::default());
        seed_xp(&fixture, "ava", "7a", 0);
        seed_xp(&fixture, "ben", "7a", 0);
        fixture
            .boards
            .db
            .conn()
            .execute_batch(
                "INSERT INTO streak_state (user_id, current_streak, longest_streak, freezes_available, version)
                 VALUES ('ava', 12, 12, 0, 0);
                 INSERT INTO streak_state (user_id, current_streak, longest_streak, freezes_available, version)
                 VALUES ('ben', 4, 9, 0, 0);",
            )
            .unwrap();

        let snapshot = fixture
            .boards
            .recompute_at(&Scope::global(), Metric::Streak, 1_000_000)
            .unwrap();
        assert_eq!(snapshot.entries[0].user_id, "ava");
        assert_eq!(snapshot.entries[0].score, 12.0);
        assert_eq!(snapshot.entries[1].score, 4.0);
    }
}
